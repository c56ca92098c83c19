use anyhow::Result;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::notifier::Notifier;

/// Produces a `docker save`/OCI tarball for an image reference.
pub trait Source {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Returns the tarball path, plus the temporary directory holding it when
    /// the source had to create one. Keep the `TempDir` alive while reading.
    fn get_image_tarball(
        &self,
        image_name: &str,
        notifier: &Notifier,
    ) -> Result<(PathBuf, Option<TempDir>)>;
}
