use anyhow::{anyhow, Result};
use std::path::PathBuf;
use tempfile::TempDir;

use super::Source;
use crate::notifier::Notifier;

/// A tarball already on disk.
pub struct TarSource;

impl TarSource {
    pub fn new() -> Result<Self> {
        Ok(Self)
    }
}

impl Source for TarSource {
    fn name(&self) -> &str {
        "tar"
    }

    fn get_image_tarball(
        &self,
        image_path: &str,
        notifier: &Notifier,
    ) -> Result<(PathBuf, Option<TempDir>)> {
        let tarball_path = PathBuf::from(image_path);

        if !tarball_path.exists() {
            return Err(anyhow!(
                "Tarball file does not exist: {}",
                tarball_path.display()
            ));
        }
        if !tarball_path.is_file() {
            return Err(anyhow!("Path is not a file: {}", tarball_path.display()));
        }

        let extension = tarball_path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");
        if !matches!(extension, "tar" | "gz" | "tgz") {
            notifier.warn(&format!(
                "{} does not look like a tarball, reading it anyway",
                tarball_path.display()
            ));
        }

        Ok((tarball_path, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_existing_file_is_returned_as_is() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"not really a tar").unwrap();
        let path = file.path().to_str().unwrap();

        let source = TarSource::new().unwrap();
        let (tarball, temp_dir) = source
            .get_image_tarball(path, &Notifier::silent())
            .unwrap();

        assert_eq!(tarball.to_str().unwrap(), path);
        assert!(temp_dir.is_none());
        assert_eq!(source.name(), "tar");
    }

    #[test]
    fn test_missing_file_and_directories_are_rejected() {
        let source = TarSource::new().unwrap();
        let notifier = Notifier::silent();

        assert!(source
            .get_image_tarball("/path/that/does/not/exist.tar", &notifier)
            .is_err());

        let dir = tempfile::tempdir().unwrap();
        assert!(source
            .get_image_tarball(dir.path().to_str().unwrap(), &notifier)
            .is_err());
    }
}
