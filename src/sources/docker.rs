use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

use super::Source;
use crate::notifier::Notifier;

/// Exports images from the local Docker daemon with `docker save`.
pub struct DockerSource;

impl DockerSource {
    pub fn new() -> Result<Self> {
        Ok(Self)
    }

    fn run_command(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("docker")
            .args(args)
            .output()
            .with_context(|| format!("Failed to execute docker command: {:?}", args))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Docker command failed: {}", error.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Source for DockerSource {
    fn name(&self) -> &str {
        "docker"
    }

    fn get_image_tarball(
        &self,
        image_name: &str,
        notifier: &Notifier,
    ) -> Result<(PathBuf, Option<TempDir>)> {
        let temp_dir = TempDir::new().context("Failed to create temporary directory")?;
        let tarball_path = temp_dir.path().join("image.tar");
        let tarball_arg = tarball_path
            .to_str()
            .ok_or_else(|| anyhow!("Temporary path is not valid UTF-8"))?;

        notifier.info(&format!("Exporting Docker image '{}'...", image_name));
        self.run_command(&["save", "-o", tarball_arg, image_name])?;

        Ok((tarball_path, Some(temp_dir)))
    }
}
