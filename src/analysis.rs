use crate::efficiency::{self, Inefficiency};
use crate::filetree::FileTree;
use crate::image::{ImageArchive, Layer};
use crate::metadata::ImageMetadata;
use crate::notifier::Notifier;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSummary {
    pub index: usize,
    pub id: String,
    pub digest: String,
    pub command: String,
    pub created_at: Option<DateTime<Utc>>,
    pub size_bytes: u64,
}

/// Everything a run learns about one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub image: ImageMetadata,
    pub layers: Vec<LayerSummary>,
    /// One tree per layer, same order as `layers`.
    pub ref_trees: Vec<FileTree>,
    pub size_bytes: u64,
    /// Bytes added by every layer above the base.
    pub user_size_bytes: u64,
    pub wasted_bytes: u64,
    pub wasted_user_percent: f64,
    pub efficiency: f64,
    pub inefficiencies: Vec<Inefficiency>,
}

impl AnalysisResult {
    /// Reads every layer of `image` and measures it.
    pub fn analyze(image: &ImageArchive, notifier: &Notifier) -> Result<Self> {
        let ref_trees = image.read_ref_trees(notifier)?;
        notifier.info("Measuring wasted space...");
        Ok(Self::from_parts(image.metadata().clone(), image.layers(), ref_trees))
    }

    /// `layers` and `ref_trees` must be index-aligned.
    pub fn from_parts(image: ImageMetadata, layers: &[Layer], ref_trees: Vec<FileTree>) -> Self {
        let layers: Vec<LayerSummary> = layers
            .iter()
            .zip(&ref_trees)
            .map(|(layer, tree)| LayerSummary {
                index: layer.index,
                id: layer.id.clone(),
                digest: layer.digest.clone(),
                command: layer.command.clone(),
                created_at: layer.created_at,
                size_bytes: tree.total_size(),
            })
            .collect();

        let size_bytes: u64 = layers.iter().map(|layer| layer.size_bytes).sum();
        let user_size_bytes: u64 = layers.iter().skip(1).map(|layer| layer.size_bytes).sum();
        let report = efficiency::analyze(&ref_trees);

        let wasted_user_percent = if user_size_bytes == 0 {
            0.0
        } else {
            report.wasted_bytes as f64 / user_size_bytes as f64
        };

        Self {
            image,
            layers,
            ref_trees,
            size_bytes,
            user_size_bytes,
            wasted_bytes: report.wasted_bytes,
            wasted_user_percent,
            efficiency: report.efficiency,
            inefficiencies: report.inefficiencies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filetree::FileInfo;
    use std::path::PathBuf;

    fn layer(index: usize, command: &str) -> Layer {
        Layer {
            index,
            id: format!("layer{}", index),
            digest: format!("sha256:layer{}", index),
            command: command.to_string(),
            created_at: None,
            comment: None,
            tarball_path: PathBuf::from(format!("layer{}.tar", index)),
        }
    }

    fn image() -> ImageMetadata {
        ImageMetadata {
            id: "sha256:image".to_string(),
            repo_tags: vec!["demo:latest".to_string()],
            created: String::new(),
            architecture: "amd64".to_string(),
            os: "linux".to_string(),
            history: Vec::new(),
        }
    }

    #[test]
    fn test_sizes_and_waste() {
        let mut base = FileTree::new();
        base.add_path("/a", FileInfo::file(10));
        let mut upper = FileTree::new();
        upper.add_path("/a", FileInfo::file(20));
        upper.add_path("/b", FileInfo::file(5));

        let result = AnalysisResult::from_parts(
            image(),
            &[layer(0, "ADD rootfs"), layer(1, "RUN build")],
            vec![base, upper],
        );

        assert_eq!(result.layers[0].size_bytes, 10);
        assert_eq!(result.layers[1].size_bytes, 25);
        assert_eq!(result.size_bytes, 35);
        assert_eq!(result.user_size_bytes, 25);
        assert_eq!(result.wasted_bytes, 30);
        assert!((result.wasted_user_percent - 30.0 / 25.0).abs() < 1e-9);
        assert_eq!(result.inefficiencies.len(), 1);
    }

    #[test]
    fn test_base_only_image_has_no_user_waste() {
        let mut base = FileTree::new();
        base.add_path("/a", FileInfo::file(10));

        let result = AnalysisResult::from_parts(image(), &[layer(0, "ADD rootfs")], vec![base]);
        assert_eq!(result.user_size_bytes, 0);
        assert_eq!(result.wasted_user_percent, 0.0);
        assert_eq!(result.efficiency, 1.0);
    }
}
