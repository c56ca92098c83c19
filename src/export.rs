use crate::analysis::AnalysisResult;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportLayer {
    pub index: usize,
    pub id: String,
    pub digest_id: String,
    pub size_bytes: u64,
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReference {
    pub count: usize,
    pub size_bytes: u64,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportImage {
    pub size_bytes: u64,
    pub inefficient_bytes: u64,
    pub efficiency_score: f64,
    pub file_reference: Vec<FileReference>,
}

/// Machine-readable summary written by `--export`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub layer: Vec<ExportLayer>,
    pub image: ExportImage,
}

impl ExportDocument {
    pub fn new(analysis: &AnalysisResult) -> Self {
        let layer = analysis
            .layers
            .iter()
            .map(|layer| ExportLayer {
                index: layer.index,
                id: layer.id.clone(),
                digest_id: layer.digest.clone(),
                size_bytes: layer.size_bytes,
                command: layer.command.clone(),
            })
            .collect();

        let file_reference = analysis
            .inefficiencies
            .iter()
            .map(|inefficiency| FileReference {
                count: inefficiency.layers.len(),
                size_bytes: inefficiency.cumulative_size,
                file: inefficiency.path.clone(),
            })
            .collect();

        Self {
            layer,
            image: ExportImage {
                size_bytes: analysis.size_bytes,
                inefficient_bytes: analysis.wasted_bytes,
                efficiency_score: analysis.efficiency,
                file_reference,
            },
        }
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create export file: {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("Failed to write export file: {}", path.display()))?;
        Ok(())
    }
}
