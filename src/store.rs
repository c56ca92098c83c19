//! On-disk cache of analysis results, one JSON record per image digest.
//!
//! Records carry [`FORMAT_VERSION`]; a record written by another version is
//! reported as an error instead of being half-read.

use crate::analysis::AnalysisResult;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub format_version: u32,
    pub saved_at: DateTime<Utc>,
    pub analysis: AnalysisResult,
}

#[derive(Deserialize)]
struct RecordVersion {
    format_version: u32,
}

/// `<dir>/<hex>.json` for a `sha256:<hex>` digest.
pub fn record_path(dir: &Path, image_digest: &str) -> PathBuf {
    let name = image_digest
        .rsplit(':')
        .next()
        .filter(|hex| !hex.is_empty())
        .unwrap_or("unknown");
    dir.join(format!("{}.json", name))
}

pub fn save(dir: &Path, analysis: &AnalysisResult) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create cache directory: {}", dir.display()))?;

    let path = record_path(dir, &analysis.image.id);
    let record = AnalysisRecord {
        format_version: FORMAT_VERSION,
        saved_at: Utc::now(),
        analysis: analysis.clone(),
    };

    let file = File::create(&path)
        .with_context(|| format!("Failed to create cache file: {}", path.display()))?;
    serde_json::to_writer(BufWriter::new(file), &record)
        .with_context(|| format!("Failed to write cache file: {}", path.display()))?;

    log::debug!("Saved analysis to {}", path.display());
    Ok(path)
}

/// `Ok(None)` when nothing is cached for `image_digest`.
pub fn load(dir: &Path, image_digest: &str) -> Result<Option<AnalysisResult>> {
    let path = record_path(dir, image_digest);
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read cache file: {}", path.display()))?;

    let version: RecordVersion = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse cache file: {}", path.display()))?;
    if version.format_version != FORMAT_VERSION {
        return Err(anyhow!(
            "Cache file {} has format version {}, expected {}",
            path.display(),
            version.format_version,
            FORMAT_VERSION
        ));
    }

    let record: AnalysisRecord = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse cache file: {}", path.display()))?;
    Ok(Some(record.analysis))
}
