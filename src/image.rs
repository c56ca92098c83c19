//! Unpacked image archive with its metadata and filesystem layers.
//!
//! [`ImageArchive`] unpacks a `docker save`/OCI tarball into a temporary
//! directory and exposes:
//! - [`ImageMetadata`] (digest id, repo tags, os, architecture, history),
//! - the ordered filesystem [`Layer`]s (oldest first), each paired with the
//!   history entry that created it,
//! - [`ImageArchive::read_ref_trees`], which streams every layer blob into its
//!   RefTree.
//!
//! History entries flagged `empty_layer` have no blob and no tree, so they do
//! not appear in [`ImageArchive::layers`]. The image id is the first manifest
//! digest in `index.json`, falling back to the config blob name.

use crate::archive;
use crate::filetree::FileTree;
use crate::layer_reader;
use crate::metadata::{self, HistoryEntry, ImageMetadata};
use crate::notifier::Notifier;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Layer {
    /// Position among filesystem layers, 0 = base.
    pub index: usize,
    pub id: String,
    /// `sha256:<hex>` of the layer blob.
    pub digest: String,
    pub command: String,
    pub created_at: Option<DateTime<Utc>>,
    pub comment: Option<String>,
    pub tarball_path: PathBuf,
}

pub struct ImageArchive {
    _temp_dir: tempfile::TempDir,
    metadata: ImageMetadata,
    layers: Vec<Layer>,
}

impl ImageArchive {
    pub fn from_tarball<P: AsRef<Path>>(tarball_path: P, notifier: &Notifier) -> Result<Self> {
        let tarball_path = tarball_path.as_ref();
        notifier.debug(&format!("Unpacking image tarball: {:?}", tarball_path));

        let temp_dir = tempfile::tempdir().context("Failed to create temporary directory")?;
        let extract_dir = temp_dir.path().join("image");
        archive::unpack(tarball_path, &extract_dir)?;

        if !extract_dir.join("manifest.json").exists() {
            return Err(anyhow!(
                "Invalid image tarball: manifest.json not found. This does not appear to be a docker save/OCI image tarball."
            ));
        }

        let manifest = read_manifest(&extract_dir)?;
        let metadata = load_metadata(&extract_dir, &manifest)?;
        let layers = load_layers(&extract_dir, &manifest, &metadata.history)?;

        notifier.info(&format!("Found {} filesystem layers", layers.len()));

        Ok(Self {
            _temp_dir: temp_dir,
            metadata,
            layers,
        })
    }

    pub fn metadata(&self) -> &ImageMetadata {
        &self.metadata
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// One RefTree per layer, in layer order.
    pub fn read_ref_trees(&self, notifier: &Notifier) -> Result<Vec<FileTree>> {
        let total = self.layers.len() as u64;
        let bar = notifier.progress_bar(total, "Reading layers");
        let mut trees = Vec::with_capacity(self.layers.len());

        for layer in &self.layers {
            notifier.debug(&format!(
                "Reading layer {} ({}): {}",
                layer.index, layer.digest, layer.command
            ));
            trees.push(layer_reader::read_layer(&layer.tarball_path)?);

            notifier.progress(layer.index as u64 + 1, total, "Reading layers");
            if let Some(bar) = &bar {
                bar.inc(1);
            }
        }

        if let Some(bar) = bar {
            bar.finish_and_clear();
        }
        Ok(trees)
    }
}

/// First entry of `manifest.json`.
fn read_manifest(extract_dir: &Path) -> Result<Value> {
    let content = fs::read_to_string(extract_dir.join("manifest.json"))
        .context("Failed to read manifest.json")?;
    let manifest: Vec<Value> =
        serde_json::from_str(&content).context("Failed to parse manifest.json")?;
    manifest
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("Empty manifest.json"))
}

fn load_metadata(extract_dir: &Path, manifest: &Value) -> Result<ImageMetadata> {
    let config_file = manifest["Config"]
        .as_str()
        .ok_or_else(|| anyhow!("Invalid manifest format - missing Config"))?;

    let config_content = fs::read_to_string(extract_dir.join(config_file))
        .with_context(|| format!("Failed to read config file: {}", config_file))?;
    let config: oci_spec::image::ImageConfiguration =
        serde_json::from_str(&config_content).context("Failed to parse image configuration")?;

    let mut metadata = metadata::from_oci_config(&config);
    metadata.id = index_digest(extract_dir)?.unwrap_or_else(|| config_digest(config_file));
    metadata.repo_tags = manifest["RepoTags"]
        .as_array()
        .map(|tags| {
            tags.iter()
                .filter_map(|tag| tag.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Ok(metadata)
}

fn index_digest(extract_dir: &Path) -> Result<Option<String>> {
    let index_path = extract_dir.join("index.json");
    if !index_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&index_path).context("Failed to read index.json")?;
    let index: Value = serde_json::from_str(&content).context("Failed to parse index.json")?;
    Ok(index["manifests"][0]["digest"].as_str().map(str::to_string))
}

/// `blobs/sha256/<hex>` or `<hex>.json` → `sha256:<hex>`.
fn config_digest(config_file: &str) -> String {
    let name = Path::new(config_file)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(config_file);
    let hex = name.strip_suffix(".json").unwrap_or(name);
    format!("sha256:{}", hex)
}

/// `blobs/sha256/<hex>` → `sha256:<hex>`; `<hex>/layer.tar` → `sha256:<hex>`.
fn layer_digest(layer_ref: &str) -> String {
    let path = Path::new(layer_ref);
    let name = match path.file_name().and_then(|name| name.to_str()) {
        Some("layer.tar") => path
            .parent()
            .and_then(|parent| parent.file_name())
            .and_then(|name| name.to_str())
            .unwrap_or(layer_ref),
        Some(name) => name,
        None => layer_ref,
    };
    let hex = name.strip_suffix(".tar").unwrap_or(name);
    if hex.starts_with("sha256:") {
        hex.to_string()
    } else {
        format!("sha256:{}", hex)
    }
}

fn load_layers(extract_dir: &Path, manifest: &Value, history: &[HistoryEntry]) -> Result<Vec<Layer>> {
    let layer_refs = manifest["Layers"]
        .as_array()
        .ok_or_else(|| anyhow!("Invalid manifest format - missing Layers array"))?
        .iter()
        .map(|layer| {
            layer
                .as_str()
                .ok_or_else(|| anyhow!("Invalid layer reference"))
        })
        .collect::<Result<Vec<_>>>()?;

    // Blobs line up with the newest non-empty history entries.
    let filesystem_history: Vec<&HistoryEntry> =
        history.iter().filter(|entry| !entry.empty_layer).collect();
    let offset = filesystem_history.len() as isize - layer_refs.len() as isize;

    let layers = layer_refs
        .iter()
        .enumerate()
        .map(|(index, layer_ref)| {
            let entry = usize::try_from(index as isize + offset)
                .ok()
                .and_then(|position| filesystem_history.get(position));
            let digest = layer_digest(layer_ref);
            Layer {
                index,
                id: digest.trim_start_matches("sha256:").chars().take(12).collect(),
                digest,
                command: entry.map(|entry| entry.command()).unwrap_or_default(),
                created_at: entry.and_then(|entry| {
                    DateTime::parse_from_rfc3339(&entry.created)
                        .ok()
                        .map(|created| created.with_timezone(&Utc))
                }),
                comment: entry.and_then(|entry| entry.comment.clone()),
                tarball_path: extract_dir.join(layer_ref),
            }
        })
        .collect();

    Ok(layers)
}
