//! Turns one layer archive into the RefTree for that layer.
//!
//! Overlay markers become tree annotations instead of files:
//! `.wh.<name>` records a whiteout node for `<name>`, and `.wh..wh..opq`
//! marks its directory opaque. Regular files are hashed with blake3 so
//! later comparisons catch same-size edits. Hard links take their target's
//! kind, mode and digest with a size of zero, since the bytes are already
//! counted once. Device nodes and fifos are skipped.
//!
//! Directories created only as the parent of another entry are flagged
//! `implicit`, so stacking or comparing them never overrides the lower
//! layer's own directory.

use crate::archive::{normalize_tar_path, open_archive};
use crate::filetree::{FileInfo, FileTree};
use anyhow::{Context, Result};
use log::{debug, trace, warn};
use std::io::{self, Read};
use std::path::Path;
use tar_rs as tar;

const WHITEOUT_PREFIX: &str = ".wh.";
const OPAQUE_MARKER: &str = ".wh..wh..opq";

/// Reads a layer tarball (plain or gzip) from disk.
pub fn read_layer(layer_path: &Path) -> Result<FileTree> {
    let mut archive = open_archive(layer_path)?;
    read_entries(&mut archive)
        .with_context(|| format!("Failed to read layer: {}", layer_path.display()))
}

/// Reads an uncompressed layer tar stream.
pub fn read_layer_from<R: Read>(reader: R) -> Result<FileTree> {
    let mut archive = tar::Archive::new(reader);
    read_entries(&mut archive)
}

fn tree_path(archive_path: &Path) -> String {
    format!("/{}", normalize_tar_path(archive_path).to_string_lossy())
}

fn read_entries<R: Read>(archive: &mut tar::Archive<R>) -> Result<FileTree> {
    let mut tree = FileTree::new();

    for entry in archive.entries()? {
        let mut entry = entry.context("Failed to read tar entry")?;
        let rel_path = normalize_tar_path(&entry.path().context("Failed to get entry path")?);
        if rel_path.as_os_str().is_empty() {
            continue;
        }

        let path = tree_path(&rel_path);
        let parent = rel_path.parent().map(tree_path).unwrap_or_else(|| "/".to_string());
        let file_name = rel_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        if file_name == OPAQUE_MARKER {
            if parent == "/" {
                debug!("Ignoring opaque marker at layer root");
                continue;
            }
            if tree.node(&parent).is_none() {
                tree.add_path(&parent, FileInfo::directory()).implicit = true;
            }
            if let Some(dir) = tree.node_mut(&parent) {
                dir.opaque = true;
            }
            trace!("Opaque directory {}", parent);
            continue;
        }

        if let Some(deleted) = file_name.strip_prefix(WHITEOUT_PREFIX) {
            let target = tree_path(&rel_path.with_file_name(deleted));
            trace!("Whiteout {}", target);
            tree.add_path(&target, FileInfo::file(0)).whiteout = true;
            continue;
        }

        let entry_type = entry.header().entry_type();
        let mode = entry.header().mode().unwrap_or(0o644) & 0o7777;

        let info = match entry_type {
            tar::EntryType::Directory => FileInfo::directory().with_mode(mode),
            tar::EntryType::Regular | tar::EntryType::Continuous => {
                let mut hasher = blake3::Hasher::new();
                let size = io::copy(&mut entry, &mut hasher)
                    .with_context(|| format!("Failed to read file: {}", path))?;
                FileInfo::file(size)
                    .with_mode(mode)
                    .with_digest(hasher.finalize().to_hex().to_string())
            }
            tar::EntryType::Symlink => {
                let target = entry
                    .link_name()
                    .context("Failed to get symlink target")?
                    .map(|target| target.to_string_lossy().into_owned())
                    .unwrap_or_default();
                FileInfo::symlink(target).with_mode(mode)
            }
            tar::EntryType::Link => {
                let target = entry
                    .link_name()
                    .context("Failed to get hardlink target")?
                    .map(|target| tree_path(&target));
                match target.as_deref().and_then(|target| tree.node(target)) {
                    Some(node) => FileInfo {
                        size: 0,
                        ..node.info.clone()
                    },
                    None => {
                        warn!("Hardlink {} points at a path outside this layer", path);
                        FileInfo::file(0).with_mode(mode)
                    }
                }
            }
            other => {
                debug!("Skipping unsupported entry type {:?}: {}", other, path);
                continue;
            }
        };

        tree.add_path(&path, info);
    }

    Ok(tree)
}
