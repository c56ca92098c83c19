//! Wasted-space accounting across layers.
//!
//! Each path is followed through the RefTrees in layer order. Every time a
//! layer touches a file (adds, replaces or whites it out) its size at that
//! point is added to the path's cumulative size. A path touched by more than
//! one layer is an [`Inefficiency`]: all but the smallest copy is space the
//! image carries without being able to use it.

use crate::filetree::{FileTree, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inefficiency {
    pub path: String,
    pub cumulative_size: u64,
    /// Layer indices that touched the path, oldest first.
    pub layers: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyReport {
    /// `1.0` means no layer duplicated, replaced or deleted anything.
    pub efficiency: f64,
    pub wasted_bytes: u64,
    /// Largest waste first.
    pub inefficiencies: Vec<Inefficiency>,
}

#[derive(Default)]
struct PathData {
    cumulative_size: u64,
    min_size: Option<u64>,
    layers: Vec<usize>,
}

impl PathData {
    fn record(&mut self, layer: usize, size: u64) {
        self.cumulative_size += size;
        self.min_size = Some(self.min_size.map_or(size, |min| min.min(size)));
        self.layers.push(layer);
    }
}

/// Drops the live files at or below `path`, returning them with their sizes.
fn take_subtree(
    live: &mut BTreeMap<String, u64>,
    path: &str,
    include_self: bool,
) -> Vec<(String, u64)> {
    let mut dropped = Vec::new();
    if include_self {
        if let Some(size) = live.remove(path) {
            dropped.push((path.to_string(), size));
        }
    }

    let prefix = format!("{}/", path);
    let below: Vec<String> = live
        .range(prefix.clone()..)
        .take_while(|(candidate, _)| candidate.starts_with(&prefix))
        .map(|(candidate, _)| candidate.clone())
        .collect();
    for candidate in below {
        if let Some(size) = live.remove(&candidate) {
            dropped.push((candidate, size));
        }
    }
    dropped
}

pub fn analyze(ref_trees: &[FileTree]) -> EfficiencyReport {
    let mut paths: HashMap<String, PathData> = HashMap::new();
    // sizes of files present after the layers seen so far
    let mut live: BTreeMap<String, u64> = BTreeMap::new();

    for (index, tree) in ref_trees.iter().enumerate() {
        tree.walk(|node| {
            // deleted or hidden files count once more, at the size they had
            let dropped = if node.whiteout {
                take_subtree(&mut live, &node.path, true)
            } else if node.opaque {
                take_subtree(&mut live, &node.path, false)
            } else {
                Vec::new()
            };
            for (path, size) in dropped {
                // a file the same layer writes again is recorded once, below
                let rewritten = tree
                    .node(&path)
                    .is_some_and(|again| !again.whiteout && again.info.kind != NodeKind::Directory);
                if !rewritten {
                    paths.entry(path).or_default().record(index, size);
                }
            }

            if !node.whiteout && node.info.kind != NodeKind::Directory {
                paths
                    .entry(node.path.clone())
                    .or_default()
                    .record(index, node.info.size);
                live.insert(node.path.clone(), node.info.size);
            }
        });
    }

    let mut minimum_total = 0u64;
    let mut discovered_total = 0u64;
    let mut inefficiencies = Vec::new();

    for (path, data) in paths {
        minimum_total += data.min_size.unwrap_or(0);
        discovered_total += data.cumulative_size;
        if data.layers.len() > 1 {
            inefficiencies.push(Inefficiency {
                path,
                cumulative_size: data.cumulative_size,
                layers: data.layers,
            });
        }
    }

    inefficiencies.sort_by(|a, b| {
        b.cumulative_size
            .cmp(&a.cumulative_size)
            .then_with(|| a.path.cmp(&b.path))
    });

    let efficiency = if discovered_total == 0 {
        1.0
    } else {
        minimum_total as f64 / discovered_total as f64
    };

    EfficiencyReport {
        efficiency,
        wasted_bytes: inefficiencies.iter().map(|i| i.cumulative_size).sum(),
        inefficiencies,
    }
}
