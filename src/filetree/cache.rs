//! Memoized layer views.
//!
//! [`TreeStackCache`] owns the ordered RefTrees of one image and hands out
//! derived trees for [`CacheKey`]s: squash the bottom range, then compare each
//! layer of the top range onto it in index order. Every key is built at most
//! once per cache; the result is published as an `Arc<FileTree>` and never
//! touched again.
//!
//! The cache is `Sync`. Callers racing on the same key wait for the first
//! builder instead of building twice, and builds of different keys never
//! block each other.

use super::stack::stack_tree_range;
use super::tree::FileTree;
use super::view::ViewMode;
use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Merge `bottom_start..=bottom_stop`, then compare `top_start..=top_stop` onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub bottom_start: usize,
    pub bottom_stop: usize,
    pub top_start: usize,
    pub top_stop: usize,
}

impl CacheKey {
    pub fn new(bottom_start: usize, bottom_stop: usize, top_start: usize, top_stop: usize) -> Self {
        Self {
            bottom_start,
            bottom_stop,
            top_start,
            top_stop,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.bottom_start, self.bottom_stop, self.top_start, self.top_stop
        )
    }
}

/// A key the cache refuses to build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("no layers to build key {key} from")]
    NoLayers { key: CacheKey },
    #[error("layer index {index} in key {key} is out of range for {layer_count} layers")]
    LayerOutOfRange {
        key: CacheKey,
        index: usize,
        layer_count: usize,
    },
    #[error("{range} range of key {key} is inverted")]
    InvertedRange { key: CacheKey, range: &'static str },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub merges: usize,
    pub compares: usize,
}

#[derive(Default)]
struct Counters {
    hits: AtomicUsize,
    misses: AtomicUsize,
    merges: AtomicUsize,
    compares: AtomicUsize,
}

type Slot = Arc<OnceLock<Arc<FileTree>>>;

pub struct TreeStackCache {
    ref_trees: Arc<[FileTree]>,
    slots: Mutex<HashMap<CacheKey, Slot>>,
    counters: Counters,
}

impl TreeStackCache {
    pub fn new(ref_trees: impl Into<Arc<[FileTree]>>) -> Self {
        Self {
            ref_trees: ref_trees.into(),
            slots: Mutex::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    pub fn layer_count(&self) -> usize {
        self.ref_trees.len()
    }

    /// Checks a key against the layers this cache holds.
    pub fn validate(&self, key: CacheKey) -> Result<(), CacheError> {
        let layer_count = self.layer_count();
        if layer_count == 0 {
            return Err(CacheError::NoLayers { key });
        }
        for index in [key.bottom_start, key.bottom_stop, key.top_start, key.top_stop] {
            if index >= layer_count {
                return Err(CacheError::LayerOutOfRange {
                    key,
                    index,
                    layer_count,
                });
            }
        }
        if key.bottom_start > key.bottom_stop {
            return Err(CacheError::InvertedRange { key, range: "bottom" });
        }
        if key.top_start > key.top_stop {
            return Err(CacheError::InvertedRange { key, range: "top" });
        }
        Ok(())
    }

    /// Returns the derived tree for `key`, building it on first request.
    pub fn get(&self, key: CacheKey) -> Result<Arc<FileTree>, CacheError> {
        self.validate(key)?;

        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(key).or_default())
        };

        let mut built = false;
        let tree = slot.get_or_init(|| {
            built = true;
            Arc::new(self.build_tree(key))
        });

        let counter = if built {
            &self.counters.misses
        } else {
            &self.counters.hits
        };
        counter.fetch_add(1, Ordering::Relaxed);

        Ok(Arc::clone(tree))
    }

    fn build_tree(&self, key: CacheKey) -> FileTree {
        debug!("Building tree for key {}", key);

        let mut tree = stack_tree_range(&self.ref_trees, key.bottom_start, key.bottom_stop);
        self.counters.merges.fetch_add(1, Ordering::Relaxed);

        for layer in &self.ref_trees[key.top_start..=key.top_stop] {
            tree.compare_and_mark(layer);
            self.counters.compares.fetch_add(1, Ordering::Relaxed);
        }
        tree
    }

    /// Builds every key in `keys` that is not cached yet.
    pub fn warm<I>(&self, keys: I) -> Result<(), CacheError>
    where
        I: IntoIterator<Item = CacheKey>,
    {
        self.warm_with(keys, |_| {})
    }

    /// Like [`warm`](Self::warm), calling `on_each` after every key is ready.
    pub fn warm_with<I, F>(&self, keys: I, mut on_each: F) -> Result<(), CacheError>
    where
        I: IntoIterator<Item = CacheKey>,
        F: FnMut(CacheKey),
    {
        for key in keys {
            self.get(key)?;
            on_each(key);
        }
        Ok(())
    }

    /// Warms the per-layer and aggregated views of every layer.
    pub fn build(&self) -> Result<(), CacheError> {
        self.build_with(|_| {})
    }

    /// Like [`build`](Self::build), calling `on_each` once per view key, two
    /// per layer. Keys shared by both views are reported twice.
    pub fn build_with<F>(&self, on_each: F) -> Result<(), CacheError>
    where
        F: FnMut(CacheKey),
    {
        self.warm_with(self.view_keys(), on_each)
    }

    fn view_keys(&self) -> Vec<CacheKey> {
        let layer_count = self.layer_count();
        ViewMode::ALL
            .into_iter()
            .flat_map(|mode| mode.keys(layer_count))
            .collect()
    }

    /// Whether `key` has a published tree.
    pub fn contains(&self, key: CacheKey) -> bool {
        self.slots
            .lock()
            .get(&key)
            .is_some_and(|slot| slot.get().is_some())
    }

    /// Number of published trees.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            merges: self.counters.merges.load(Ordering::Relaxed),
            compares: self.counters.compares.load(Ordering::Relaxed),
        }
    }
}
