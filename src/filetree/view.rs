use super::cache::CacheKey;

/// How a caller steps through layers.
///
/// - [`ViewMode::Layer`] shows one layer's own changes against everything below it.
/// - [`ViewMode::Aggregated`] shows layers `1..=i` folded over the base layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewMode {
    Layer,
    Aggregated,
}

impl ViewMode {
    pub const ALL: [ViewMode; 2] = [ViewMode::Layer, ViewMode::Aggregated];

    /// Cache key that renders layer `index` in this mode.
    pub fn key(self, index: usize) -> CacheKey {
        if index == 0 {
            return CacheKey::new(0, 0, 0, 0);
        }
        match self {
            ViewMode::Layer => CacheKey::new(0, index - 1, index, index),
            ViewMode::Aggregated => CacheKey::new(0, 0, 1, index),
        }
    }

    /// Keys for every layer of an image with `layer_count` layers.
    pub fn keys(self, layer_count: usize) -> impl Iterator<Item = CacheKey> {
        (0..layer_count).map(move |index| self.key(index))
    }
}
