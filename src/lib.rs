pub mod analysis;
pub mod archive;
pub mod efficiency;
pub mod export;
pub mod filetree;
pub mod image;
pub mod layer_reader;
pub mod metadata;
pub mod notifier;
pub mod render;
pub mod runtime;
pub mod sources;
pub mod store;

// Re-exports for easy access
pub use analysis::{AnalysisResult, LayerSummary};
pub use efficiency::{EfficiencyReport, Inefficiency};
pub use export::ExportDocument;
pub use filetree::{
    stack_tree_range, CacheError, CacheKey, CacheStats, DiffType, FileInfo, FileNode, FileTree,
    NodeKind, TreeStackCache, ViewMode,
};
pub use image::{ImageArchive, Layer};
pub use metadata::{HistoryEntry, ImageMetadata};
pub use notifier::Notifier;
pub use runtime::{Options, SourceKind};
pub use sources::{DockerSource, Source, TarSource};
