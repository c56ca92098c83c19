//! Layer filesystem trees: squash a layer range into one tree, mark it against
//! further layers, and memoize the results per range.

pub mod cache;
mod compare;
pub mod node;
pub mod stack;
pub mod tree;
pub mod view;

pub use cache::{CacheError, CacheKey, CacheStats, TreeStackCache};
pub use node::{DiffType, FileInfo, FileNode, NodeKind};
pub use stack::stack_tree_range;
pub use tree::FileTree;
pub use view::ViewMode;
