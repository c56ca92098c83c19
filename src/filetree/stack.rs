use super::node::{DiffType, FileNode};
use super::tree::FileTree;
use log::trace;

impl FileTree {
    /// Applies one layer's own operations on top of this tree.
    ///
    /// Whiteouts delete their path (a directory goes with its whole subtree),
    /// opaque directories drop what was below them, and everything else is
    /// inserted or replaced. Implicit parents leave an existing directory as
    /// it was. The result carries no diff annotations.
    pub fn stack(&mut self, layer: &FileTree) {
        for child in layer.root().children() {
            self.stack_node(child);
        }
    }

    fn stack_node(&mut self, upper: &FileNode) {
        if upper.whiteout {
            if self.remove_path(&upper.path).is_none() {
                trace!("whiteout for missing path {}", upper.path);
            }
            return;
        }

        let keep_lower = upper.implicit && self.node(&upper.path).is_some_and(FileNode::is_dir);
        if !keep_lower {
            self.insert(&upper.path, upper.info.clone(), DiffType::Unmodified)
                .implicit = upper.implicit;
        }
        if upper.opaque {
            if let Some(node) = self.node_mut(&upper.path) {
                node.children.clear();
            }
        }

        for child in upper.children() {
            self.stack_node(child);
        }
    }
}

/// Squashes `ref_trees[start..=stop]` into one tree, later layers winning.
///
/// An inverted range (`start > stop`) yields an empty tree.
///
/// # Panics
/// If `stop` is past the end of `ref_trees` while `start <= stop`.
pub fn stack_tree_range(ref_trees: &[FileTree], start: usize, stop: usize) -> FileTree {
    let mut tree = FileTree::new();
    if start > stop {
        return tree;
    }
    for layer in &ref_trees[start..=stop] {
        tree.stack(layer);
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filetree::FileInfo;

    fn whiteout(tree: &mut FileTree, path: &str) {
        tree.add_path(path, FileInfo::file(0)).whiteout = true;
    }

    #[test]
    fn test_later_layer_wins() {
        let mut base = FileTree::new();
        base.add_path("/app/config", FileInfo::file(10));
        let mut upper = FileTree::new();
        upper.add_path("/app/config", FileInfo::file(99));

        let merged = stack_tree_range(&[base.clone(), upper.clone()], 0, 1);
        assert_eq!(merged.node("/app/config").unwrap().info.size, 99);

        let reversed = stack_tree_range(&[upper, base], 0, 1);
        assert_eq!(reversed.node("/app/config").unwrap().info.size, 10);
    }

    #[test]
    fn test_whiteout_removes_subtree() {
        let mut base = FileTree::new();
        base.add_path("/opt/pkg/bin/run", FileInfo::file(5));
        base.add_path("/opt/keep", FileInfo::file(1));
        let mut upper = FileTree::new();
        whiteout(&mut upper, "/opt/pkg");
        whiteout(&mut upper, "/opt/never-existed");

        let merged = stack_tree_range(&[base, upper], 0, 1);
        assert_eq!(merged.paths(), vec!["/opt", "/opt/keep"]);
    }

    #[test]
    fn test_opaque_directory_hides_lower_contents() {
        let mut base = FileTree::new();
        base.add_path("/data/old", FileInfo::file(5));
        let mut upper = FileTree::new();
        upper.add_path("/data/new", FileInfo::file(6));
        upper.node_mut("/data").unwrap().opaque = true;

        let merged = stack_tree_range(&[base, upper], 0, 1);
        assert_eq!(merged.paths(), vec!["/data", "/data/new"]);
        assert!(!merged.node("/data").unwrap().opaque);
    }

    #[test]
    fn test_implicit_parent_keeps_lower_directory() {
        let mut base = FileTree::new();
        base.add_path("/secret", FileInfo::directory().with_mode(0o700));
        let mut upper = FileTree::new();
        upper.add_path("/secret/key", FileInfo::file(32));
        upper.add_path("/fresh/file", FileInfo::file(1));

        let merged = stack_tree_range(&[base, upper], 0, 1);
        let secret = merged.node("/secret").unwrap();
        assert_eq!(secret.info.mode, 0o700);
        assert!(!secret.implicit);
        assert!(merged.node("/secret/key").is_some());
        assert!(merged.node("/fresh").unwrap().implicit);
    }

    #[test]
    fn test_range_edges() {
        let mut only = FileTree::new();
        only.add_path("/bin/sh", FileInfo::file(100));

        let layers = vec![only.clone()];
        assert!(stack_tree_range(&layers, 1, 0).is_empty());
        assert_eq!(stack_tree_range(&layers, 0, 0), only);
    }

    #[test]
    fn test_file_replaced_by_directory() {
        let mut base = FileTree::new();
        base.add_path("/x", FileInfo::file(3));
        let mut upper = FileTree::new();
        upper.add_path("/x/y", FileInfo::file(4));

        let merged = stack_tree_range(&[base, upper], 0, 1);
        assert!(merged.node("/x").unwrap().is_dir());
        assert_eq!(merged.total_size(), 4);
    }
}
