use super::node::{DiffType, FileInfo, FileNode};
use serde::{Deserialize, Serialize};

/// Splits an archive or absolute path into its non-empty segments.
pub(crate) fn path_segments(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect()
}

fn join_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Turns a non-directory into an implicit directory so it can hold children.
fn make_parent(node: &mut FileNode) {
    if !node.is_dir() {
        node.replace_info(FileInfo::directory());
        node.implicit = true;
    }
}

/// Rooted tree of filesystem nodes.
///
/// A tree read from a single layer archive (a RefTree) records that layer's own
/// operations: plain nodes add or replace a path, whiteout nodes delete one, and
/// opaque directories hide whatever the lower layers put inside them. Trees
/// produced by [`super::stack_tree_range`] and
/// [`FileTree::compare_and_mark`] hold the resulting filesystem instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileTree {
    root: FileNode,
}

impl Default for FileTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTree {
    pub fn new() -> Self {
        Self {
            root: FileNode::root(),
        }
    }

    pub fn root(&self) -> &FileNode {
        &self.root
    }

    pub fn node(&self, path: &str) -> Option<&FileNode> {
        let mut current = &self.root;
        for segment in path_segments(path) {
            current = current.children.get(segment)?;
        }
        Some(current)
    }

    pub(crate) fn node_mut(&mut self, path: &str) -> Option<&mut FileNode> {
        let mut current = &mut self.root;
        for segment in path_segments(path) {
            current = current.children.get_mut(segment)?;
        }
        Some(current)
    }

    /// Inserts `path` with `info`, creating intermediate directories as needed.
    /// An existing node keeps its status and only has its info replaced.
    /// Intermediates created here are flagged [`FileNode::implicit`]; the
    /// returned node is not.
    pub fn add_path(&mut self, path: &str, info: FileInfo) -> &mut FileNode {
        self.insert(path, info, DiffType::Unmodified)
    }

    /// Like [`FileTree::add_path`], but every node created on the way starts with `fill`.
    pub(crate) fn insert(&mut self, path: &str, info: FileInfo, fill: DiffType) -> &mut FileNode {
        let segments = path_segments(path);
        let mut current = &mut self.root;
        let Some((leaf, parents)) = segments.split_last() else {
            return current;
        };

        for segment in parents {
            make_parent(current);
            let child_path = join_path(&current.path, segment);
            current = current
                .children
                .entry((*segment).to_string())
                .or_insert_with(|| {
                    let mut node = FileNode::new(*segment, child_path, FileInfo::directory());
                    node.implicit = true;
                    node.diff = fill;
                    node.aggregate = fill;
                    node
                });
        }

        make_parent(current);
        let leaf_path = join_path(&current.path, leaf);
        let node = current
            .children
            .entry((*leaf).to_string())
            .or_insert_with(|| {
                let mut node = FileNode::new(*leaf, leaf_path, info.clone());
                node.diff = fill;
                node.aggregate = fill;
                node
            });
        if node.info != info {
            node.replace_info(info);
        }
        node.implicit = false;
        node
    }

    /// Detaches `path` and its subtree. The root cannot be removed.
    pub fn remove_path(&mut self, path: &str) -> Option<FileNode> {
        let segments = path_segments(path);
        let (leaf, parents) = segments.split_last()?;
        let mut current = &mut self.root;
        for segment in parents {
            current = current.children.get_mut(*segment)?;
        }
        current.children.remove(*leaf)
    }

    /// Pre-order walk over every node except the root.
    pub fn walk<F: FnMut(&FileNode)>(&self, mut visitor: F) {
        for child in self.root.children.values() {
            child.walk(&mut visitor);
        }
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        self.walk(|node| paths.push(node.path.clone()));
        paths
    }

    /// Number of nodes, not counting the root.
    pub fn len(&self) -> usize {
        let mut count = 0;
        self.walk(|_| count += 1);
        count
    }

    pub fn is_empty(&self) -> bool {
        !self.root.has_children()
    }

    /// Bytes held by files in this tree, excluding whiteouts and Removed tombstones.
    pub fn total_size(&self) -> u64 {
        self.root.size_on_disk()
    }

    pub(crate) fn refresh_aggregates(&mut self) {
        self.root.refresh_aggregate();
    }
}
