use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status of a path relative to the tree it was compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DiffType {
    #[default]
    Unmodified,
    Modified,
    Added,
    Removed,
}

impl DiffType {
    fn precedence(self) -> u8 {
        match self {
            DiffType::Unmodified => 0,
            DiffType::Added => 1,
            DiffType::Modified => 2,
            DiffType::Removed => 3,
        }
    }

    /// Folds two statuses into the one a parent directory should show.
    /// Removed outranks Modified, which outranks Added.
    pub fn merge(self, other: DiffType) -> DiffType {
        if other.precedence() > self.precedence() {
            other
        } else {
            self
        }
    }

    /// Single character used when listing a tree.
    pub fn marker(self) -> char {
        match self {
            DiffType::Unmodified => ' ',
            DiffType::Modified => '~',
            DiffType::Added => '+',
            DiffType::Removed => '-',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    File,
    Directory,
    Symlink,
}

/// What a layer recorded for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub kind: NodeKind,
    pub size: u64,
    pub mode: u32,
    pub link_target: Option<String>,
    /// blake3 hex digest of regular file contents
    pub digest: Option<String>,
}

impl FileInfo {
    pub fn directory() -> Self {
        Self {
            kind: NodeKind::Directory,
            size: 0,
            mode: 0o755,
            link_target: None,
            digest: None,
        }
    }

    pub fn file(size: u64) -> Self {
        Self {
            kind: NodeKind::File,
            size,
            mode: 0o644,
            link_target: None,
            digest: None,
        }
    }

    pub fn symlink(target: impl Into<String>) -> Self {
        let target = target.into();
        Self {
            kind: NodeKind::Symlink,
            size: target.len() as u64,
            mode: 0o777,
            link_target: Some(target),
            digest: None,
        }
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    /// Whether `other` describes different content for the same path.
    /// Directories only differ by kind or mode; their size is carried by children.
    pub fn differs(&self, other: &FileInfo) -> bool {
        if self.kind != other.kind || self.mode != other.mode {
            return true;
        }
        match self.kind {
            NodeKind::Directory => false,
            NodeKind::Symlink => self.link_target != other.link_target,
            NodeKind::File => self.size != other.size || self.digest != other.digest,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    pub name: String,
    pub path: String,
    pub info: FileInfo,
    /// Set on RefTree nodes that delete `path` from the layers below.
    pub whiteout: bool,
    /// Set on RefTree directories whose lower-layer contents are hidden.
    pub opaque: bool,
    /// Directory created only as the parent of another entry; the layer
    /// recorded no info of its own for it.
    #[serde(default)]
    pub implicit: bool,
    pub diff: DiffType,
    /// For directories: status folded over every descendant.
    pub aggregate: DiffType,
    pub(crate) children: BTreeMap<String, FileNode>,
}

impl FileNode {
    pub fn new(name: impl Into<String>, path: impl Into<String>, info: FileInfo) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            info,
            whiteout: false,
            opaque: false,
            implicit: false,
            diff: DiffType::Unmodified,
            aggregate: DiffType::Unmodified,
            children: BTreeMap::new(),
        }
    }

    pub(crate) fn root() -> Self {
        Self::new("", "/", FileInfo::directory())
    }

    pub fn is_dir(&self) -> bool {
        self.info.is_dir()
    }

    pub fn child(&self, name: &str) -> Option<&FileNode> {
        self.children.get(name)
    }

    /// Children in name order.
    pub fn children(&self) -> impl Iterator<Item = &FileNode> {
        self.children.values()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Status to show for this node: the aggregate for populated directories,
    /// the node's own status otherwise.
    pub fn status(&self) -> DiffType {
        if self.is_dir() && self.has_children() {
            self.aggregate
        } else {
            self.diff
        }
    }

    /// Replaces the recorded info. A node that stops being a directory loses its children.
    pub(crate) fn replace_info(&mut self, info: FileInfo) {
        if !info.is_dir() {
            self.children.clear();
        }
        self.info = info;
    }

    /// Marks this node and its whole subtree.
    pub(crate) fn assign_diff(&mut self, diff: DiffType) {
        self.diff = diff;
        self.aggregate = diff;
        for child in self.children.values_mut() {
            child.assign_diff(diff);
        }
    }

    /// Recomputes aggregates bottom-up and returns this node's aggregate.
    pub(crate) fn refresh_aggregate(&mut self) -> DiffType {
        if self.children.is_empty() {
            self.aggregate = self.diff;
            return self.aggregate;
        }

        let mut aggregate = DiffType::Unmodified;
        for child in self.children.values_mut() {
            let below = child.refresh_aggregate();
            aggregate = aggregate.merge(child.diff).merge(below);
        }
        self.aggregate = aggregate;
        aggregate
    }

    /// Sum of file sizes in this subtree, skipping whiteouts and Removed tombstones.
    pub fn size_on_disk(&self) -> u64 {
        if self.whiteout || self.diff == DiffType::Removed {
            return 0;
        }
        let own = if self.is_dir() { 0 } else { self.info.size };
        own + self.children.values().map(FileNode::size_on_disk).sum::<u64>()
    }

    /// Pre-order walk over this node and its descendants.
    pub fn walk<F: FnMut(&FileNode)>(&self, visitor: &mut F) {
        visitor(self);
        for child in self.children.values() {
            child.walk(visitor);
        }
    }
}
