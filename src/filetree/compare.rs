use super::node::{DiffType, FileNode};
use super::tree::FileTree;
use log::trace;

impl FileTree {
    /// Marks this tree with the changes `upper` makes to it.
    ///
    /// Every path in `upper` is visited parent-first. New paths are inserted as
    /// Added, whiteouts turn the existing subtree into Removed tombstones, and
    /// paths present on both sides become Modified (taking `upper`'s info) or
    /// Unmodified. Implicit parents leave an existing directory untouched.
    /// Calling this for several layers in index order lets the later
    /// layer's status win. Directory aggregates are refreshed at the end.
    pub fn compare_and_mark(&mut self, upper: &FileTree) {
        for child in upper.root().children() {
            self.mark_node(child);
        }
        self.refresh_aggregates();
    }

    fn mark_node(&mut self, upper: &FileNode) {
        if upper.whiteout {
            match self.node_mut(&upper.path) {
                Some(lower) => lower.assign_diff(DiffType::Removed),
                None => trace!("whiteout for missing path {}", upper.path),
            }
            return;
        }

        let lower = self.node(&upper.path).map(|lower| (lower.diff, lower.is_dir()));
        match lower {
            // implicit parent: the lower directory keeps its info and diff
            Some((diff, true)) if diff != DiffType::Removed && upper.implicit => {}
            Some((diff, _)) if diff != DiffType::Removed => {
                if let Some(lower) = self.node_mut(&upper.path) {
                    if lower.info.differs(&upper.info) {
                        lower.replace_info(upper.info.clone());
                        lower.diff = DiffType::Modified;
                    } else {
                        lower.diff = DiffType::Unmodified;
                    }
                }
            }
            _ => {
                // absent, or a tombstone left by an earlier layer of the range
                self.insert(&upper.path, upper.info.clone(), DiffType::Added).diff =
                    DiffType::Added;
            }
        }

        if upper.opaque {
            if let Some(lower) = self.node_mut(&upper.path) {
                for (name, child) in lower.children.iter_mut() {
                    if upper.child(name).is_none() {
                        child.assign_diff(DiffType::Removed);
                    }
                }
            }
        }

        for child in upper.children() {
            self.mark_node(child);
        }
    }
}
