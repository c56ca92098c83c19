//! Plain-text output: the analysis summary and listings of derived trees.

use crate::analysis::AnalysisResult;
use crate::filetree::{DiffType, FileNode, FileTree, NodeKind};
use indicatif::HumanBytes;
use std::fmt::Write;

const INDENT: &str = "  ";

/// One line per node below the root, pre-order, children by name.
///
/// Each line carries the status marker, the size (the whole subtree for
/// directories, the size they had for Removed entries) and the indented
/// name. With `changes_only` nodes whose status is Unmodified are left out,
/// together with everything below them that is also unchanged.
pub fn render_tree(tree: &FileTree, changes_only: bool) -> String {
    let mut out = String::new();
    for child in tree.root().children() {
        render_node(&mut out, child, 0, changes_only);
    }
    out
}

fn render_node(out: &mut String, node: &FileNode, depth: usize, changes_only: bool) {
    let status = node.status();
    if changes_only && status == DiffType::Unmodified {
        return;
    }

    let name = match node.info.kind {
        NodeKind::Directory => format!("{}/", node.name),
        NodeKind::Symlink => format!(
            "{} -> {}",
            node.name,
            node.info.link_target.as_deref().unwrap_or("")
        ),
        NodeKind::File => node.name.clone(),
    };

    let _ = writeln!(
        out,
        "{} {:>10} {}{}",
        status.marker(),
        HumanBytes(display_size(node)).to_string(),
        INDENT.repeat(depth),
        name
    );

    for child in node.children() {
        render_node(out, child, depth + 1, changes_only);
    }
}

/// Removed tombstones show what the removal freed; everything else its size on disk.
fn display_size(node: &FileNode) -> u64 {
    if node.diff != DiffType::Removed {
        return node.size_on_disk();
    }
    let mut size = 0;
    node.walk(&mut |n: &FileNode| {
        if !n.whiteout && !n.is_dir() {
            size += n.info.size;
        }
    });
    size
}

/// Efficiency figures, the layer table and the wasted files.
pub fn render_summary(analysis: &AnalysisResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Image: {}", analysis.image.id);
    if !analysis.image.repo_tags.is_empty() {
        let _ = writeln!(out, "Tags: {}", analysis.image.repo_tags.join(", "));
    }
    let _ = writeln!(
        out,
        "Platform: {}/{}",
        analysis.image.os, analysis.image.architecture
    );
    let _ = writeln!(out, "  efficiency: {:.4} %", analysis.efficiency * 100.0);
    let _ = writeln!(
        out,
        "  wastedBytes: {} bytes ({})",
        analysis.wasted_bytes,
        HumanBytes(analysis.wasted_bytes)
    );
    let _ = writeln!(
        out,
        "  userWastedPercent: {:.4} %",
        analysis.wasted_user_percent * 100.0
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "Layers:");
    for layer in &analysis.layers {
        let _ = writeln!(
            out,
            "  {:>3} {:>10}  {}  {}",
            layer.index,
            HumanBytes(layer.size_bytes).to_string(),
            layer.id,
            layer.command
        );
    }

    if !analysis.inefficiencies.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Wasted space:");
        let _ = writeln!(out, "  {:>5} {:>10}  Path", "Count", "Total");
        for inefficiency in &analysis.inefficiencies {
            let _ = writeln!(
                out,
                "  {:>5} {:>10}  {}",
                inefficiency.layers.len(),
                HumanBytes(inefficiency.cumulative_size).to_string(),
                inefficiency.path
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filetree::FileInfo;

    fn derived() -> FileTree {
        let mut lower = FileTree::new();
        lower.add_path("/etc/passwd", FileInfo::file(10));
        lower.add_path("/etc/hosts", FileInfo::file(5));

        let mut upper = FileTree::new();
        upper.add_path("/etc/passwd", FileInfo::file(20));
        upper.add_path("/bin/sh", FileInfo::symlink("busybox"));

        lower.compare_and_mark(&upper);
        lower
    }

    #[test]
    fn test_render_tree_lines() {
        let rendered = render_tree(&derived(), false);
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with('+'));
        assert!(lines[0].ends_with("bin/"));
        assert!(lines[1].ends_with(" sh -> busybox"));
        assert!(lines[1].starts_with('+'));
        assert!(lines[2].starts_with('~'));
        assert!(lines[2].ends_with("etc/"));
        assert!(lines[2].contains(&HumanBytes(25).to_string()));
        assert!(lines[3].starts_with(' '));
        assert!(lines[3].ends_with("  hosts"));
        assert!(lines[4].starts_with('~'));
    }

    #[test]
    fn test_removed_entries_show_their_size() {
        let mut lower = FileTree::new();
        lower.add_path("/tmp/cache", FileInfo::file(40));
        lower.add_path("/srv/www/index.html", FileInfo::file(7));
        lower.add_path("/srv/www/app.js", FileInfo::file(3));

        let mut upper = FileTree::new();
        upper.add_path("/tmp/cache", FileInfo::file(0)).whiteout = true;
        upper.add_path("/srv/www", FileInfo::file(0)).whiteout = true;
        lower.compare_and_mark(&upper);

        let rendered = render_tree(&lower, true);
        let line = |name: &str| {
            rendered
                .lines()
                .find(|line| line.ends_with(name))
                .unwrap_or_else(|| panic!("no line for {name} in:\n{rendered}"))
                .to_string()
        };

        let cache = line(" cache");
        assert!(cache.starts_with('-'));
        assert!(cache.contains(&HumanBytes(40).to_string()));

        let www = line(" www/");
        assert!(www.starts_with('-'));
        assert!(www.contains(&HumanBytes(10).to_string()));
        assert!(line(" app.js").contains(&HumanBytes(3).to_string()));
    }

    #[test]
    fn test_render_changes_only() {
        let rendered = render_tree(&derived(), true);
        assert!(!rendered.contains("hosts"));
        assert!(rendered.contains("passwd"));
        assert_eq!(rendered.lines().count(), 4);
    }
}
