//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use layerdiff::{FileInfo, FileTree};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tar_rs as tar;

/// A RefTree holding regular files of the given sizes.
pub fn tree(files: &[(&str, u64)]) -> FileTree {
    let mut tree = FileTree::new();
    for (path, size) in files {
        tree.add_path(path, FileInfo::file(*size));
    }
    tree
}

pub fn whiteout(tree: &mut FileTree, path: &str) {
    tree.add_path(path, FileInfo::file(0)).whiteout = true;
}

/// Layer 0 adds `/a` (10); layer 1 modifies `/a` (20) and adds `/b` (5);
/// layer 2 removes `/b`.
pub fn three_layers() -> Vec<FileTree> {
    let base = tree(&[("/a", 10)]);
    let middle = tree(&[("/a", 20), ("/b", 5)]);
    let mut top = FileTree::new();
    whiteout(&mut top, "/b");
    vec![base, middle, top]
}

/// A busier image: nested directories, an opaque directory and a re-add.
pub fn five_layers() -> Vec<FileTree> {
    let base = tree(&[
        ("/bin/sh", 100),
        ("/etc/passwd", 10),
        ("/etc/hosts", 5),
        ("/var/cache/apk/index", 300),
    ]);
    let mut second = tree(&[("/etc/passwd", 12), ("/opt/app/main", 50)]);
    whiteout(&mut second, "/var/cache");
    let mut third = tree(&[("/opt/app/main", 55), ("/opt/app/lib.so", 20)]);
    third.add_path("/opt/app", FileInfo::directory()).opaque = true;
    let fourth = tree(&[("/var/cache/apk/index", 310)]);
    let mut fifth = tree(&[("/tmp/build.log", 7)]);
    whiteout(&mut fifth, "/etc/hosts");
    vec![base, second, third, fourth, fifth]
}

pub enum Entry<'a> {
    Dir(&'a str),
    File(&'a str, &'a [u8]),
}

/// An uncompressed layer tar.
pub fn layer_tar(entries: &[Entry<'_>]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for entry in entries {
        let mut header = tar::Header::new_gnu();
        match entry {
            Entry::Dir(path) => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                header.set_mode(0o755);
                builder.append_data(&mut header, path, io::empty()).unwrap();
            }
            Entry::File(path, data) => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_size(data.len() as u64);
                header.set_mode(0o644);
                builder.append_data(&mut header, path, *data).unwrap();
            }
        }
    }
    builder.into_inner().unwrap()
}

pub const CONFIG_HEX: &str = "c0ffee00c0ffee00c0ffee00c0ffee00c0ffee00c0ffee00c0ffee00c0ffee00";
pub const IMAGE_ID: &str =
    "sha256:c0ffee00c0ffee00c0ffee00c0ffee00c0ffee00c0ffee00c0ffee00c0ffee00";

/// Writes a `docker save` style archive with three filesystem layers and one
/// empty history entry, and returns its path.
///
/// - layer 0: `etc/hosts` (9 bytes), `var/cache/data` (40 bytes)
/// - layer 1: `etc/hosts` rewritten (12 bytes), `app/run.sh` (6 bytes)
/// - layer 2: whiteout of `var/cache`
pub fn write_docker_archive(dir: &Path) -> PathBuf {
    let layers = [
        (
            "aaa111",
            layer_tar(&[
                Entry::Dir("etc/"),
                Entry::File("etc/hosts", b"127.0.0.1"),
                Entry::Dir("var/"),
                Entry::Dir("var/cache/"),
                Entry::File("var/cache/data", &[7u8; 40]),
            ]),
        ),
        (
            "bbb222",
            layer_tar(&[
                Entry::File("etc/hosts", b"127.0.0.1 ok"),
                Entry::File("app/run.sh", b"#!/bin"),
            ]),
        ),
        ("ccc333", layer_tar(&[Entry::File("var/.wh.cache", b"")])),
    ];

    let config = serde_json::json!({
        "created": "2024-05-01T10:00:03Z",
        "architecture": "amd64",
        "os": "linux",
        "rootfs": {"type": "layers", "diff_ids": [
            "sha256:aaa111", "sha256:bbb222", "sha256:ccc333"
        ]},
        "history": [
            {"created": "2024-05-01T10:00:00Z", "created_by": "/bin/sh -c #(nop) ADD file:rootfs in / "},
            {"created": "2024-05-01T10:00:01Z", "created_by": "/bin/sh -c #(nop)  ENV APP=1", "empty_layer": true},
            {"created": "2024-05-01T10:00:02Z", "created_by": "/bin/sh -c echo ok >> /etc/hosts"},
            {"created": "2024-05-01T10:00:03Z", "created_by": "/bin/sh -c rm -rf /var/cache"}
        ]
    });
    let config_name = format!("{}.json", CONFIG_HEX);

    let manifest = serde_json::json!([{
        "Config": config_name,
        "RepoTags": ["demo:latest"],
        "Layers": layers.iter().map(|(hex, _)| format!("{}/layer.tar", hex)).collect::<Vec<_>>()
    }]);

    let mut builder = tar::Builder::new(Vec::new());
    let mut append = |path: &str, data: &[u8]| {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, path, data).unwrap();
    };

    append("manifest.json", manifest.to_string().as_bytes());
    append(&config_name, config.to_string().as_bytes());
    for (hex, bytes) in &layers {
        append(&format!("{}/layer.tar", hex), bytes);
    }

    let path = dir.join("image.tar");
    fs::write(&path, builder.into_inner().unwrap()).unwrap();
    path
}
