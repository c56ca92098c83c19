use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};
use tar_rs as tar;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Normalizes a path from a tar archive so it stays inside the archive root.
/// `..` pops a segment instead of escaping; absolute prefixes are dropped.
pub fn normalize_tar_path(p: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for comp in p.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(c) => out.push(c),
            Component::RootDir | Component::Prefix(_) => {}
        }
    }

    out
}

/// Opens a plain or gzip-compressed tar archive, sniffing the magic bytes.
pub fn open_archive(tar_path: &Path) -> Result<tar::Archive<Box<dyn Read>>> {
    let file = File::open(tar_path)
        .with_context(|| format!("Failed to open tar file: {}", tar_path.display()))?;

    let mut magic = [0u8; 2];
    let is_gzip = match BufReader::new(file).read_exact(&mut magic) {
        Ok(()) => magic == GZIP_MAGIC,
        // shorter than two bytes: let tar report it
        Err(_) => false,
    };

    let file = File::open(tar_path)?;
    let reader: Box<dyn Read> = if is_gzip {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(tar::Archive::new(reader))
}

/// Unpacks an image archive (`docker save` or OCI layout) into `dest`.
pub fn unpack(tar_path: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create directory: {}", dest.display()))?;

    let mut archive = open_archive(tar_path)?;
    archive
        .unpack(dest)
        .with_context(|| format!("Failed to unpack tar file: {}", tar_path.display()))?;

    log::debug!("Unpacked {} into {}", tar_path.display(), dest.display());
    Ok(())
}
