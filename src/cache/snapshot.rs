//! Filesystem subtree snapshots
//!
//! Copies a file or directory tree, preserving per-file modification times so
//! that restored assets look unchanged to the asset compiler and to stale-file
//! eviction.

use crate::error::{PrecacheError, PrecacheResult};
use filetime::FileTime;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Totals for a copied tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub files: u64,
    pub bytes: u64,
}

/// Copy `src` (file, directory or symlink) to `dst`.
///
/// `dst` must not exist yet; parents are created as needed.
pub fn copy_tree(src: &Path, dst: &Path) -> PrecacheResult<TreeStats> {
    let mut stats = TreeStats::default();

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| PrecacheError::io(format!("creating {}", parent.display()), e))?;
    }

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| PrecacheError::Walk {
            path: src.to_path_buf(),
            reason: e.to_string(),
        })?;

        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| PrecacheError::Walk {
                path: entry.path().to_path_buf(),
                reason: e.to_string(),
            })?;
        let target = if rel.as_os_str().is_empty() {
            dst.to_path_buf()
        } else {
            dst.join(rel)
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| PrecacheError::io(format!("creating {}", target.display()), e))?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else if file_type.is_file() {
            stats.bytes += copy_file(entry.path(), &target)?;
            stats.files += 1;
        } else {
            debug!("Skipping special file {}", entry.path().display());
        }
    }

    Ok(stats)
}

fn copy_file(src: &Path, dst: &Path) -> PrecacheResult<u64> {
    let bytes = fs::copy(src, dst).map_err(|e| {
        PrecacheError::io(format!("copying {} to {}", src.display(), dst.display()), e)
    })?;

    let meta = fs::metadata(src)
        .map_err(|e| PrecacheError::io(format!("reading metadata of {}", src.display()), e))?;
    filetime::set_file_mtime(dst, FileTime::from_last_modification_time(&meta))
        .map_err(|e| PrecacheError::io(format!("setting mtime of {}", dst.display()), e))?;

    Ok(bytes)
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> PrecacheResult<()> {
    let link = fs::read_link(src)
        .map_err(|e| PrecacheError::io(format!("reading link {}", src.display()), e))?;
    std::os::unix::fs::symlink(&link, dst)
        .map_err(|e| PrecacheError::io(format!("creating link {}", dst.display()), e))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, _dst: &Path) -> PrecacheResult<()> {
    debug!("Skipping symlink {} on this platform", src.display());
    Ok(())
}

/// Whether `path` exists and holds something: any file, or a directory with
/// at least one entry.
pub fn is_populated(path: &Path) -> bool {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::read_dir(path)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false),
        Ok(_) => true,
        Err(_) => false,
    }
}

/// Remove a file, symlink or directory tree. Returns `false` if nothing was there.
pub fn remove_path(path: &Path) -> io::Result<bool> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    if meta.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(true)
}
