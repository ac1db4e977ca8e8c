//! Size-bounded eviction of stale files
//!
//! Keeps a directory under a byte budget by deleting the least recently
//! modified files first. Eviction is best-effort: a file that cannot be
//! deleted is logged and skipped, and the cleaner always returns.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A regular file found under the cleaned root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CensusEntry {
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

/// Summary of a cleaning pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub files_removed: u64,
    pub bytes_removed: u64,
    /// Total size of regular files left under the root
    pub remaining_bytes: u64,
}

/// Evicts least-recently-modified files under a directory
#[derive(Debug, Clone)]
pub struct StaleFileCleaner {
    root: PathBuf,
}

impl StaleFileCleaner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every regular file under the root, oldest first.
    ///
    /// Symlinks are neither followed nor counted, including a symlinked root.
    /// A missing root yields an empty census.
    pub fn census(&self) -> Vec<CensusEntry> {
        let mut files: Vec<CensusEntry> = WalkDir::new(&self.root)
            .follow_links(false)
            .follow_root_links(false)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let meta = entry.metadata().ok()?;
                Some(CensusEntry {
                    path: entry.into_path(),
                    size: meta.len(),
                    modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                })
            })
            .collect();

        files.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));
        files
    }

    /// Delete oldest files until the total size is at most `limit_bytes`
    pub fn clean_over(&self, limit_bytes: u64) -> CleanReport {
        let census = self.census();
        let mut total: u64 = census.iter().map(|f| f.size).sum();
        let mut report = CleanReport::default();

        if total <= limit_bytes {
            debug!(
                "{} holds {} bytes, within limit of {}",
                self.root.display(),
                total,
                limit_bytes
            );
            report.remaining_bytes = total;
            return report;
        }

        for file in census {
            if total <= limit_bytes {
                break;
            }
            match fs::remove_file(&file.path) {
                Ok(()) => {
                    debug!("Evicted {} ({} bytes)", file.path.display(), file.size);
                    total -= file.size;
                    report.files_removed += 1;
                    report.bytes_removed += file.size;
                }
                Err(e) => warn!("Failed to evict {}: {}", file.path.display(), e),
            }
        }

        report.remaining_bytes = total;
        info!(
            "Evicted {} files ({} bytes) from {}",
            report.files_removed,
            report.bytes_removed,
            self.root.display()
        );
        report
    }
}
