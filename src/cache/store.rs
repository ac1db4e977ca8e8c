//! Keyed snapshot store
//!
//! Maps a working-tree path key to a snapshot of its subtree. The
//! `CacheStore` trait is the seam the orchestrator depends on;
//! `DirectoryCache` persists snapshots in a plain directory that survives
//! between builds.

use crate::cache::entry::{entry_id, EntryMeta, DATA_DIR, META_FILE, TRANSIENT_MARKER};
use crate::cache::snapshot::{copy_tree, is_populated, remove_path, TreeStats};
use crate::error::{PrecacheError, PrecacheResult};
use crate::workspace::Workspace;
use chrono::Utc;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of a load call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No entry stored for the key
    Miss,
    /// Destination already populated, left untouched
    Kept,
    /// Entry restored into the working tree
    Restored(TreeStats),
}

/// Result of a store call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Nothing on disk at the key's path
    Absent,
    /// Snapshot written, replacing any prior entry
    Stored(TreeStats),
}

/// Persistent key-value store of filesystem snapshots
pub trait CacheStore: Send + Sync {
    /// Restore the entry for `key`, replacing whatever is at its path
    fn load(&self, key: &str) -> PrecacheResult<LoadOutcome>;

    /// Restore the entry for `key` only if its path is absent or empty
    fn load_without_overwrite(&self, key: &str) -> PrecacheResult<LoadOutcome>;

    /// Snapshot the path for `key`, replacing the prior entry
    fn store(&self, key: &str) -> PrecacheResult<StoreOutcome>;
}

/// Cache backend storing one directory per key under `root`
#[derive(Debug, Clone)]
pub struct DirectoryCache {
    root: PathBuf,
    workspace: Workspace,
}

impl DirectoryCache {
    /// Create a cache persisting under `root` for the given working tree
    pub fn new(root: impl Into<PathBuf>, workspace: Workspace) -> Self {
        Self {
            root: root.into(),
            workspace,
        }
    }

    /// Backend directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_dir(&self, key: &str) -> PathBuf {
        self.root.join(entry_id(key))
    }

    /// Read metadata for a stored key, if present
    pub fn entry(&self, key: &str) -> PrecacheResult<Option<EntryMeta>> {
        let dir = self.entry_dir(key);
        if !dir.join(DATA_DIR).exists() {
            return Ok(None);
        }
        read_meta(&dir.join(META_FILE)).map(Some)
    }

    /// List all stored entries, sorted by key
    pub fn entries(&self) -> PrecacheResult<Vec<EntryMeta>> {
        let read = match fs::read_dir(&self.root) {
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(PrecacheError::io(
                    format!("listing cache {}", self.root.display()),
                    e,
                ))
            }
        };

        let mut entries = Vec::new();
        for dir in read {
            let dir = dir.map_err(|e| PrecacheError::io("listing cache entries", e))?;
            let name = dir.file_name();
            if name.to_string_lossy().contains(TRANSIENT_MARKER) {
                continue;
            }

            let meta_path = dir.path().join(META_FILE);
            if !meta_path.exists() {
                continue;
            }
            match read_meta(&meta_path) {
                Ok(meta) => entries.push(meta),
                Err(e) => warn!("Skipping unreadable cache entry: {}", e),
            }
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    /// Remove every entry. Returns how many entry directories were deleted.
    pub fn clear(&self) -> PrecacheResult<usize> {
        let read = match fs::read_dir(&self.root) {
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(PrecacheError::io(
                    format!("listing cache {}", self.root.display()),
                    e,
                ))
            }
        };

        let mut removed = 0;
        for dir in read {
            let dir = dir.map_err(|e| PrecacheError::io("listing cache entries", e))?;
            let path = dir.path();
            debug!("Removing cache entry {}", path.display());
            remove_path(&path)
                .map_err(|e| PrecacheError::io(format!("removing {}", path.display()), e))?;
            removed += 1;
        }
        Ok(removed)
    }

    fn restore(&self, key: &str, dest: &Path) -> PrecacheResult<LoadOutcome> {
        let data = self.entry_dir(key).join(DATA_DIR);
        if fs::symlink_metadata(&data).is_err() {
            debug!("Cache miss for {}", key);
            return Ok(LoadOutcome::Miss);
        }

        remove_path(dest).map_err(|e| PrecacheError::CacheLoad {
            key: key.to_string(),
            reason: format!("clearing {}: {}", dest.display(), e),
        })?;

        let stats = copy_tree(&data, dest).map_err(|e| PrecacheError::CacheLoad {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        info!("Restored {} ({} files)", key, stats.files);
        Ok(LoadOutcome::Restored(stats))
    }

    /// Remove staging and replaced-entry directories left by an interrupted
    /// store. Builds sharing a cache root run one at a time.
    fn sweep_transient(&self) {
        let read = match fs::read_dir(&self.root) {
            Ok(read) => read,
            Err(e) => {
                debug!("Cannot scan {} for leftovers: {}", self.root.display(), e);
                return;
            }
        };

        for dir in read.flatten() {
            if !dir.file_name().to_string_lossy().contains(TRANSIENT_MARKER) {
                continue;
            }
            let path = dir.path();
            match remove_path(&path) {
                Ok(_) => debug!("Removed leftover {}", path.display()),
                Err(e) => warn!("Failed to remove leftover {}: {}", path.display(), e),
            }
        }
    }

    /// Move `staging` into place as the entry directory for `key`.
    ///
    /// The previous entry is renamed aside first and only deleted once the
    /// new one is in place, so readers never see a half-written entry.
    fn commit(&self, key: &str, staging: &Path) -> PrecacheResult<()> {
        let dest = self.entry_dir(key);
        let aside = self
            .root
            .join(format!("{}{}{}", entry_id(key), TRANSIENT_MARKER, Uuid::new_v4()));

        let had_prior = dest.exists();
        if had_prior {
            fs::rename(&dest, &aside).map_err(|e| PrecacheError::CacheStore {
                key: key.to_string(),
                reason: format!("moving prior entry aside: {}", e),
            })?;
        }

        if let Err(e) = fs::rename(staging, &dest) {
            if had_prior {
                if let Err(rollback) = fs::rename(&aside, &dest) {
                    warn!(
                        "Failed to restore prior entry for {} from {}: {}",
                        key,
                        aside.display(),
                        rollback
                    );
                }
            }
            return Err(PrecacheError::CacheStore {
                key: key.to_string(),
                reason: format!("committing entry: {}", e),
            });
        }

        if had_prior {
            if let Err(e) = remove_path(&aside) {
                warn!("Failed to remove replaced entry {}: {}", aside.display(), e);
            }
        }
        Ok(())
    }
}

impl CacheStore for DirectoryCache {
    fn load(&self, key: &str) -> PrecacheResult<LoadOutcome> {
        let dest = self.workspace.resolve(key)?;
        self.restore(key, &dest)
    }

    fn load_without_overwrite(&self, key: &str) -> PrecacheResult<LoadOutcome> {
        let dest = self.workspace.resolve(key)?;
        if is_populated(&dest) {
            debug!("{} already present, not restoring from cache", key);
            return Ok(LoadOutcome::Kept);
        }
        self.restore(key, &dest)
    }

    fn store(&self, key: &str) -> PrecacheResult<StoreOutcome> {
        let src = self.workspace.resolve(key)?;
        if fs::symlink_metadata(&src).is_err() {
            debug!("{} does not exist, nothing to store", key);
            return Ok(StoreOutcome::Absent);
        }

        fs::create_dir_all(&self.root).map_err(|e| {
            PrecacheError::io(format!("creating cache dir {}", self.root.display()), e)
        })?;
        self.sweep_transient();

        let staging = self
            .root
            .join(format!("{}{}{}", entry_id(key), TRANSIENT_MARKER, Uuid::new_v4()));

        let result = write_snapshot(key, &src, &staging).and_then(|stats| {
            self.commit(key, &staging)?;
            Ok(stats)
        });

        match result {
            Ok(stats) => {
                info!("Stored {} ({} files)", key, stats.files);
                Ok(StoreOutcome::Stored(stats))
            }
            Err(e) => {
                let _ = remove_path(&staging);
                Err(e)
            }
        }
    }
}

fn write_snapshot(key: &str, src: &Path, staging: &Path) -> PrecacheResult<TreeStats> {
    let stats = copy_tree(src, &staging.join(DATA_DIR)).map_err(|e| PrecacheError::CacheStore {
        key: key.to_string(),
        reason: e.to_string(),
    })?;

    let meta = EntryMeta {
        key: key.to_string(),
        stored_at: Utc::now(),
        files: stats.files,
        bytes: stats.bytes,
    };
    let json = serde_json::to_string_pretty(&meta)?;
    let meta_path = staging.join(META_FILE);
    fs::write(&meta_path, json)
        .map_err(|e| PrecacheError::io(format!("writing {}", meta_path.display()), e))?;

    Ok(stats)
}

fn read_meta(path: &Path) -> PrecacheResult<EntryMeta> {
    let content = fs::read_to_string(path)
        .map_err(|e| PrecacheError::io(format!("reading {}", path.display()), e))?;
    serde_json::from_str(&content).map_err(|e| PrecacheError::CacheEntryCorrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
