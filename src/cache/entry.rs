//! Cache entry identity and metadata
//!
//! Each entry lives in its own directory under the cache root, named by a
//! readable slug of the key plus a SHA256 prefix. The directory holds the
//! snapshot under `data` and an `entry.json` describing it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Metadata file inside an entry directory
pub const META_FILE: &str = "entry.json";

/// Snapshot location inside an entry directory
pub const DATA_DIR: &str = "data";

/// Marker used in the names of in-flight and replaced entry directories
pub const TRANSIENT_MARKER: &str = ".tmp-";

const SLUG_MAX: usize = 40;

/// Persisted description of a cache entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMeta {
    /// The path key as given by the caller
    pub key: String,
    /// When the snapshot was taken
    pub stored_at: DateTime<Utc>,
    /// Regular files in the snapshot
    pub files: u64,
    /// Total size of regular files
    pub bytes: u64,
}

/// Directory name for a key: `<slug>-<first 12 hex chars of sha256(key)>`
pub fn entry_id(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let hash = hex::encode(&digest[..6]);

    let mut slug = String::new();
    for c in key.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    let slug: String = slug.chars().take(SLUG_MAX).collect();
    let slug = slug.trim_end_matches('-');

    if slug.is_empty() {
        format!("entry-{}", hash)
    } else {
        format!("{}-{}", slug, hash)
    }
}

/// Format bytes as human-readable size (e.g., "1.5 MB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
