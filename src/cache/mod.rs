//! Persistent asset cache
//!
//! Working-tree paths are snapshotted into a backend directory between
//! builds and restored before the next precompile.
//!
//! # Entry layout
//!
//! ```text
//! <cache_root>/
//! ├── public-assets-1a2b3c4d5e6f/
//! │   ├── entry.json        # key, stored_at, files, bytes
//! │   └── data/             # snapshot of the working-tree path
//! └── tmp-cache-assets-.../
//! ```
//!
//! A store writes into a `.tmp-` directory first and renames it into place,
//! so an entry is either the old snapshot or the new one.

pub mod entry;
pub mod snapshot;
pub mod stale;
pub mod store;

pub use entry::{entry_id, format_bytes, EntryMeta};
pub use snapshot::TreeStats;
pub use stale::{CleanReport, StaleFileCleaner};
pub use store::{CacheStore, DirectoryCache, LoadOutcome, StoreOutcome};
