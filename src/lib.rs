//! precache - build-time asset cache manager
//!
//! Makes repeated asset precompilation fast by restoring compiled output
//! and compiler caches from a persistent store before the precompile task
//! runs, bounding the intermediate cache by size, and storing the results
//! for the next build.

pub mod build;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod task;
pub mod ui;
pub mod variant;
pub mod workspace;

pub use error::{PrecacheError, PrecacheResult};
