//! Framework variants
//!
//! A variant bundles everything that differs between asset pipeline
//! generations: which paths are synchronized through the cache, where the
//! compiled output and intermediate cache live, the eviction budget, and the
//! manifest patterns that mark already-compiled output. A variant is chosen
//! once at startup and passed by value into the orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default byte budget for the intermediate asset cache (50 MiB)
pub const DEFAULT_CACHE_LIMIT: u64 = 52_428_800;

/// Task that compiles assets into the public output directory
pub const PRECOMPILE_TASK: &str = "assets:precompile";

/// Task that prunes obsolete compiled assets
pub const CLEAN_TASK: &str = "assets:clean";

/// Known variant presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantName {
    /// Sprockets output plus webpacker/yarn caches
    #[default]
    Rails4,
    /// Sprockets output only, no extra cached paths
    Sprockets,
}

impl fmt::Display for VariantName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rails4 => "rails4",
            Self::Sprockets => "sprockets",
        };
        write!(f, "{}", name)
    }
}

/// Paths that participate in caching
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSet {
    /// Synced through the cache on every build
    pub cached_paths: Vec<String>,
    /// Cache-eligible scratch directories, deleted when compilation is disabled
    pub scratch_paths: Vec<String>,
}

impl PathSet {
    /// Cached paths followed by scratch paths, in declaration order
    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.cached_paths
            .iter()
            .chain(self.scratch_paths.iter())
            .map(String::as_str)
    }
}

/// Per-variant build configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkVariant {
    pub name: VariantName,
    pub path_set: PathSet,
    /// Directory the precompile task writes into
    pub public_assets: String,
    /// Intermediate cache directory used by the asset compiler
    pub default_assets_cache: String,
    /// Byte budget for `default_assets_cache` after a successful compile
    pub cache_limit_bytes: u64,
    /// Glob patterns (relative to `public_assets`) that mark compiled output
    pub manifest_patterns: Vec<String>,
    pub precompile_task: String,
    pub clean_task: String,
}

impl FrameworkVariant {
    /// Build the preset for a variant name
    pub fn preset(name: VariantName) -> Self {
        match name {
            VariantName::Rails4 => Self::rails4(),
            VariantName::Sprockets => Self::sprockets(),
        }
    }

    /// Sprockets output with webpacker and yarn caches
    pub fn rails4() -> Self {
        Self {
            name: VariantName::Rails4,
            path_set: PathSet {
                cached_paths: strings(&["public/packs", "~/.yarn-cache", "~/.cache/yarn"]),
                scratch_paths: strings(&["node_modules", "tmp/cache/webpacker"]),
            },
            ..Self::sprockets()
        }
    }

    /// Sprockets output only
    pub fn sprockets() -> Self {
        Self {
            name: VariantName::Sprockets,
            path_set: PathSet::default(),
            public_assets: "public/assets".to_string(),
            default_assets_cache: "tmp/cache/assets".to_string(),
            cache_limit_bytes: DEFAULT_CACHE_LIMIT,
            manifest_patterns: strings(&[".sprockets-manifest-*.json", "manifest-*.json"]),
            precompile_task: PRECOMPILE_TASK.to_string(),
            clean_task: CLEAN_TASK.to_string(),
        }
    }
}

impl Default for FrameworkVariant {
    fn default() -> Self {
        Self::rails4()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
