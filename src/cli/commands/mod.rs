//! CLI command implementations

pub mod cache;
pub mod clean_stale;
pub mod cleanup;
pub mod compile;
pub mod config;

pub use cache::execute as cache;
pub use clean_stale::execute as clean_stale;
pub use cleanup::execute as cleanup;
pub use compile::execute as compile;
pub use config::execute as config;

use crate::cache::DirectoryCache;
use crate::config::{Config, ConfigManager};
use crate::ui::UiContext;
use crate::workspace::Workspace;
use std::path::{Path, PathBuf};

/// Everything a command needs to know about the project being built
pub struct Project {
    /// Build directory
    pub dir: PathBuf,
    pub config: Config,
    pub manager: ConfigManager,
    pub ui: UiContext,
}

impl Project {
    pub fn new(dir: PathBuf, config: Config, manager: ConfigManager, ui: UiContext) -> Self {
        Self {
            dir,
            config,
            manager,
            ui,
        }
    }

    pub fn workspace(&self) -> Workspace {
        Workspace::new(&self.dir)
    }

    /// Resolve `path` against the project directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.dir.join(path)
        }
    }

    /// Cache backend directory: `override_dir`, then `cache.dir`, then the
    /// per-project default
    pub fn cache_dir(&self, override_dir: Option<&Path>) -> PathBuf {
        match override_dir.or(self.config.cache.dir.as_deref()) {
            Some(dir) => self.resolve(dir),
            None => ConfigManager::default_cache_dir(&self.dir),
        }
    }

    pub fn cache(&self, override_dir: Option<&Path>) -> DirectoryCache {
        DirectoryCache::new(self.cache_dir(override_dir), self.workspace())
    }
}
