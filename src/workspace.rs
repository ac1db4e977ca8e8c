//! Working-tree path resolution
//!
//! Cache keys are the path strings as written in configuration. They are
//! resolved against the build directory, or against the home directory for
//! keys starting with `~/`.

use crate::error::{PrecacheError, PrecacheResult};
use std::path::{Path, PathBuf};

/// The build's working tree
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    home: Option<PathBuf>,
}

impl Workspace {
    /// Create a workspace rooted at the build directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            home: dirs::home_dir(),
        }
    }

    /// Override the home directory used for `~/` keys
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// The build directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a cache key to an absolute working-tree path
    pub fn resolve(&self, key: &str) -> PrecacheResult<PathBuf> {
        let home_relative = if key == "~" {
            Some("")
        } else {
            key.strip_prefix("~/")
        };

        if let Some(rest) = home_relative {
            let home = self
                .home
                .as_ref()
                .ok_or_else(|| PrecacheError::HomeDirUnknown(key.to_string()))?;
            return Ok(home.join(rest));
        }

        let path = Path::new(key);
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(self.root.join(path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_to_root() {
        let ws = Workspace::new("/build").with_home("/home/app");
        assert_eq!(
            ws.resolve("public/assets").unwrap(),
            PathBuf::from("/build/public/assets")
        );
    }

    #[test]
    fn resolves_home_keys() {
        let ws = Workspace::new("/build").with_home("/home/app");
        assert_eq!(
            ws.resolve("~/.cache/yarn").unwrap(),
            PathBuf::from("/home/app/.cache/yarn")
        );
        assert_eq!(ws.resolve("~").unwrap(), PathBuf::from("/home/app/"));
    }

    #[test]
    fn absolute_keys_pass_through() {
        let ws = Workspace::new("/build");
        assert_eq!(ws.resolve("/opt/cache").unwrap(), PathBuf::from("/opt/cache"));
    }

    #[test]
    fn tilde_without_slash_is_relative() {
        let ws = Workspace::new("/build").with_home("/home/app");
        assert_eq!(ws.resolve("~weird").unwrap(), PathBuf::from("/build/~weird"));
    }
}
