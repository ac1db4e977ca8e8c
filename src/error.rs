//! Error types for precache
//!
//! All modules use `PrecacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for precache operations
pub type PrecacheResult<T> = Result<T, PrecacheError>;

/// All errors that can occur in precache
#[derive(Error, Debug)]
pub enum PrecacheError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file already exists: {0}")]
    ConfigExists(PathBuf),

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not determine home directory for path {0}")]
    HomeDirUnknown(String),

    // Cache errors
    #[error("Failed to store cache entry {key}: {reason}")]
    CacheStore { key: String, reason: String },

    #[error("Failed to restore cache entry {key}: {reason}")]
    CacheLoad { key: String, reason: String },

    #[error("Corrupt cache entry metadata at {path}: {reason}")]
    CacheEntryCorrupt { path: PathBuf, reason: String },

    // Task errors
    #[error("Precompiling assets failed ({task}):\n{output}")]
    PrecompileFailed { task: String, output: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk directory {path}: {reason}")]
    Walk { path: PathBuf, reason: String },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("{0}")]
    User(String),
}

impl PrecacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Whether this error must stop the build.
    ///
    /// Everything except a failed precompile is absorbed by the orchestrator.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PrecompileFailed { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::PrecompileFailed { .. } => Some(
                "Fix the errors above, or precompile locally and commit the manifest to skip this step",
            ),
            Self::ConfigInvalid { .. } => Some("Run: precache config show"),
            Self::ConfigExists(_) => Some("Pass --force to overwrite"),
            Self::HomeDirUnknown(_) => Some("Set HOME for the build user"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precompile_failure_keeps_output_verbatim() {
        let err = PrecacheError::PrecompileFailed {
            task: "assets:precompile".to_string(),
            output: "line one\nSyntaxError: unexpected token".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("assets:precompile"));
        assert!(msg.ends_with("line one\nSyntaxError: unexpected token"));
    }

    #[test]
    fn error_hint() {
        let err = PrecacheError::ConfigExists(PathBuf::from("precache.toml"));
        assert_eq!(err.hint(), Some("Pass --force to overwrite"));
        assert!(PrecacheError::User("x".into()).hint().is_none());
    }

    #[test]
    fn only_task_failure_is_fatal() {
        let fatal = PrecacheError::PrecompileFailed {
            task: "assets:precompile".into(),
            output: String::new(),
        };
        assert!(fatal.is_fatal());

        let absorbed = PrecacheError::io(
            "copying tree",
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        assert!(!absorbed.is_fatal());
    }
}
