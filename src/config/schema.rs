//! Configuration schema for precache
//!
//! Configuration is read from `precache.toml` in the project directory.
//! Every section is optional; omitted keys fall back to the variant preset.

use crate::task::ShellTask;
use crate::variant::{FrameworkVariant, VariantName, CLEAN_TASK, PRECOMPILE_TASK};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Asset pipeline layout
    pub build: BuildConfig,

    /// Cache backend settings
    pub cache: CacheConfig,

    /// Build task commands
    pub tasks: TasksConfig,
}

impl Config {
    /// The framework variant with every `[build]` override applied
    pub fn variant(&self) -> FrameworkVariant {
        let build = &self.build;
        let mut variant = FrameworkVariant::preset(build.variant);

        if let Some(ref dir) = build.public_assets {
            variant.public_assets = dir.clone();
        }
        if let Some(ref dir) = build.default_assets_cache {
            variant.default_assets_cache = dir.clone();
        }
        if let Some(limit) = build.cache_limit_bytes {
            variant.cache_limit_bytes = limit;
        }
        if let Some(ref paths) = build.cached_paths {
            variant.path_set.cached_paths = paths.clone();
        }
        if let Some(ref paths) = build.scratch_paths {
            variant.path_set.scratch_paths = paths.clone();
        }
        if let Some(ref patterns) = build.manifest_patterns {
            variant.manifest_patterns = patterns.clone();
        }
        variant
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Append step events as JSON lines to this file
    pub trace_log: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            trace_log: None,
        }
    }
}

/// Asset pipeline layout
///
/// Unset fields keep the value from the selected variant preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Variant preset: "rails4" or "sprockets"
    pub variant: VariantName,

    /// Whether asset compilation is enabled for this app.
    /// When false, teardown removes the intermediate cache and scratch paths.
    pub assets_compile: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_assets: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_assets_cache: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_limit_bytes: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_paths: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scratch_paths: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_patterns: Option<Vec<String>>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            variant: VariantName::default(),
            assets_compile: true,
            public_assets: None,
            default_assets_cache: None,
            cache_limit_bytes: None,
            cached_paths: None,
            scratch_paths: None,
            manifest_patterns: None,
        }
    }
}

/// Cache backend configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Backend directory (default: per-project directory in the user cache dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Build task configuration
///
/// Commands given here are laid over the built-in rake commands. An empty
/// command leaves a task undefined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Extra environment for every task
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Task name to a command listing the project's tasks. An empty
    /// command turns the check off.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub detect: HashMap<String, String>,

    /// Task name to shell command
    #[serde(default, flatten)]
    pub commands: HashMap<String, String>,
}

/// Lists rake tasks, failing outright when there is no Rakefile
pub const DEFAULT_RAKE_DETECT: &str = "test -f Rakefile && bundle exec rake -P";

fn default_commands() -> HashMap<String, String> {
    [PRECOMPILE_TASK, CLEAN_TASK]
        .into_iter()
        .map(|task| (task.to_string(), format!("bundle exec rake {}", task)))
        .collect()
}

impl TasksConfig {
    /// Tasks to run, with built-in commands for names left unset.
    ///
    /// A built-in rake command is only defined when the project's rake task
    /// listing names it.
    pub fn resolve(&self) -> HashMap<String, ShellTask> {
        let defaults = default_commands();
        let mut commands = defaults.clone();
        commands.extend(self.commands.clone());

        commands
            .into_iter()
            .map(|(name, command)| {
                let detect = match self.detect.get(&name) {
                    Some(detect) if detect.trim().is_empty() => None,
                    Some(detect) => Some(detect.clone()),
                    None if defaults.get(&name) == Some(&command) => {
                        Some(DEFAULT_RAKE_DETECT.to_string())
                    }
                    None => None,
                };
                let task = ShellTask { command, detect };
                (name, task)
            })
            .collect()
    }
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            env: HashMap::new(),
            detect: HashMap::new(),
            commands: default_commands(),
        }
    }
}
