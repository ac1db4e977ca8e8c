//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// precache - build-time asset cache manager
///
/// Restores compiled assets and their intermediate caches before the
/// precompile task runs, keeps the cache under its size budget, and stores
/// the results for the next build.
#[derive(Parser, Debug)]
#[command(name = "precache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path (default: <project>/precache.toml)
    #[arg(short, long, global = true, env = "PRECACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Project directory (defaults to current directory)
    #[arg(short = 'C', long, global = true)]
    pub project: Option<PathBuf>,

    /// Log output format (overrides general.log_format)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Plain line output even on a terminal
    #[arg(long, global = true)]
    pub plain: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Restore caches, precompile assets, and store the results
    Compile(CompileArgs),

    /// Remove scratch directories when asset compilation is disabled
    Cleanup(CleanupArgs),

    /// Delete the oldest files under a directory until it fits a byte budget
    CleanStale(CleanStaleArgs),

    /// Inspect and manage the asset cache
    Cache(CacheArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the compile command
#[derive(Parser, Debug)]
pub struct CompileArgs {
    /// Additional build environment variables (KEY=VALUE)
    #[arg(short, long, value_parser = parse_env_var)]
    pub env: Vec<(String, String)>,

    /// Cache backend directory (overrides cache.dir)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
}

/// Arguments for the cleanup command
#[derive(Parser, Debug)]
pub struct CleanupArgs {
    /// Treat asset compilation as disabled for this app
    #[arg(long)]
    pub assets_compile_disabled: bool,
}

/// Arguments for the clean-stale command
#[derive(Parser, Debug)]
pub struct CleanStaleArgs {
    /// Directory to prune
    pub dir: PathBuf,

    /// Byte budget (default: build.cache_limit_bytes)
    #[arg(short, long)]
    pub limit: Option<u64>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default precache.toml
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for list commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Parse the `general.log_format` config value; unknown values mean text
    pub fn from_config(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,

    /// Cache backend directory (overrides cache.dir)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List stored entries
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Restore one path from the cache
    Load {
        /// Path key (relative to the project, absolute, or ~/...)
        path: String,

        /// Keep the path if it already has content
        #[arg(long)]
        no_overwrite: bool,
    },

    /// Snapshot one path into the cache
    Store {
        /// Path key (relative to the project, absolute, or ~/...)
        path: String,
    },

    /// Remove every entry
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Parse environment variable in KEY=VALUE format
fn parse_env_var(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE format: no '=' found in '{s}'"))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_var_valid() {
        let (k, v) = parse_env_var("RAILS_ENV=production").unwrap();
        assert_eq!(k, "RAILS_ENV");
        assert_eq!(v, "production");
    }

    #[test]
    fn parse_env_var_with_equals() {
        let (k, v) = parse_env_var("NODE_OPTIONS=--max-old-space-size=4096").unwrap();
        assert_eq!(k, "NODE_OPTIONS");
        assert_eq!(v, "--max-old-space-size=4096");
    }

    #[test]
    fn parse_env_var_invalid() {
        assert!(parse_env_var("RAILS_ENV").is_err());
    }

    #[test]
    fn cli_parses_compile() {
        let cli = Cli::parse_from([
            "precache",
            "compile",
            "--env",
            "RAILS_ENV=production",
            "--cache-dir",
            "/cache",
        ]);
        match cli.command {
            Commands::Compile(args) => {
                assert_eq!(
                    args.env,
                    vec![("RAILS_ENV".to_string(), "production".to_string())]
                );
                assert_eq!(args.cache_dir, Some(PathBuf::from("/cache")));
            }
            _ => panic!("expected Compile command"),
        }
    }

    #[test]
    fn cli_parses_cleanup() {
        let cli = Cli::parse_from(["precache", "cleanup", "--assets-compile-disabled"]);
        match cli.command {
            Commands::Cleanup(args) => assert!(args.assets_compile_disabled),
            _ => panic!("expected Cleanup command"),
        }
    }

    #[test]
    fn cli_parses_clean_stale() {
        let cli = Cli::parse_from(["precache", "clean-stale", "tmp/cache", "--limit", "100"]);
        match cli.command {
            Commands::CleanStale(args) => {
                assert_eq!(args.dir, PathBuf::from("tmp/cache"));
                assert_eq!(args.limit, Some(100));
            }
            _ => panic!("expected CleanStale command"),
        }
    }

    #[test]
    fn cli_parses_cache_load() {
        let cli = Cli::parse_from(["precache", "cache", "load", "public/assets", "--no-overwrite"]);
        match cli.command {
            Commands::Cache(CacheArgs {
                action: CacheAction::Load { path, no_overwrite },
                ..
            }) => {
                assert_eq!(path, "public/assets");
                assert!(no_overwrite);
            }
            _ => panic!("expected cache load"),
        }
    }

    #[test]
    fn cli_parses_project_and_log_format() {
        let cli = Cli::parse_from([
            "precache",
            "-C",
            "/app",
            "--log-format",
            "json",
            "config",
            "path",
        ]);
        assert_eq!(cli.project, Some(PathBuf::from("/app")));
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigArgs {
                action: Some(ConfigAction::Path)
            })
        ));
    }

    #[test]
    fn log_format_from_config() {
        assert_eq!(LogFormat::from_config("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_config("text"), LogFormat::Text);
        assert_eq!(LogFormat::from_config("pretty"), LogFormat::Text);
    }

    #[test]
    fn cli_verbose_levels() {
        let cli = Cli::parse_from(["precache", "cleanup"]);
        assert_eq!(cli.verbose, 0);

        let cli = Cli::parse_from(["precache", "-v", "cleanup"]);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::parse_from(["precache", "-vv", "cleanup"]);
        assert_eq!(cli.verbose, 2);
    }
}
