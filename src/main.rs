//! precache - build-time asset cache manager
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use precache::cli::args::LogFormat;
use precache::cli::commands::{self, Project};
use precache::cli::{Cli, Commands};
use precache::config::ConfigManager;
use precache::error::{PrecacheError, PrecacheResult};
use precache::ui::UiContext;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> PrecacheResult<()> {
    let cli = Cli::parse();

    let project_dir = match cli.project {
        Some(ref dir) => dir.clone(),
        None => std::env::current_dir()
            .map_err(|e| PrecacheError::io("getting current directory", e))?,
    };
    let project_dir = project_dir.canonicalize().unwrap_or(project_dir);

    let manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::for_project(&project_dir),
    };
    let config = manager.load().await?;

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("precache=warn"),
        1 => EnvFilter::new("precache=info"),
        _ => EnvFilter::new("precache=debug"),
    };
    let log_format = cli
        .log_format
        .unwrap_or_else(|| LogFormat::from_config(&config.general.log_format));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();
    match log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }

    debug!("Project directory: {}", project_dir.display());
    debug!("Config file: {}", manager.path().display());

    let ctx = UiContext::from_flags(cli.plain);

    let project = Project::new(project_dir, config, manager, ctx);

    match cli.command {
        Commands::Compile(args) => commands::compile(args, &project).await,
        Commands::Cleanup(args) => commands::cleanup(args, &project).await,
        Commands::CleanStale(args) => commands::clean_stale(args, &project).await,
        Commands::Cache(args) => commands::cache(args, &project).await,
        Commands::Config(args) => commands::config(args, &project).await,
    }
}
