//! Config command - show or initialize configuration

use super::Project;
use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::Config;
use crate::error::{PrecacheError, PrecacheResult};
use crate::ui;

/// Execute the config command
pub async fn execute(args: ConfigArgs, project: &Project) -> PrecacheResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(&project.config)?,
        Some(ConfigAction::Path) => println!("{}", project.manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(project, force).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> PrecacheResult<()> {
    let toml = toml::to_string_pretty(config)?;
    println!("{}", toml);
    Ok(())
}

async fn init_config(project: &Project, force: bool) -> PrecacheResult<()> {
    let path = project.manager.path();

    if path.exists() && !force {
        return Err(PrecacheError::ConfigExists(path.to_path_buf()));
    }

    project.manager.save(&Config::default()).await?;
    ui::step_ok(
        &project.ui,
        &format!("Configuration initialized at {}", path.display()),
    );

    Ok(())
}
