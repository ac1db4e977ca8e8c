//! Cleanup command - run the end-of-build teardown on its own

use super::Project;
use crate::build::{CleanupOutcome, LogTracer, Precompiler};
use crate::cli::args::CleanupArgs;
use crate::error::PrecacheResult;
use crate::task::ShellTaskRunner;
use crate::ui;

/// Execute the cleanup command
pub async fn execute(args: CleanupArgs, project: &Project) -> PrecacheResult<()> {
    let config = &project.config;
    let variant = config.variant();
    let workspace = project.workspace();
    let cache = project.cache(None);
    let tasks = ShellTaskRunner::new(config.tasks.resolve(), &project.dir);
    let assets_compile = config.build.assets_compile && !args.assets_compile_disabled;

    let outcome = Precompiler::new(&variant, &workspace, &cache, &tasks)
        .with_tracer(&LogTracer)
        .with_ui(project.ui.clone())
        .with_assets_compile(assets_compile)
        .cleanup()?;

    match outcome {
        CleanupOutcome::Kept => {
            ui::step_info(&project.ui, "Asset compilation enabled, keeping caches");
        }
        CleanupOutcome::Removed(paths) if paths.is_empty() => {
            ui::step_info(&project.ui, "Nothing to remove");
        }
        CleanupOutcome::Removed(paths) => {
            for path in &paths {
                let shown = path.strip_prefix(&project.dir).unwrap_or(path);
                ui::step_ok(&project.ui, &format!("Removed {}", shown.display()));
            }
        }
    }

    Ok(())
}
