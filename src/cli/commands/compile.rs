//! Compile command - run the precompile pipeline followed by teardown

use super::Project;
use crate::build::{
    BuildOutcome, CleanupOutcome, JsonlTracer, LogTracer, Precompiler, SkipReason, StepTracer,
};
use crate::cli::args::CompileArgs;
use crate::error::PrecacheResult;
use crate::task::{BuildEnv, ShellTaskRunner};
use crate::ui;
use tracing::{debug, warn};

/// Execute the compile command
pub async fn execute(args: CompileArgs, project: &Project) -> PrecacheResult<()> {
    let config = &project.config;
    let variant = config.variant();
    let workspace = project.workspace();
    let cache = project.cache(args.cache_dir.as_deref());
    let tasks = ShellTaskRunner::new(config.tasks.resolve(), &project.dir);

    let mut env: BuildEnv = config.tasks.env.clone();
    env.extend(args.env);

    ui::key_value(&project.ui, "variant", &variant.name.to_string());
    ui::key_value(&project.ui, "cache", &cache.root().display().to_string());

    let jsonl = config
        .general
        .trace_log
        .as_deref()
        .map(|path| JsonlTracer::new(project.resolve(path)));
    let tracer: &dyn StepTracer = match jsonl {
        Some(ref tracer) => tracer,
        None => &LogTracer,
    };

    let precompiler = Precompiler::new(&variant, &workspace, &cache, &tasks)
        .with_env(env)
        .with_tracer(tracer)
        .with_ui(project.ui.clone())
        .with_assets_compile(config.build.assets_compile);

    let result = precompiler.compile().await;

    // Teardown runs whatever the compile outcome
    match precompiler.cleanup() {
        Ok(CleanupOutcome::Removed(paths)) => {
            debug!("Teardown removed {} path(s)", paths.len());
        }
        Ok(CleanupOutcome::Kept) => {}
        Err(e) => warn!("Teardown failed: {}", e),
    }

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            if e.is_fatal() {
                ui::outro_error(&project.ui, "Asset precompilation failed");
            }
            return Err(e);
        }
    };

    match outcome {
        BuildOutcome::Skipped(SkipReason::ManifestPresent(path)) => {
            debug!("Manifest: {}", path.display());
            ui::outro_success(&project.ui, "Assets already compiled");
        }
        BuildOutcome::Skipped(reason @ SkipReason::TaskUndefined(_)) => {
            ui::outro_success(
                &project.ui,
                &format!("Asset precompilation skipped ({})", reason),
            );
        }
        BuildOutcome::Succeeded { .. } => {
            ui::outro_success(&project.ui, "Assets precompiled and cached");
        }
        BuildOutcome::Failed { .. } => {
            ui::outro_error(&project.ui, "Asset precompilation failed");
        }
    }

    Ok(())
}
