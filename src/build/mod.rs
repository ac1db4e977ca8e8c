//! Asset precompilation pipeline
//!
//! `Precompiler` runs one build as a fixed sequence of steps:
//!
//! | Step | Action |
//! |------|--------|
//! | manifest_check | Skip everything if compiled output is already present |
//! | cache_load | Restore public output, intermediate cache and path set |
//! | invoke | Run the precompile task |
//! | clean | Run the clean task, evict stale intermediate cache files |
//! | cache_store | Snapshot everything loaded back into the cache |
//!
//! Only a failed precompile task stops the build. Cache maintenance is
//! best-effort: its failures are logged and the build carries on. A failed
//! build never stores anything, so a broken compile cannot poison the cache.
//!
//! `cleanup()` is the end-of-build teardown hook and runs regardless of how
//! `compile()` went.

pub mod manifest;
pub mod trace;

pub use manifest::find_manifests;
pub use trace::{JsonlTracer, LogTracer, Step, StepTracer};

use crate::cache::snapshot::remove_path;
use crate::cache::{format_bytes, CacheStore, StaleFileCleaner};
use crate::error::{PrecacheError, PrecacheResult};
use crate::task::{BuildEnv, TaskRunner};
use crate::ui::{self, TaskProgress, UiContext};
use crate::variant::FrameworkVariant;
use crate::workspace::Workspace;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Why precompilation was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Compiled output already present; holds the first manifest found
    ManifestPresent(PathBuf),
    /// The project does not define the precompile task
    TaskUndefined(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManifestPresent(_) => write!(f, "manifest present"),
            Self::TaskUndefined(_) => write!(f, "task undefined"),
        }
    }
}

/// Result of one precompile attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Skipped(SkipReason),
    Succeeded { duration: Duration, output: String },
    Failed { output: String },
}

/// Result of the teardown hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// Asset compilation is enabled, scratch directories are kept
    Kept,
    /// Paths removed from the working tree
    Removed(Vec<PathBuf>),
}

/// Runs the precompile pipeline for one build
pub struct Precompiler<'a> {
    variant: &'a FrameworkVariant,
    workspace: &'a Workspace,
    cache: &'a dyn CacheStore,
    tasks: &'a dyn TaskRunner,
    env: BuildEnv,
    tracer: Option<&'a dyn StepTracer>,
    ui: UiContext,
    assets_compile: bool,
}

impl<'a> Precompiler<'a> {
    pub fn new(
        variant: &'a FrameworkVariant,
        workspace: &'a Workspace,
        cache: &'a dyn CacheStore,
        tasks: &'a dyn TaskRunner,
    ) -> Self {
        Self {
            variant,
            workspace,
            cache,
            tasks,
            env: BuildEnv::new(),
            tracer: None,
            ui: UiContext::non_interactive(),
            assets_compile: true,
        }
    }

    /// Environment handed to build tasks
    pub fn with_env(mut self, env: BuildEnv) -> Self {
        self.env = env;
        self
    }

    /// Report step boundaries to `tracer`
    pub fn with_tracer(mut self, tracer: &'a dyn StepTracer) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn with_ui(mut self, ui: UiContext) -> Self {
        self.ui = ui;
        self
    }

    /// Whether asset compilation is enabled for this build.
    ///
    /// When disabled, `cleanup()` removes the intermediate cache and scratch
    /// directories from the working tree.
    pub fn with_assets_compile(mut self, enabled: bool) -> Self {
        self.assets_compile = enabled;
        self
    }

    /// Run the precompile pipeline.
    ///
    /// Returns the outcome on success or skip. A failed precompile task is
    /// returned as `PrecacheError::PrecompileFailed` carrying the task output.
    pub async fn compile(&self) -> PrecacheResult<BuildOutcome> {
        let manifest = self.traced(Step::ManifestCheck, || {
            match self.workspace.resolve(&self.variant.public_assets) {
                Ok(public) => {
                    let found = find_manifests(&public, &self.variant.manifest_patterns);
                    (found.into_iter().next(), true)
                }
                Err(e) => {
                    warn!("Cannot resolve public assets directory: {}", e);
                    (None, false)
                }
            }
        });
        if let Some(manifest) = manifest {
            ui::step_info(
                &self.ui,
                "Detected manifest file, assuming assets were compiled locally",
            );
            info!("Skipping precompile: manifest {}", manifest.display());
            return Ok(BuildOutcome::Skipped(SkipReason::ManifestPresent(manifest)));
        }

        let task = &self.variant.precompile_task;
        if !self.tasks.is_defined(task).await {
            info!("Skipping precompile: {} is not defined", task);
            return Ok(BuildOutcome::Skipped(SkipReason::TaskUndefined(task.clone())));
        }

        ui::topic(&self.ui, "Preparing app for asset pipeline");

        self.traced(Step::CacheLoad, || {
            let failures = self.load_asset_cache();
            ((), failures == 0)
        });

        let outcome = self.invoke().await?;
        let duration = match outcome {
            BuildOutcome::Succeeded { duration, .. } => duration,
            BuildOutcome::Failed { output } => {
                ui::step_error(&self.ui, "Precompiling assets failed");
                return Err(PrecacheError::PrecompileFailed {
                    task: task.clone(),
                    output,
                });
            }
            BuildOutcome::Skipped(_) => return Ok(outcome),
        };

        ui::step_ok(
            &self.ui,
            &format!(
                "Asset precompilation completed ({:.2}s)",
                duration.as_secs_f64()
            ),
        );

        self.begin(Step::Clean);
        let started = Instant::now();
        let cleaned = self.clean().await;
        self.finish(Step::Clean, started.elapsed(), cleaned);

        self.traced(Step::CacheStore, || {
            let failures = self.store_asset_cache();
            ((), failures == 0)
        });

        Ok(outcome)
    }

    /// End-of-build teardown.
    ///
    /// When asset compilation is disabled, removes the intermediate cache and
    /// every scratch path from the working tree. The cache backend is never
    /// touched. Safe to call repeatedly and without a prior `compile()`.
    pub fn cleanup(&self) -> PrecacheResult<CleanupOutcome> {
        Ok(self.traced(Step::Teardown, || {
            if self.assets_compile {
                return (CleanupOutcome::Kept, true);
            }

            ui::step_info(&self.ui, "Removing non-essential asset cache directories");

            let mut removed = Vec::new();
            let mut ok = true;
            let keys = std::iter::once(self.variant.default_assets_cache.as_str())
                .chain(self.variant.path_set.scratch_paths.iter().map(String::as_str));

            for key in keys {
                let path = match self.workspace.resolve(key) {
                    Ok(path) => path,
                    Err(e) => {
                        warn!("Cannot resolve {}: {}", key, e);
                        ok = false;
                        continue;
                    }
                };
                match remove_path(&path) {
                    Ok(true) => {
                        debug!("Removed {}", path.display());
                        removed.push(path);
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Failed to remove {}: {}", path.display(), e);
                        ok = false;
                    }
                }
            }

            (CleanupOutcome::Removed(removed), ok)
        }))
    }

    async fn invoke(&self) -> PrecacheResult<BuildOutcome> {
        let task = &self.variant.precompile_task;
        self.begin(Step::Invoke);
        let started = Instant::now();

        let progress = TaskProgress::new(&self.ui, task);
        let on_line = |line: String| progress.on_line(line);
        let result = self.tasks.invoke(task, &self.env, &on_line).await;
        progress.finish();

        let outcome = match result {
            Ok(result) if result.success => BuildOutcome::Succeeded {
                duration: result.duration,
                output: result.output,
            },
            Ok(result) => BuildOutcome::Failed {
                output: result.output,
            },
            Err(e) => {
                self.finish(Step::Invoke, started.elapsed(), false);
                return Err(e);
            }
        };

        let ok = matches!(outcome, BuildOutcome::Succeeded { .. });
        self.finish(Step::Invoke, started.elapsed(), ok);
        Ok(outcome)
    }

    /// Restore prior build state. Returns the number of failed loads.
    fn load_asset_cache(&self) -> usize {
        ui::step_info(&self.ui, "Loading asset cache");

        let mut failures = 0;
        let public = &self.variant.public_assets;
        failures += self.absorb(public, self.cache.load_without_overwrite(public));

        let assets_cache = &self.variant.default_assets_cache;
        failures += self.absorb(assets_cache, self.cache.load(assets_cache));

        for path in self.variant.path_set.all() {
            failures += self.absorb(path, self.cache.load(path));
        }
        failures
    }

    /// Persist the new build state. Returns the number of failed stores.
    fn store_asset_cache(&self) -> usize {
        ui::step_info(&self.ui, "Storing asset cache");

        let mut failures = 0;
        let public = &self.variant.public_assets;
        failures += self.absorb(public, self.cache.store(public));

        let assets_cache = &self.variant.default_assets_cache;
        failures += self.absorb(assets_cache, self.cache.store(assets_cache));

        for path in self.variant.path_set.all() {
            failures += self.absorb(path, self.cache.store(path));
        }
        failures
    }

    /// Prune obsolete output and keep the intermediate cache under budget
    async fn clean(&self) -> bool {
        ui::step_info(&self.ui, "Cleaning assets");
        let mut ok = true;

        let clean_task = &self.variant.clean_task;
        if self.tasks.is_defined(clean_task).await {
            let on_line = |line: String| debug!("{}: {}", clean_task, line);
            match self.tasks.invoke(clean_task, &self.env, &on_line).await {
                Ok(result) if result.success => {}
                Ok(result) => {
                    warn!("{} failed, continuing:\n{}", clean_task, result.output);
                    ok = false;
                }
                Err(e) => {
                    warn!("{} could not run, continuing: {}", clean_task, e);
                    ok = false;
                }
            }
        }

        match self.workspace.resolve(&self.variant.default_assets_cache) {
            Ok(dir) => {
                let report = StaleFileCleaner::new(dir).clean_over(self.variant.cache_limit_bytes);
                if report.files_removed > 0 {
                    ui::remark(
                        &self.ui,
                        &format!(
                            "Removed {} stale cache files ({})",
                            report.files_removed,
                            format_bytes(report.bytes_removed)
                        ),
                    );
                }
            }
            Err(e) => {
                warn!("Cannot resolve asset cache directory: {}", e);
                ok = false;
            }
        }
        ok
    }

    fn absorb<T>(&self, key: &str, result: PrecacheResult<T>) -> usize {
        match result {
            Ok(_) => 0,
            Err(e) => {
                warn!("Cache operation for {} failed, continuing: {}", key, e);
                1
            }
        }
    }

    /// Run a synchronous step between tracer boundaries. `f` returns its
    /// value and whether the step went cleanly.
    fn traced<T>(&self, step: Step, f: impl FnOnce() -> (T, bool)) -> T {
        self.begin(step);
        let started = Instant::now();
        let (value, ok) = f();
        self.finish(step, started.elapsed(), ok);
        value
    }

    fn begin(&self, step: Step) {
        if let Some(tracer) = self.tracer {
            tracer.step_started(step);
        }
    }

    fn finish(&self, step: Step, elapsed: Duration, ok: bool) {
        if let Some(tracer) = self.tracer {
            tracer.step_finished(step, elapsed, ok);
        }
    }
}
