//! Shell-command task runner

use super::output::stream_child_output;
use super::{BuildEnv, TaskResult, TaskRunner};
use crate::error::{PrecacheError, PrecacheResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// A task's command line plus an optional project check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellTask {
    pub command: String,
    /// Command listing the project's tasks. When set, the task only counts as
    /// defined if this exits 0 and prints the task name as a word.
    pub detect: Option<String>,
}

impl ShellTask {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            detect: None,
        }
    }

    pub fn with_detect(mut self, detect: impl Into<String>) -> Self {
        self.detect = Some(detect.into());
        self
    }
}

/// Runs tasks as shell command lines inside the build directory
#[derive(Debug)]
pub struct ShellTaskRunner {
    tasks: HashMap<String, ShellTask>,
    workdir: PathBuf,
    /// Detect command to its stdout, or `None` if it failed
    detected: Mutex<HashMap<String, Option<String>>>,
}

impl ShellTaskRunner {
    /// Create a runner for `tasks`, run from `workdir`
    pub fn new(tasks: HashMap<String, ShellTask>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            tasks,
            workdir: workdir.into(),
            detected: Mutex::new(HashMap::new()),
        }
    }

    fn command_for(&self, task: &str) -> Option<&str> {
        self.tasks
            .get(task)
            .map(|t| t.command.trim())
            .filter(|c| !c.is_empty())
    }

    /// Output of `detect`, run once per runner
    async fn task_listing(&self, detect: &str) -> Option<String> {
        let cached = self
            .detected
            .lock()
            .ok()
            .and_then(|cache| cache.get(detect).cloned());
        if let Some(listing) = cached {
            return listing;
        }

        let listing = match shell(detect)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .output()
            .await
        {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                debug!("`{}` exited with {}", detect, output.status);
                None
            }
            Err(e) => {
                warn!("Could not run `{}`: {}", detect, e);
                None
            }
        };

        if let Ok(mut cache) = self.detected.lock() {
            cache.insert(detect.to_string(), listing.clone());
        }
        listing
    }
}

#[cfg(unix)]
fn shell(command_line: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command_line);
    cmd
}

#[cfg(windows)]
fn shell(command_line: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command_line);
    cmd
}

#[async_trait]
impl TaskRunner for ShellTaskRunner {
    async fn is_defined(&self, task: &str) -> bool {
        if self.command_for(task).is_none() {
            return false;
        }
        let Some(detect) = self.tasks.get(task).and_then(|t| t.detect.as_deref()) else {
            return true;
        };
        match self.task_listing(detect).await {
            Some(listing) => listing.split_whitespace().any(|word| word == task),
            None => false,
        }
    }

    async fn invoke(
        &self,
        task: &str,
        env: &BuildEnv,
        on_output: &(dyn Fn(String) + Send + Sync),
    ) -> PrecacheResult<TaskResult> {
        let command_line = self
            .command_for(task)
            .ok_or_else(|| PrecacheError::User(format!("Task not defined: {}", task)))?;

        debug!("Running {}: {}", task, command_line);
        let start = Instant::now();

        let mut child = shell(command_line)
            .current_dir(&self.workdir)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PrecacheError::command_failed(command_line, e))?;

        let lines = stream_child_output(&mut child, on_output).await;
        let status = child
            .wait()
            .await
            .map_err(|e| PrecacheError::command_failed(command_line, e))?;

        let duration = start.elapsed();
        info!(
            "{} exited with {} after {:.2}s",
            task,
            status,
            duration.as_secs_f64()
        );

        Ok(TaskResult {
            success: status.success(),
            output: lines.join("\n"),
            duration,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::schema::TasksConfig;
    use std::fs;
    use tempfile::TempDir;

    fn runner(dir: &TempDir, tasks: &[(&str, &str)]) -> ShellTaskRunner {
        let tasks = tasks
            .iter()
            .map(|(k, v)| (k.to_string(), ShellTask::new(*v)))
            .collect();
        ShellTaskRunner::new(tasks, dir.path())
    }

    fn detecting(dir: &TempDir, task: &str, detect: &str) -> ShellTaskRunner {
        let mut tasks = HashMap::new();
        tasks.insert(task.to_string(), ShellTask::new("true").with_detect(detect));
        ShellTaskRunner::new(tasks, dir.path())
    }

    #[tokio::test]
    async fn blank_commands_are_undefined() {
        let dir = TempDir::new().unwrap();
        let r = runner(&dir, &[("assets:precompile", "make"), ("assets:clean", "  ")]);
        assert!(r.is_defined("assets:precompile").await);
        assert!(!r.is_defined("assets:clean").await);
        assert!(!r.is_defined("db:migrate").await);
    }

    #[tokio::test]
    async fn default_rake_tasks_are_undefined_in_empty_project() {
        let dir = TempDir::new().unwrap();
        let r = ShellTaskRunner::new(TasksConfig::default().resolve(), dir.path());
        assert!(!r.is_defined("assets:precompile").await);
        assert!(!r.is_defined("assets:clean").await);
    }

    #[tokio::test]
    async fn detect_listing_must_name_the_task() {
        let dir = TempDir::new().unwrap();
        let listed = detecting(
            &dir,
            "assets:precompile",
            "echo 'rake assets:clean'; echo 'rake assets:precompile'",
        );
        assert!(listed.is_defined("assets:precompile").await);

        let missing = detecting(&dir, "assets:precompile", "echo 'rake assets:precompile:all'");
        assert!(!missing.is_defined("assets:precompile").await);

        let failing = detecting(&dir, "assets:precompile", "echo 'rake assets:precompile'; exit 1");
        assert!(!failing.is_defined("assets:precompile").await);
    }

    #[tokio::test]
    async fn detect_runs_in_workdir_once() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Rakefile"), "").unwrap();
        let r = detecting(
            &dir,
            "assets:precompile",
            "test -f Rakefile && echo run >> detect.log && echo 'rake assets:precompile'",
        );

        assert!(r.is_defined("assets:precompile").await);
        assert!(r.is_defined("assets:precompile").await);
        assert_eq!(
            fs::read_to_string(dir.path().join("detect.log")).unwrap(),
            "run\n"
        );
    }

    #[tokio::test]
    async fn captures_output_and_env() {
        let dir = TempDir::new().unwrap();
        let r = runner(
            &dir,
            &[("assets:precompile", "echo compiling $RAILS_ENV; echo warn >&2")],
        );
        let mut env = BuildEnv::new();
        env.insert("RAILS_ENV".to_string(), "production".to_string());

        let seen = Mutex::new(Vec::new());
        let result = r
            .invoke("assets:precompile", &env, &|line: String| seen.lock().unwrap().push(line))
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.output.contains("compiling production"));
        assert!(result.output.contains("warn"));
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn runs_in_workdir() {
        let dir = TempDir::new().unwrap();
        let r = runner(&dir, &[("assets:precompile", "mkdir -p public/assets && touch public/assets/x")]);

        let result = r
            .invoke("assets:precompile", &BuildEnv::new(), &|_: String| {})
            .await
            .unwrap();

        assert!(result.success);
        assert!(dir.path().join("public/assets/x").exists());
    }

    #[tokio::test]
    async fn failing_task_is_reported_not_raised() {
        let dir = TempDir::new().unwrap();
        let r = runner(&dir, &[("assets:precompile", "echo 'ExecJS::RuntimeError'; exit 3")]);

        let result = r
            .invoke("assets:precompile", &BuildEnv::new(), &|_: String| {})
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.output, "ExecJS::RuntimeError");
    }

    #[tokio::test]
    async fn undefined_task_is_an_error() {
        let dir = TempDir::new().unwrap();
        let r = runner(&dir, &[]);
        let err = r
            .invoke("assets:precompile", &BuildEnv::new(), &|_: String| {})
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Task not defined"));
    }
}
