//! Build task registry
//!
//! The orchestrator asks a `TaskRunner` whether a named task exists and runs
//! it with the build environment. `ShellTaskRunner` maps task names to shell
//! command lines from configuration, optionally checked against the project's
//! own task listing.

mod output;
mod shell;

pub use shell::{ShellTask, ShellTaskRunner};

use crate::error::PrecacheResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Environment passed to build tasks, on top of the inherited process env
pub type BuildEnv = HashMap<String, String>;

/// What a finished task reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub success: bool,
    /// Combined stdout and stderr, one line per line of output
    pub output: String,
    pub duration: Duration,
}

/// Abstract task registry
#[async_trait]
pub trait TaskRunner: Send + Sync {
    /// Whether `task` is defined for this project
    async fn is_defined(&self, task: &str) -> bool;

    /// Run `task` to completion, streaming each output line to `on_output`.
    ///
    /// A task that runs and fails is `Ok` with `success == false`; `Err` means
    /// it could not be run at all.
    async fn invoke(
        &self,
        task: &str,
        env: &BuildEnv,
        on_output: &(dyn Fn(String) + Send + Sync),
    ) -> PrecacheResult<TaskResult>;
}
