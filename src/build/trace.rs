//! Step tracing
//!
//! The orchestrator reports the start and end of each pipeline step to an
//! optional `StepTracer`. `LogTracer` forwards to `tracing`; `JsonlTracer`
//! appends one JSON object per event to a file.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pipeline steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    ManifestCheck,
    CacheLoad,
    Invoke,
    Clean,
    CacheStore,
    Teardown,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManifestCheck => "manifest_check",
            Self::CacheLoad => "cache_load",
            Self::Invoke => "invoke",
            Self::Clean => "clean",
            Self::CacheStore => "cache_store",
            Self::Teardown => "teardown",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives step boundaries from the orchestrator
pub trait StepTracer: Send + Sync {
    fn step_started(&self, step: Step);

    fn step_finished(&self, step: Step, elapsed: Duration, ok: bool);
}

/// Emits step boundaries as `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTracer;

impl StepTracer for LogTracer {
    fn step_started(&self, step: Step) {
        debug!(step = step.as_str(), "step started");
    }

    fn step_finished(&self, step: Step, elapsed: Duration, ok: bool) {
        info!(
            step = step.as_str(),
            elapsed_ms = elapsed.as_millis() as u64,
            ok,
            "step finished"
        );
    }
}

/// Appends step events as JSON lines.
///
/// Write failures are logged and dropped; tracing never affects the build.
#[derive(Debug, Clone)]
pub struct JsonlTracer {
    path: PathBuf,
}

impl JsonlTracer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn log(&self, event: &str, data: serde_json::Value) {
        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": event,
            "data": data,
        });

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize trace event: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line) {
            warn!("Failed to write trace log {}: {}", self.path.display(), e);
        }
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.write_all(line.as_bytes())?;
        file.flush()
    }
}

impl StepTracer for JsonlTracer {
    fn step_started(&self, step: Step) {
        self.log("step.started", serde_json::json!({ "step": step.as_str() }));
    }

    fn step_finished(&self, step: Step, elapsed: Duration, ok: bool) {
        self.log(
            "step.finished",
            serde_json::json!({
                "step": step.as_str(),
                "elapsed_ms": elapsed.as_millis() as u64,
                "ok": ok,
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_json_lines() {
        let dir = TempDir::new().unwrap();
        let tracer = JsonlTracer::new(dir.path().join("logs/trace.jsonl"));

        tracer.step_started(Step::Invoke);
        tracer.step_finished(Step::Invoke, Duration::from_millis(1500), true);

        let content = std::fs::read_to_string(tracer.path()).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "step.started");
        assert_eq!(lines[0]["data"]["step"], "invoke");
        assert_eq!(lines[1]["data"]["elapsed_ms"], 1500);
        assert_eq!(lines[1]["data"]["ok"], true);
        assert!(lines[1]["timestamp"].is_string());
    }

    #[test]
    fn unwritable_path_is_ignored() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"").unwrap();

        // Parent is a regular file, so the append fails
        let tracer = JsonlTracer::new(blocker.join("trace.jsonl"));
        tracer.step_started(Step::CacheLoad);
        assert!(!blocker.join("trace.jsonl").exists());
    }

    #[test]
    fn step_names() {
        assert_eq!(Step::ManifestCheck.to_string(), "manifest_check");
        assert_eq!(Step::CacheStore.to_string(), "cache_store");
    }
}
