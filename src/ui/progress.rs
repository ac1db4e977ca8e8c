//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Live view of a running build task.
///
/// Shows a spinner with the latest output line in interactive mode. In CI
/// every output line is echoed, indented, so build logs keep the full task
/// output.
pub struct TaskProgress {
    bar: Option<ProgressBar>,
}

impl TaskProgress {
    /// Start showing progress for `task`
    pub fn new(ctx: &UiContext, task: &str) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new_spinner();
            if let Ok(template) =
                ProgressStyle::default_spinner().template("  {spinner:.cyan} {prefix}  {msg:.dim}  {elapsed:.dim}")
            {
                bar.set_style(template.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
            }
            bar.set_prefix(task.to_string());
            bar.enable_steady_tick(Duration::from_millis(120));
            Some(bar)
        } else {
            println!("{} Running {}", style("...").dim(), task);
            None
        };
        Self { bar }
    }

    /// Show one line of task output
    pub fn on_line(&self, line: String) {
        match self.bar {
            Some(ref bar) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    bar.set_message(truncate(trimmed, 60));
                }
            }
            None => println!("       {}", line),
        }
    }

    /// Stop and clear the spinner
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

fn truncate(line: &str, max: usize) -> String {
    if line.chars().count() <= max {
        return line.to_string();
    }
    let head: String = line.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", head)
}
