//! Build output with CI fallback
//!
//! Uses `cliclack` for styled output in an interactive terminal and prints
//! plain, buildpack-style lines (`-----> Topic`, indented detail) when
//! running in CI or with redirected output.
//!
//! # Example
//!
//! ```rust,ignore
//! use precache::ui::{self, UiContext, TaskProgress};
//!
//! let ctx = UiContext::detect();
//!
//! ui::topic(&ctx, "Preparing app for asset pipeline");
//! ui::step_info(&ctx, "Loading asset cache");
//!
//! let progress = TaskProgress::new(&ctx, "assets:precompile");
//! progress.on_line("Compiling application.js".to_string());
//! progress.finish();
//!
//! ui::step_ok(&ctx, "Asset precompilation completed (3.21s)");
//! ```

mod context;
mod output;
mod progress;
mod prompts;

pub use context::UiContext;
pub use output::{
    key_value, outro_error, outro_success, remark, step_error, step_info, step_ok, topic,
};
pub use progress::TaskProgress;
pub use prompts::confirm;
