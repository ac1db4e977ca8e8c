//! Clean-stale command - enforce a byte budget on a directory

use super::Project;
use crate::cache::{format_bytes, StaleFileCleaner};
use crate::cli::args::CleanStaleArgs;
use crate::error::PrecacheResult;
use crate::ui;

/// Execute the clean-stale command
pub async fn execute(args: CleanStaleArgs, project: &Project) -> PrecacheResult<()> {
    let dir = project.resolve(&args.dir);
    let limit = args
        .limit
        .unwrap_or_else(|| project.config.variant().cache_limit_bytes);

    let report = StaleFileCleaner::new(&dir).clean_over(limit);

    if report.files_removed == 0 {
        ui::step_info(
            &project.ui,
            &format!(
                "{} is within budget ({} of {})",
                dir.display(),
                format_bytes(report.remaining_bytes),
                format_bytes(limit)
            ),
        );
    } else {
        ui::step_ok(
            &project.ui,
            &format!(
                "Removed {} file(s), {} freed, {} remaining",
                report.files_removed,
                format_bytes(report.bytes_removed),
                format_bytes(report.remaining_bytes)
            ),
        );
    }

    Ok(())
}
