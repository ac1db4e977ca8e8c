//! Cache command - inspect and manage the asset cache

use super::Project;
use crate::cache::{format_bytes, CacheStore, DirectoryCache, EntryMeta, LoadOutcome, StoreOutcome};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::error::PrecacheResult;
use crate::ui;
use console::style;
use tracing::debug;

/// Execute the cache command
pub async fn execute(args: CacheArgs, project: &Project) -> PrecacheResult<()> {
    let cache = project.cache(args.cache_dir.as_deref());
    debug!("Cache directory: {}", cache.root().display());

    match args.action {
        CacheAction::List { format } => list_entries(&cache, format),
        CacheAction::Load { path, no_overwrite } => {
            load_entry(project, &cache, &path, no_overwrite)
        }
        CacheAction::Store { path } => store_entry(project, &cache, &path),
        CacheAction::Clear { yes } => clear_entries(project, &cache, yes).await,
    }
}

fn list_entries(cache: &DirectoryCache, format: OutputFormat) -> PrecacheResult<()> {
    let entries = cache.entries()?;

    if entries.is_empty() && !matches!(format, OutputFormat::Json) {
        println!("No cache entries found.");
        return Ok(());
    }

    match format {
        OutputFormat::Table => print_entry_table(&entries),
        OutputFormat::Json => print_entry_json(&entries)?,
        OutputFormat::Plain => print_entry_plain(&entries),
    }

    Ok(())
}

fn print_entry_table(entries: &[EntryMeta]) {
    println!("{:<40} {:>8} {:>10} {:<20}", "PATH", "FILES", "SIZE", "STORED");
    println!("{}", "-".repeat(81));

    let mut total = 0;
    for entry in entries {
        total += entry.bytes;
        println!(
            "{:<40} {:>8} {:>10} {:<20}",
            entry.key,
            entry.files,
            format_bytes(entry.bytes),
            entry.stored_at.format("%Y-%m-%d %H:%M")
        );
    }

    println!();
    println!(
        "Total: {}, {}",
        entries_label(entries.len()),
        format_bytes(total)
    );
}

fn print_entry_json(entries: &[EntryMeta]) -> PrecacheResult<()> {
    println!("{}", serde_json::to_string_pretty(entries)?);
    Ok(())
}

fn print_entry_plain(entries: &[EntryMeta]) {
    for entry in entries {
        println!("{}", entry.key);
    }
}

fn load_entry(
    project: &Project,
    cache: &DirectoryCache,
    path: &str,
    no_overwrite: bool,
) -> PrecacheResult<()> {
    let outcome = if no_overwrite {
        cache.load_without_overwrite(path)?
    } else {
        cache.load(path)?
    };

    match outcome {
        LoadOutcome::Miss => ui::step_info(&project.ui, &format!("No cache entry for {}", path)),
        LoadOutcome::Kept => ui::step_info(
            &project.ui,
            &format!("{} already has content, left untouched", path),
        ),
        LoadOutcome::Restored(stats) => ui::step_ok(
            &project.ui,
            &format!(
                "Restored {} ({} files, {})",
                path,
                stats.files,
                format_bytes(stats.bytes)
            ),
        ),
    }
    Ok(())
}

fn store_entry(project: &Project, cache: &DirectoryCache, path: &str) -> PrecacheResult<()> {
    match cache.store(path)? {
        StoreOutcome::Absent => ui::step_info(
            &project.ui,
            &format!("{} does not exist, nothing stored", path),
        ),
        StoreOutcome::Stored(stats) => ui::step_ok(
            &project.ui,
            &format!(
                "Stored {} ({} files, {})",
                path,
                stats.files,
                format_bytes(stats.bytes)
            ),
        ),
    }
    Ok(())
}

async fn clear_entries(
    project: &Project,
    cache: &DirectoryCache,
    yes: bool,
) -> PrecacheResult<()> {
    let entries = cache.entries()?;

    if entries.is_empty() {
        println!("No cache entries to clear.");
        return Ok(());
    }

    println!("This will remove {}:", entries_label(entries.len()));
    for entry in &entries {
        println!("  {} {}", style("•").red(), entry.key);
    }
    println!();

    let ctx = project.ui.clone().with_auto_yes(yes);
    if !ui::confirm(&ctx, "Remove these entries?", false).await? {
        println!("Aborted.");
        return Ok(());
    }

    let removed = cache.clear()?;
    println!("{} cleared {}", style("✓").green(), entries_label(removed));

    Ok(())
}

fn entries_label(count: usize) -> String {
    if count == 1 {
        "1 entry".to_string()
    } else {
        format!("{} entries", count)
    }
}
