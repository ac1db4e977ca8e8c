//! Detection of previously compiled output

use glob::{MatchOptions, Pattern};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Find manifest files directly inside `dir` whose names match any of
/// `patterns`.
///
/// Wildcards also match a leading dot, so hidden manifests are found.
/// Symlinks to regular files count as manifests.
/// A missing directory has no manifests.
pub fn find_manifests(dir: &Path, patterns: &[String]) -> Vec<PathBuf> {
    let compiled: Vec<Pattern> = patterns
        .iter()
        .filter_map(|p| match Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                debug!("Ignoring invalid manifest pattern {}: {}", p, e);
                None
            }
        })
        .collect();

    let read = match fs::read_dir(dir) {
        Ok(read) => read,
        Err(_) => return Vec::new(),
    };

    let mut found: Vec<PathBuf> = read
        .flatten()
        .filter(|entry| entry.path().is_file())
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            compiled
                .iter()
                .any(|p| p.matches_with(&name, MATCH_OPTIONS))
        })
        .map(|entry| entry.path())
        .collect();

    found.sort();
    found
}
