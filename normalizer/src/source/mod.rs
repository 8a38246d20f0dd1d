//! Source file discovery.

use std::path::{Path, PathBuf};

use crate::error::{DiscoveryError, DiscoveryResult};

/// Files in `dir` whose names start with `prefix`, sorted.
///
/// Directories and unreadable entries are ignored.
pub fn find_source_files(dir: &Path, prefix: &str) -> DiscoveryResult<Vec<PathBuf>> {
    let pattern = dir.join(format!("{}*", glob::Pattern::escape(prefix)));
    let pattern = pattern.to_string_lossy();

    let mut files: Vec<PathBuf> = glob::glob(&pattern)?
        .flatten()
        .filter(|entry| entry.is_file())
        .collect();
    files.sort();
    Ok(files)
}

/// The single file in `dir` matching `prefix`.
pub fn select_source(dir: &Path, prefix: &str) -> DiscoveryResult<PathBuf> {
    let mut files = find_source_files(dir, prefix)?;
    match files.len() {
        0 => Err(DiscoveryError::NoMatch {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
        }),
        1 => Ok(files.remove(0)),
        _ => Err(DiscoveryError::Ambiguous {
            prefix: prefix.to_string(),
            candidates: files,
        }),
    }
}
