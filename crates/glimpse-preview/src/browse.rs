//! Listing the files of a directory for display.

use std::path::{Path, PathBuf};

use glimpse_core::BrowserConfig;
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::PreviewError;

/// Files directly inside `dir`, sorted by file name.
///
/// Directories are never listed. Hidden files (leading `.`) and files
/// matching `temp_file_patterns` are left out unless the configuration
/// asks for them.
pub fn list_directory(dir: &Path, config: &BrowserConfig) -> Result<Vec<PathBuf>, PreviewError> {
    let temp_filter = if config.show_temp_files {
        None
    } else {
        Some(temp_patterns(&config.temp_file_patterns)?)
    };

    let read_dir = std::fs::read_dir(dir).map_err(|e| PreviewError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| PreviewError::io(dir, e))?;
        let path = entry.path();

        // Follows symlinks so that links to files are listed.
        if !path.is_file() {
            continue;
        }

        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !config.show_hidden_files && name.starts_with('.') {
            continue;
        }
        if temp_filter.as_ref().is_some_and(|set| set.is_match(name.as_ref())) {
            tracing::trace!(target: "preview", path = %path.display(), "skipping temp file");
            continue;
        }
        files.push(path);
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn temp_patterns(patterns: &[String]) -> Result<GlobSet, PreviewError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| PreviewError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| PreviewError::Pattern {
        pattern: patterns.join(", "),
        source,
    })
}
