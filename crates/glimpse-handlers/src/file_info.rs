//! File metadata table.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use glimpse_core::{
    ExtensionHandler, ExtensionSet, FileHandler, FocusKind, FocusTarget, HandlerConfig, HandlerError,
    MultiFileHandler, Preview, PreviewContent, ValidationError,
};

const COLUMNS: [&str; 3] = ["Name", "Size", "Modified"];

/// Shows name, size and modification time of one or more files.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileInfoHandler;

impl FileInfoHandler {
    pub const ID: &'static str = "file-info";

    /// Build from a configuration. There are no options.
    pub fn from_config(config: &HandlerConfig) -> Result<Self, HandlerError> {
        if let Some((flag, _)) = config.raw_options().first() {
            return Err(HandlerError::InvalidConfig {
                id: Self::ID.to_string(),
                message: format!("unknown option '{flag}'"),
            });
        }
        Ok(Self)
    }

    fn table(paths: &[PathBuf]) -> Result<Preview, HandlerError> {
        let rows = paths.iter().map(|p| row(p)).collect::<Result<Vec<_>, _>>()?;
        Ok(Preview::new(PreviewContent::Table {
            columns: COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows,
        })
        .with_focus(FocusTarget::new(FocusKind::Table)))
    }
}

fn row(path: &Path) -> Result<Vec<String>, HandlerError> {
    ValidationError::check_file(path)?;
    let metadata = std::fs::metadata(path).map_err(|e| HandlerError::io(path, e))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let modified = metadata
        .modified()
        .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| "-".to_string());

    Ok(vec![name, format_size(metadata.len()), modified])
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

impl ExtensionHandler for FileInfoHandler {
    fn extensions(&self) -> ExtensionSet {
        ExtensionSet::Wildcard
    }
}

impl FileHandler for FileInfoHandler {
    fn create(&self, path: &Path) -> Result<Preview, HandlerError> {
        Self::table(&[path.to_path_buf()])
    }

    fn as_multi_file(&self) -> Option<&dyn MultiFileHandler> {
        Some(self)
    }
}

impl MultiFileHandler for FileInfoHandler {
    fn create_multi(&self, paths: &[PathBuf]) -> Result<Preview, HandlerError> {
        Self::table(paths)
    }
}
