//! Error types shared across the preview pipeline.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// A path failed the pre-flight checks that run before any render or
/// archive operation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Path does not exist.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Path points at a directory where a file is required.
    #[error("Path is a directory: {path}")]
    IsDirectory { path: PathBuf },
}

impl ValidationError {
    /// Check that `path` exists and is not a directory.
    pub fn check_file(path: &Path) -> Result<(), Self> {
        if !path.exists() {
            return Err(Self::NotFound {
                path: path.to_path_buf(),
            });
        }
        if path.is_dir() {
            return Err(Self::IsDirectory {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }
}

/// Errors raised while configuring, instantiating or invoking a handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// No factory is registered under this identifier.
    #[error("Unknown handler: {id}")]
    UnknownHandler { id: String },

    /// The configuration string could not be tokenized.
    #[error("Malformed handler configuration: {message}")]
    Syntax { message: String },

    /// The options do not match the handler's option record.
    #[error("Invalid configuration for handler '{id}': {message}")]
    InvalidConfig { id: String, message: String },

    /// The input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// I/O error while reading the input.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The handler could not render the input.
    #[error("{message}")]
    Render { message: String },
}

impl HandlerError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a render error.
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }
}

/// Errors raised while persisting preferences or favorites.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The backing file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing file could not be written.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by archive handlers.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive path failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The requested entry does not exist in the archive.
    #[error("Entry '{entry}' not found in {archive}")]
    EntryNotFound { archive: PathBuf, entry: String },

    /// The archive could not be decoded.
    #[error("Failed to read archive {archive}: {message}")]
    Format { archive: PathBuf, message: String },

    /// I/O error while reading the archive or writing an entry.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArchiveError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a format error for an archive.
    pub fn format(archive: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Format {
            archive: archive.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_file_missing() {
        let err = ValidationError::check_file(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, ValidationError::NotFound { .. }));
    }

    #[test]
    fn test_check_file_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = ValidationError::check_file(dir.path()).unwrap_err();
        assert!(matches!(err, ValidationError::IsDirectory { .. }));
        assert!(err.to_string().contains("directory"));
    }

    #[test]
    fn test_handler_error_from_validation() {
        let err: HandlerError = ValidationError::NotFound {
            path: PathBuf::from("/x"),
        }
        .into();
        assert!(matches!(err, HandlerError::Validation(_)));
    }
}
