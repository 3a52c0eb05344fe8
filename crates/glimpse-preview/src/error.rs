//! Error type for the preview front end.

use std::path::PathBuf;

use glimpse_core::{ArchiveError, HandlerError, PersistenceError, ValidationError};
use thiserror::Error;

/// Errors surfaced to the caller of the orchestrator, archive browser or
/// directory listing. Render failures are not among them: those end up
/// as a failed placeholder.
#[derive(Debug, Error)]
pub enum PreviewError {
    /// The requested path failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A preference could not be persisted.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// A handler could not be configured or instantiated.
    #[error(transparent)]
    Handler(#[from] HandlerError),

    /// An archive operation failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// The operation needs a displayed selection.
    #[error("Nothing is displayed")]
    NothingDisplayed,

    /// A handler index outside the candidate list.
    #[error("Handler index {index} out of range ({len} candidates)")]
    IndexOutOfRange { index: usize, len: usize },

    /// No archive handler accepts the file.
    #[error("No archive handler for {path}")]
    NoArchiveHandler { path: PathBuf },

    /// A temp-file pattern is not a valid glob.
    #[error("Invalid file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// I/O error with path context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PreviewError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
