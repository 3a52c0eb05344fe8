//! Core types and handler contracts for glimpse.
//!
//! This crate provides the vocabulary shared by the registry, the preference
//! stores and the preview orchestrator: extensions, handler identities and
//! configuration strings, the capability traits leaf handlers implement, and
//! the [`Preview`] artifact they return.

mod config;
mod error;
mod extension;
mod handler;
mod handler_config;
mod preview;

pub use config::{BrowserConfig, BrowserConfigBuilder, DispatchPolicy};
pub use error::{ArchiveError, HandlerError, PersistenceError, ValidationError};
pub use extension::{Extension, ExtensionSet};
pub use handler::{
    ArchiveHandler, ArchiveSession, ExtensionHandler, FileHandler, MultiFileHandler,
    ObjectHandler, PreviewObject, ReusableHandler, TypeKey,
};
pub use handler_config::{HandlerConfig, HandlerId};
pub use preview::{
    CleanupHook, FocusKind, FocusTarget, Placeholder, Preview, PreviewContent, SearchQuery,
    TreeNode,
};
