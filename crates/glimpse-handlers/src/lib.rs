//! Built-in handlers for glimpse.
//!
//! [`builtin_catalog`] registers them in discovery order, which is also the
//! order candidates are offered for an extension: `json-tree` ahead of
//! `plain-text` for `.json`, the wildcard `hex` and `file-info` last.

pub mod archive;
mod file_info;
mod hex;
mod json;
mod objects;
mod text;

use std::fs::File;
use std::path::Path;

use glimpse_core::{ArchiveHandler, FileHandler, HandlerError, ObjectHandler, ValidationError};
use glimpse_registry::PluginCatalog;

pub use archive::{TarHandler, ZipHandler};
pub use file_info::{FileInfoHandler, format_size};
pub use hex::{HexHandler, HexOptions, dump as hex_dump};
pub use json::{JsonOptions, JsonTreeHandler, JsonValueHandler};
pub use objects::TextObjectHandler;
pub use text::{PlainTextHandler, TextOptions};

/// Catalog with every built-in handler and the debug fallback.
pub fn builtin_catalog() -> PluginCatalog {
    let mut catalog = PluginCatalog::default();

    catalog
        .register_file(JsonTreeHandler::ID, |config| {
            Ok(Box::new(JsonTreeHandler::from_config(config)?) as Box<dyn FileHandler>)
        })
        .register_file(PlainTextHandler::ID, |config| {
            Ok(Box::new(PlainTextHandler::from_config(config)?) as Box<dyn FileHandler>)
        })
        .register_file(HexHandler::ID, |config| {
            Ok(Box::new(HexHandler::from_config(config)?) as Box<dyn FileHandler>)
        })
        .register_file(FileInfoHandler::ID, |config| {
            Ok(Box::new(FileInfoHandler::from_config(config)?) as Box<dyn FileHandler>)
        });

    catalog
        .register_archive(ZipHandler::ID, |_| Ok(Box::new(ZipHandler) as Box<dyn ArchiveHandler>))
        .register_archive(TarHandler::ID, |_| Ok(Box::new(TarHandler) as Box<dyn ArchiveHandler>));

    catalog
        .register_object(JsonValueHandler::ID, |config| {
            Ok(Box::new(JsonValueHandler::from_config(config)?) as Box<dyn ObjectHandler>)
        })
        .register_object(TextObjectHandler::ID, |config| {
            Ok(Box::new(TextObjectHandler::from_config(config)?) as Box<dyn ObjectHandler>)
        });

    catalog
}

/// Open `path` for reading after checking that it is an existing file.
pub(crate) fn open_checked(path: &Path) -> Result<File, HandlerError> {
    ValidationError::check_file(path)?;
    File::open(path).map_err(|e| HandlerError::io(path, e))
}
