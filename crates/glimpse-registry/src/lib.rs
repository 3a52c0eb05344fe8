//! Handler catalog and dispatch indices for glimpse.
//!
//! # Architecture
//!
//! Handlers are registered up front in a [`PluginCatalog`]: an ordered table
//! of factories keyed by a stable [`HandlerId`](glimpse_core::HandlerId).
//! The [`HandlerRegistry`] owns one index per capability:
//!
//! - [`ExtensionIndex`] maps an extension to the file (or archive) handlers
//!   that accept it. Wildcard handlers are appended to every result.
//! - [`ObjectTypeIndex`] maps a runtime type to the object handlers whose
//!   `can_handle` predicate accepts it, always ending with a fallback.
//!
//! Indices are built lazily on first query, once, and cached until an
//! explicit [`HandlerRegistry::reset`]. A factory that fails during the
//! build is logged and skipped.
//!
//! # Example
//!
//! ```ignore
//! let mut catalog = PluginCatalog::default();
//! catalog.register_file("plain-text", |config| PlainText::from_config(config));
//! let registry = HandlerRegistry::new(catalog);
//!
//! let candidates = registry.files().resolve(&Extension::new("txt"));
//! ```

mod catalog;
mod extension_index;
mod fallback;
mod object_index;
mod registry;

pub use catalog::{Factory, PluginCatalog};
pub use extension_index::ExtensionIndex;
pub use fallback::DebugObjectHandler;
pub use object_index::ObjectTypeIndex;
pub use registry::HandlerRegistry;
