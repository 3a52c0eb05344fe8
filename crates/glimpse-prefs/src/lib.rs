//! Persistent user choices for glimpse.
//!
//! Two stores share one properties-file codec:
//!
//! - [`PreferredHandlerStore`]: the handler a user last picked for an
//!   extension, separately for content and archive handlers.
//! - [`FavoritesStore`]: named handler configurations per extension.
//!
//! Both load lazily, cache in memory behind a mutex and restore their
//! previous state when a write fails.

mod favorites;
mod preferred;
mod properties;

pub use favorites::{Favorite, FavoritesStore};
pub use preferred::{HandlerKind, PreferredHandlerStore};
pub use properties::Properties;
