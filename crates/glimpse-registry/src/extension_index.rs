//! Extension to handler lookup.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use glimpse_core::{Extension, ExtensionHandler, ExtensionSet, HandlerConfig, HandlerError, HandlerId};
use itertools::Itertools;

use crate::catalog::Factory;

/// Lookup table computed from the declared extensions of every handler.
#[derive(Debug, Default)]
struct IndexTable {
    by_extension: HashMap<Extension, Vec<HandlerId>>,
    wildcard: Vec<HandlerId>,
    declared: Vec<(HandlerId, ExtensionSet)>,
}

/// Maps file extensions to the handlers that render them.
///
/// The table is built on the first query by instantiating every factory
/// with its default configuration. Results list handlers declaring the
/// extension in registration order, followed by the wildcard handlers.
pub struct ExtensionIndex<H: ?Sized> {
    label: &'static str,
    factories: Vec<Factory<H>>,
    table: OnceLock<IndexTable>,
}

impl<H: ?Sized + ExtensionHandler> ExtensionIndex<H> {
    /// Create an unbuilt index over `factories`.
    pub fn new(label: &'static str, factories: Vec<Factory<H>>) -> Self {
        Self {
            label,
            factories,
            table: OnceLock::new(),
        }
    }

    /// Handlers for `ext`, best first. Empty when nothing applies.
    pub fn resolve(&self, ext: &Extension) -> Vec<HandlerId> {
        let table = self.table();
        let specific = if ext.is_wildcard() {
            None
        } else {
            table.by_extension.get(ext)
        };
        specific
            .into_iter()
            .flatten()
            .chain(table.wildcard.iter())
            .unique()
            .cloned()
            .collect()
    }

    /// Whether any handler applies to `ext`.
    pub fn has_handler(&self, ext: &Extension) -> bool {
        let table = self.table();
        !table.wildcard.is_empty() || table.by_extension.contains_key(ext)
    }

    /// Every handler that survived the build, with its declared extensions.
    pub fn handlers(&self) -> &[(HandlerId, ExtensionSet)] {
        &self.table().declared
    }

    /// Build a handler instance from `config`.
    pub fn instantiate(&self, config: &HandlerConfig) -> Result<Box<H>, HandlerError> {
        self.factories
            .iter()
            .find(|f| f.id() == config.id())
            .ok_or_else(|| HandlerError::UnknownHandler {
                id: config.id().to_string(),
            })?
            .build(config)
    }

    /// Whether the table has been built.
    pub fn is_built(&self) -> bool {
        self.table.get().is_some()
    }

    /// Discard the table; the next query rebuilds it.
    pub fn reset(&mut self) {
        self.table = OnceLock::new();
    }

    fn table(&self) -> &IndexTable {
        self.table.get_or_init(|| self.build())
    }

    fn build(&self) -> IndexTable {
        let mut table = IndexTable::default();

        for factory in &self.factories {
            let handler = match factory.build_default() {
                Ok(handler) => handler,
                Err(e) => {
                    tracing::warn!(
                        target: "registry",
                        index = self.label,
                        handler = %factory.id(),
                        error = %e,
                        "skipping handler that failed to instantiate"
                    );
                    continue;
                }
            };

            let declared = handler.extensions();
            match &declared {
                ExtensionSet::Wildcard => table.wildcard.push(factory.id().clone()),
                ExtensionSet::List(exts) => {
                    for ext in exts {
                        let ids = table.by_extension.entry(ext.clone()).or_default();
                        if !ids.contains(factory.id()) {
                            ids.push(factory.id().clone());
                        }
                    }
                }
            }
            table.declared.push((factory.id().clone(), declared));
        }

        tracing::debug!(
            target: "registry",
            index = self.label,
            extensions = table.by_extension.len(),
            wildcard = table.wildcard.len(),
            "built extension index"
        );
        table
    }
}

impl<H: ?Sized> fmt::Debug for ExtensionIndex<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionIndex")
            .field("label", &self.label)
            .field("factories", &self.factories)
            .field("built", &self.table.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use glimpse_core::{FileHandler, Preview};

    use super::*;

    struct Declares(ExtensionSet);

    impl ExtensionHandler for Declares {
        fn extensions(&self) -> ExtensionSet {
            self.0.clone()
        }
    }

    impl FileHandler for Declares {
        fn create(&self, _path: &Path) -> Result<Preview, HandlerError> {
            Ok(Preview::no_preview())
        }
    }

    fn factory(id: &str, exts: &'static [&'static str]) -> Factory<dyn FileHandler> {
        Factory::new(id, move |_| {
            Ok(Box::new(Declares(ExtensionSet::of(exts))) as Box<dyn FileHandler>)
        })
    }

    #[test]
    fn test_lazy_build_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = builds.clone();
        let counted = Factory::new("counted", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Declares(ExtensionSet::of(&["txt"]))) as Box<dyn FileHandler>)
        });
        let index = ExtensionIndex::new("file", vec![counted]);

        assert!(!index.is_built());
        index.resolve(&Extension::new("txt"));
        index.resolve(&Extension::new("md"));
        assert!(index.is_built());
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reset_rebuilds() {
        let mut index = ExtensionIndex::new("file", vec![factory("a", &["txt"])]);
        assert_eq!(index.resolve(&Extension::new("txt")).len(), 1);
        index.reset();
        assert!(!index.is_built());
        assert_eq!(index.resolve(&Extension::new("txt")).len(), 1);
    }

    #[test]
    fn test_handler_declaring_extension_twice() {
        let index = ExtensionIndex::new("file", vec![factory("a", &["txt", "TXT", ".txt"])]);
        assert_eq!(index.resolve(&Extension::new("txt")), vec![HandlerId::new("a")]);
    }

    #[test]
    fn test_wildcard_handler_listed_once() {
        let index = ExtensionIndex::new("file", vec![factory("any", &["*"]), factory("txt", &["txt"])]);
        let ids = index.resolve(&Extension::new("txt"));
        assert_eq!(ids, vec![HandlerId::new("txt"), HandlerId::new("any")]);
        assert_eq!(index.resolve(&Extension::wildcard()), vec![HandlerId::new("any")]);
    }

    #[test]
    fn test_instantiate_unknown() {
        let index = ExtensionIndex::new("file", vec![factory("a", &["txt"])]);
        let err = index.instantiate(&HandlerConfig::new("missing")).err().unwrap();
        assert!(matches!(err, HandlerError::UnknownHandler { id } if id == "missing"));
    }
}
