//! The static table of handler factories.

use std::fmt;
use std::sync::Arc;

use glimpse_core::{ArchiveHandler, FileHandler, HandlerConfig, HandlerError, HandlerId, ObjectHandler};

use crate::fallback::DebugObjectHandler;

type BuildFn<H> = dyn Fn(&HandlerConfig) -> Result<Box<H>, HandlerError> + Send + Sync;

/// Constructs handler instances of one type from a configuration.
pub struct Factory<H: ?Sized> {
    id: HandlerId,
    build: Arc<BuildFn<H>>,
}

impl<H: ?Sized> Factory<H> {
    /// Create a factory.
    pub fn new(
        id: impl Into<HandlerId>,
        build: impl Fn(&HandlerConfig) -> Result<Box<H>, HandlerError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            build: Arc::new(build),
        }
    }

    /// The id of the handler type this factory builds.
    pub fn id(&self) -> &HandlerId {
        &self.id
    }

    /// Build an instance with the given configuration.
    pub fn build(&self, config: &HandlerConfig) -> Result<Box<H>, HandlerError> {
        (self.build)(config)
    }

    /// Build an instance with default options.
    pub fn build_default(&self) -> Result<Box<H>, HandlerError> {
        self.build(&HandlerConfig::new(self.id.clone()))
    }
}

impl<H: ?Sized> Clone for Factory<H> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            build: Arc::clone(&self.build),
        }
    }
}

impl<H: ?Sized> fmt::Debug for Factory<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Ordered table of all known handler factories, per capability.
///
/// Registration order is discovery order: it decides the order of
/// resolution results. Registering an id twice for the same capability
/// keeps the first registration.
#[derive(Debug, Clone)]
pub struct PluginCatalog {
    files: Vec<Factory<dyn FileHandler>>,
    archives: Vec<Factory<dyn ArchiveHandler>>,
    objects: Vec<Factory<dyn ObjectHandler>>,
    fallback_object: Factory<dyn ObjectHandler>,
}

impl PluginCatalog {
    /// Empty catalog with the given fallback object handler.
    pub fn new(fallback_object: Factory<dyn ObjectHandler>) -> Self {
        Self {
            files: Vec::new(),
            archives: Vec::new(),
            objects: Vec::new(),
            fallback_object,
        }
    }

    /// Register a file handler factory.
    pub fn register_file(
        &mut self,
        id: impl Into<HandlerId>,
        build: impl Fn(&HandlerConfig) -> Result<Box<dyn FileHandler>, HandlerError>
        + Send
        + Sync
        + 'static,
    ) -> &mut Self {
        push_unique(&mut self.files, Factory::new(id, build), "file");
        self
    }

    /// Register an archive handler factory.
    pub fn register_archive(
        &mut self,
        id: impl Into<HandlerId>,
        build: impl Fn(&HandlerConfig) -> Result<Box<dyn ArchiveHandler>, HandlerError>
        + Send
        + Sync
        + 'static,
    ) -> &mut Self {
        push_unique(&mut self.archives, Factory::new(id, build), "archive");
        self
    }

    /// Register an object handler factory.
    pub fn register_object(
        &mut self,
        id: impl Into<HandlerId>,
        build: impl Fn(&HandlerConfig) -> Result<Box<dyn ObjectHandler>, HandlerError>
        + Send
        + Sync
        + 'static,
    ) -> &mut Self {
        push_unique(&mut self.objects, Factory::new(id, build), "object");
        self
    }

    /// Replace the fallback object handler.
    pub fn set_fallback_object(&mut self, factory: Factory<dyn ObjectHandler>) -> &mut Self {
        self.fallback_object = factory;
        self
    }

    /// File handler factories in registration order.
    pub fn files(&self) -> &[Factory<dyn FileHandler>] {
        &self.files
    }

    /// Archive handler factories in registration order.
    pub fn archives(&self) -> &[Factory<dyn ArchiveHandler>] {
        &self.archives
    }

    /// Object handler factories in registration order.
    pub fn objects(&self) -> &[Factory<dyn ObjectHandler>] {
        &self.objects
    }

    /// The fallback object handler factory.
    pub fn fallback_object(&self) -> &Factory<dyn ObjectHandler> {
        &self.fallback_object
    }
}

impl Default for PluginCatalog {
    fn default() -> Self {
        Self::new(Factory::new(DebugObjectHandler::ID, |_| {
            Ok(Box::new(DebugObjectHandler) as Box<dyn ObjectHandler>)
        }))
    }
}

fn push_unique<H: ?Sized>(list: &mut Vec<Factory<H>>, factory: Factory<H>, kind: &str) {
    if list.iter().any(|f| f.id == factory.id) {
        tracing::warn!(target: "registry", handler = %factory.id, kind, "duplicate registration ignored");
        return;
    }
    list.push(factory);
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use glimpse_core::{ExtensionHandler, ExtensionSet, Preview};

    use super::*;

    struct Nop;

    impl ExtensionHandler for Nop {
        fn extensions(&self) -> ExtensionSet {
            ExtensionSet::of(&["txt"])
        }
    }

    impl FileHandler for Nop {
        fn create(&self, _path: &Path) -> Result<Preview, HandlerError> {
            Ok(Preview::no_preview())
        }
    }

    #[test]
    fn test_registration_order_and_duplicates() {
        let mut catalog = PluginCatalog::default();
        catalog
            .register_file("b", |_| Ok(Box::new(Nop) as Box<dyn FileHandler>))
            .register_file("a", |_| Ok(Box::new(Nop) as Box<dyn FileHandler>))
            .register_file("b", |_| Err(HandlerError::render("second b")));

        let ids: Vec<_> = catalog.files().iter().map(|f| f.id().to_string()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(catalog.files()[0].build_default().is_ok());
    }

    #[test]
    fn test_default_fallback() {
        let catalog = PluginCatalog::default();
        assert_eq!(catalog.fallback_object().id(), &DebugObjectHandler::ID);
    }
}
