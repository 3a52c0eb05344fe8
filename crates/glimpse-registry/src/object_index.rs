//! Runtime type to object handler lookup.

use std::fmt;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use glimpse_core::{HandlerConfig, HandlerError, HandlerId, ObjectHandler, TypeKey};

use crate::catalog::Factory;

/// Maps runtime types to the object handlers that render them.
///
/// Prototype instances are created once, on the first query. Each
/// prototype's `can_handle` is evaluated once per distinct type and the
/// resulting list is cached. Every list ends with the fallback handler.
pub struct ObjectTypeIndex {
    factories: Vec<Factory<dyn ObjectHandler>>,
    fallback: Factory<dyn ObjectHandler>,
    prototypes: OnceLock<Vec<(HandlerId, Box<dyn ObjectHandler>)>>,
    by_type: DashMap<TypeKey, Arc<[HandlerId]>>,
}

impl ObjectTypeIndex {
    /// Create an unbuilt index.
    pub fn new(factories: Vec<Factory<dyn ObjectHandler>>, fallback: Factory<dyn ObjectHandler>) -> Self {
        Self {
            factories,
            fallback,
            prototypes: OnceLock::new(),
            by_type: DashMap::new(),
        }
    }

    /// Handlers for values of type `ty`, best first, ending with the fallback.
    pub fn resolve_for_type(&self, ty: TypeKey) -> Arc<[HandlerId]> {
        if let Some(cached) = self.by_type.get(&ty) {
            return Arc::clone(cached.value());
        }

        let resolved = self
            .by_type
            .entry(ty)
            .or_insert_with(|| self.evaluate(ty));
        Arc::clone(resolved.value())
    }

    /// Id of the fallback handler.
    pub fn fallback_id(&self) -> &HandlerId {
        self.fallback.id()
    }

    /// Ids of all registered object handlers, fallback last.
    pub fn handler_ids(&self) -> Vec<HandlerId> {
        self.prototypes()
            .iter()
            .map(|(id, _)| id.clone())
            .chain(std::iter::once(self.fallback.id().clone()))
            .collect()
    }

    /// Build a handler instance from `config`.
    pub fn instantiate(&self, config: &HandlerConfig) -> Result<Box<dyn ObjectHandler>, HandlerError> {
        if config.id() == self.fallback.id() {
            return self.fallback.build(config);
        }
        self.factories
            .iter()
            .find(|f| f.id() == config.id())
            .ok_or_else(|| HandlerError::UnknownHandler {
                id: config.id().to_string(),
            })?
            .build(config)
    }

    /// Number of types with a cached resolution.
    pub fn cached_types(&self) -> usize {
        self.by_type.len()
    }

    /// Discard prototypes and cached resolutions.
    pub fn reset(&mut self) {
        self.prototypes = OnceLock::new();
        self.by_type.clear();
    }

    fn prototypes(&self) -> &[(HandlerId, Box<dyn ObjectHandler>)] {
        self.prototypes.get_or_init(|| {
            self.factories
                .iter()
                .filter(|f| f.id() != self.fallback.id())
                .filter_map(|factory| match factory.build_default() {
                    Ok(handler) => Some((factory.id().clone(), handler)),
                    Err(e) => {
                        tracing::warn!(
                            target: "registry",
                            index = "object",
                            handler = %factory.id(),
                            error = %e,
                            "skipping handler that failed to instantiate"
                        );
                        None
                    }
                })
                .collect()
        })
    }

    fn evaluate(&self, ty: TypeKey) -> Arc<[HandlerId]> {
        let ids: Vec<HandlerId> = self
            .prototypes()
            .iter()
            .filter(|(_, handler)| handler.can_handle(ty))
            .map(|(id, _)| id.clone())
            .chain(std::iter::once(self.fallback.id().clone()))
            .collect();
        tracing::debug!(target: "registry", ty = %ty, handlers = ids.len(), "resolved object type");
        ids.into()
    }
}

impl fmt::Debug for ObjectTypeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectTypeIndex")
            .field("factories", &self.factories)
            .field("fallback", &self.fallback)
            .field("cached_types", &self.by_type.len())
            .finish()
    }
}
