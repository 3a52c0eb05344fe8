use glimpse_core::{ArchiveHandler, FileHandler};

use crate::catalog::PluginCatalog;
use crate::extension_index::ExtensionIndex;
use crate::object_index::ObjectTypeIndex;

/// Owns the dispatch indices built from one catalog.
///
/// Shared by reference (usually behind an `Arc`) with everything that
/// resolves handlers. Tests construct their own registry from a small
/// catalog.
#[derive(Debug)]
pub struct HandlerRegistry {
    files: ExtensionIndex<dyn FileHandler>,
    archives: ExtensionIndex<dyn ArchiveHandler>,
    objects: ObjectTypeIndex,
}

impl HandlerRegistry {
    /// Create a registry over `catalog`. Nothing is instantiated until the
    /// first query.
    pub fn new(catalog: PluginCatalog) -> Self {
        Self {
            files: ExtensionIndex::new("file", catalog.files().to_vec()),
            archives: ExtensionIndex::new("archive", catalog.archives().to_vec()),
            objects: ObjectTypeIndex::new(catalog.objects().to_vec(), catalog.fallback_object().clone()),
        }
    }

    /// File handlers by extension.
    pub fn files(&self) -> &ExtensionIndex<dyn FileHandler> {
        &self.files
    }

    /// Archive handlers by extension.
    pub fn archives(&self) -> &ExtensionIndex<dyn ArchiveHandler> {
        &self.archives
    }

    /// Object handlers by runtime type.
    pub fn objects(&self) -> &ObjectTypeIndex {
        &self.objects
    }

    /// Drop all built tables and caches.
    pub fn reset(&mut self) {
        self.files.reset();
        self.archives.reset();
        self.objects.reset();
        tracing::debug!(target: "registry", "registry reset");
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new(PluginCatalog::default())
    }
}
