//! Preferred handler per extension.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use glimpse_core::{Extension, HandlerConfig, PersistenceError};
use strum::{Display, EnumIter};

use crate::properties::Properties;

/// Which kind of handler a preference applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum HandlerKind {
    /// File content handlers.
    #[strum(to_string = "PreferredContentHandler")]
    Content,
    /// Archive handlers.
    #[strum(to_string = "PreferredArchiveHandler")]
    Archive,
}

impl HandlerKind {
    fn key(self, ext: &Extension) -> String {
        format!("{self}-{ext}")
    }
}

/// Persists the handler configuration a user picked for an extension.
///
/// The backing file is read on first access and cached. Every `set`
/// rewrites the whole file. When the write fails the cached state is
/// restored and the error returned.
#[derive(Debug)]
pub struct PreferredHandlerStore {
    path: PathBuf,
    props: Mutex<Option<Properties>>,
}

impl PreferredHandlerStore {
    /// Store backed by `path`. Nothing is read yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            props: Mutex::new(None),
        }
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Preferred configuration of `kind` for `ext`.
    ///
    /// An entry that no longer parses is ignored.
    pub fn get(&self, kind: HandlerKind, ext: &Extension) -> Option<HandlerConfig> {
        let mut guard = self.lock();
        let props = self.loaded(&mut guard);
        let raw = props.get(&kind.key(ext))?;
        match HandlerConfig::parse(raw) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(target: "prefs", ext = %ext, value = raw, error = %e, "ignoring unparsable preference");
                None
            }
        }
    }

    /// Preferred content handler for `ext`.
    pub fn get_content(&self, ext: &Extension) -> Option<HandlerConfig> {
        self.get(HandlerKind::Content, ext)
    }

    /// Preferred archive handler for `ext`.
    pub fn get_archive(&self, ext: &Extension) -> Option<HandlerConfig> {
        self.get(HandlerKind::Archive, ext)
    }

    /// Record `config` as the preference of `kind` for every extension in
    /// `exts` and rewrite the file.
    pub fn set(&self, kind: HandlerKind, exts: &[Extension], config: &HandlerConfig) -> Result<(), PersistenceError> {
        let mut guard = self.lock();
        let props = self.loaded(&mut guard);
        let previous = props.clone();

        let value = config.to_string();
        for ext in exts {
            props.set(kind.key(ext), value.clone());
        }

        if let Err(e) = props.write(&self.path, "Preferred preview handlers") {
            tracing::error!(target: "prefs", path = %self.path.display(), error = %e, "failed to persist preferred handler");
            *props = previous;
            return Err(e);
        }

        tracing::debug!(target: "prefs", %kind, handler = %config.id(), count = exts.len(), "preferred handler stored");
        Ok(())
    }

    /// Record the preferred content handler.
    pub fn set_content(&self, exts: &[Extension], config: &HandlerConfig) -> Result<(), PersistenceError> {
        self.set(HandlerKind::Content, exts, config)
    }

    /// Record the preferred archive handler.
    pub fn set_archive(&self, exts: &[Extension], config: &HandlerConfig) -> Result<(), PersistenceError> {
        self.set(HandlerKind::Archive, exts, config)
    }

    /// Drop the cached state; the next access re-reads the file.
    pub fn reload(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> MutexGuard<'_, Option<Properties>> {
        self.props.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn loaded<'a>(&self, slot: &'a mut Option<Properties>) -> &'a mut Properties {
        slot.get_or_insert_with(|| {
            Properties::load(&self.path).unwrap_or_else(|e| {
                tracing::error!(target: "prefs", error = %e, "failed to load preferred handlers");
                Properties::new()
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_keys() {
        let ext = Extension::new("csv");
        let keys: Vec<_> = HandlerKind::iter().map(|k| k.key(&ext)).collect();
        assert_eq!(keys, vec!["PreferredContentHandler-csv", "PreferredArchiveHandler-csv"]);
    }

    #[test]
    fn test_kinds_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferredHandlerStore::new(dir.path().join("p.props"));
        let ext = Extension::new("zip");

        store.set_archive(&[ext.clone()], &HandlerConfig::new("zip")).unwrap();
        assert_eq!(store.get_archive(&ext), Some(HandlerConfig::new("zip")));
        assert_eq!(store.get_content(&ext), None);
    }

    #[test]
    fn test_unparsable_entry_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.props");
        std::fs::write(&path, "PreferredContentHandler-txt=plain-text -label \"open\n").unwrap();

        let store = PreferredHandlerStore::new(&path);
        assert_eq!(store.get_content(&Extension::new("txt")), None);
    }
}
