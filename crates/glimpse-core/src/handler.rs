//! Capability traits implemented by leaf handlers.
//!
//! A handler declares what it can render ([`ExtensionHandler`] for files and
//! archives, [`ObjectHandler::can_handle`] for in-memory objects) and turns
//! its input into a [`Preview`]. Optional capabilities are exposed through
//! probe methods on [`FileHandler`] so the orchestrator can ask a trait
//! object whether it also renders several files at once or can update an
//! existing preview in place.

use std::any::{Any, TypeId};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{ArchiveError, HandlerError, ValidationError};
use crate::extension::ExtensionSet;
use crate::preview::Preview;

/// Declares the file extensions a handler accepts.
pub trait ExtensionHandler: Send + Sync {
    /// Extensions this handler renders, or the wildcard.
    fn extensions(&self) -> ExtensionSet;
}

/// Renders a preview for a single file.
pub trait FileHandler: ExtensionHandler {
    /// Build a fresh preview for `path`.
    fn create(&self, path: &Path) -> Result<Preview, HandlerError>;

    /// The multi-file capability, if this handler has it.
    fn as_multi_file(&self) -> Option<&dyn MultiFileHandler> {
        None
    }

    /// The reuse capability, if this handler has it.
    fn as_reusable(&self) -> Option<&dyn ReusableHandler> {
        None
    }
}

/// A handler that renders a whole selection in one preview.
pub trait MultiFileHandler: Send + Sync {
    /// Build a preview for all `paths`.
    fn create_multi(&self, paths: &[PathBuf]) -> Result<Preview, HandlerError>;
}

/// A handler that can update a preview it produced earlier, keeping
/// transient view state such as scroll position or search.
pub trait ReusableHandler: Send + Sync {
    /// Update `previous` to show `path`.
    fn reuse(&self, path: &Path, previous: Preview) -> Result<Preview, HandlerError>;
}

/// Runtime type identity of a previewed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key for a concrete type.
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The type's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this key identifies `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// An in-memory value that can be previewed.
///
/// Implemented for every `Debug + Send + Sync + 'static` type.
pub trait PreviewObject: Send + Sync {
    /// Runtime type of the value.
    fn type_key(&self) -> TypeKey;

    /// Access for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Human-readable rendering used when no specific handler applies.
    fn describe(&self) -> String;
}

impl<T: Any + Send + Sync + fmt::Debug> PreviewObject for T {
    fn type_key(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn describe(&self) -> String {
        format!("{self:#?}")
    }
}

/// Renders previews for in-memory objects.
pub trait ObjectHandler: Send + Sync {
    /// Whether values of this type can be rendered.
    fn can_handle(&self, ty: TypeKey) -> bool;

    /// Build a preview for `object`.
    fn create(&self, object: &dyn PreviewObject) -> Result<Preview, HandlerError>;
}

/// Lists and extracts the entries of an archive file.
///
/// Callers go through [`ArchiveSession`], which validates the archive path
/// before delegating.
pub trait ArchiveHandler: ExtensionHandler {
    /// Names of all file entries in the archive.
    fn list_entries(&self, archive: &Path) -> Result<Vec<String>, ArchiveError>;

    /// Write entry `inner` to `dest`. Returns `false` if the entry was
    /// found but could not be written completely.
    fn extract_entry(&self, archive: &Path, inner: &str, dest: &Path) -> Result<bool, ArchiveError>;
}

/// An archive handler bound to one archive file.
pub struct ArchiveSession {
    handler: Box<dyn ArchiveHandler>,
    archive: PathBuf,
}

impl ArchiveSession {
    /// Bind `handler` to `archive`.
    pub fn new(handler: Box<dyn ArchiveHandler>, archive: impl Into<PathBuf>) -> Self {
        Self {
            handler,
            archive: archive.into(),
        }
    }

    /// The archive path.
    pub fn archive(&self) -> &Path {
        &self.archive
    }

    /// Fail fast if the archive is missing or a directory.
    pub fn check_archive(&self) -> Result<(), ValidationError> {
        ValidationError::check_file(&self.archive)
    }

    /// All file entries of the archive.
    pub fn list_files(&self) -> Result<Vec<String>, ArchiveError> {
        self.check_archive()?;
        self.handler.list_entries(&self.archive)
    }

    /// Extract a single entry to `dest`.
    pub fn extract(&self, inner: &str, dest: &Path) -> Result<bool, ArchiveError> {
        self.check_archive()?;
        self.handler.extract_entry(&self.archive, inner, dest)
    }
}

impl fmt::Debug for ArchiveSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveSession")
            .field("archive", &self.archive)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingArchive {
        calls: Arc<AtomicUsize>,
    }

    impl ExtensionHandler for CountingArchive {
        fn extensions(&self) -> ExtensionSet {
            ExtensionSet::of(&["zip"])
        }
    }

    impl ArchiveHandler for CountingArchive {
        fn list_entries(&self, _archive: &Path) -> Result<Vec<String>, ArchiveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["a.txt".to_string()])
        }

        fn extract_entry(&self, _archive: &Path, _inner: &str, _dest: &Path) -> Result<bool, ArchiveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
    }

    #[test]
    fn test_type_key() {
        let value = 42u32;
        let object: &dyn PreviewObject = &value;
        assert!(object.type_key().is::<u32>());
        assert!(!object.type_key().is::<i32>());
        assert_eq!(object.type_key().name(), "u32");
        assert_eq!(object.describe(), "42");
    }

    #[test]
    fn test_archive_session_rejects_directory_before_handler_runs() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let session = ArchiveSession::new(
            Box::new(CountingArchive {
                calls: calls.clone(),
            }),
            dir.path(),
        );

        let err = session.list_files().unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::Validation(ValidationError::IsDirectory { .. })
        ));
        let err = session.extract("a.txt", &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, ArchiveError::Validation(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_archive_session_delegates_for_files() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let session = ArchiveSession::new(
            Box::new(CountingArchive {
                calls: calls.clone(),
            }),
            file.path(),
        );

        assert_eq!(session.list_files().unwrap(), vec!["a.txt".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
