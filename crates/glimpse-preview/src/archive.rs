//! Browsing archive contents and previewing extracted entries.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glimpse_core::{ArchiveSession, Extension, HandlerConfig, ValidationError};
use glimpse_prefs::PreferredHandlerStore;
use glimpse_registry::HandlerRegistry;
use tempfile::TempPath;

use crate::error::PreviewError;
use crate::orchestrator::{DisplayOutcome, PreviewOrchestrator};

/// Prefix of temp files holding extracted entries.
pub const TEMP_PREFIX: &str = "glimpse-pb-";

/// An open archive: the handler candidates for its extension, the one in
/// use, and the entries it lists.
pub struct ArchiveBrowser {
    registry: Arc<HandlerRegistry>,
    preferred: Arc<PreferredHandlerStore>,
    archive: PathBuf,
    extension: Extension,
    candidates: Vec<HandlerConfig>,
    selected: usize,
    session: ArchiveSession,
    entries: Vec<String>,
}

impl ArchiveBrowser {
    /// Open `archive` with the preferred archive handler for its extension,
    /// or the first candidate, and list its entries.
    pub fn open(
        registry: Arc<HandlerRegistry>,
        preferred: Arc<PreferredHandlerStore>,
        archive: impl Into<PathBuf>,
    ) -> Result<Self, PreviewError> {
        let archive = archive.into();
        ValidationError::check_file(&archive)?;

        let extension = Extension::from_path(&archive).unwrap_or_default();
        let stored = preferred.get_archive(&extension);
        let candidates: Vec<HandlerConfig> = registry
            .archives()
            .resolve(&extension)
            .into_iter()
            .map(|id| match &stored {
                Some(config) if config.id() == &id => config.clone(),
                _ => HandlerConfig::new(id),
            })
            .collect();
        if candidates.is_empty() {
            return Err(PreviewError::NoArchiveHandler { path: archive });
        }

        let selected = stored
            .and_then(|config| candidates.iter().position(|c| c.id() == config.id()))
            .unwrap_or(0);
        let (session, entries) = Self::load(&registry, &candidates[selected], &archive)?;

        Ok(Self {
            registry,
            preferred,
            archive,
            extension,
            candidates,
            selected,
            session,
            entries,
        })
    }

    fn load(
        registry: &HandlerRegistry,
        config: &HandlerConfig,
        archive: &Path,
    ) -> Result<(ArchiveSession, Vec<String>), PreviewError> {
        let handler = registry.archives().instantiate(config)?;
        let session = ArchiveSession::new(handler, archive);
        let entries = session.list_files()?;
        tracing::debug!(
            target: "archive",
            archive = %archive.display(),
            handler = %config.id(),
            entries = entries.len(),
            "archive opened"
        );
        Ok((session, entries))
    }

    /// The archive file.
    pub fn archive(&self) -> &Path {
        &self.archive
    }

    /// Archive handlers that accept this archive's extension.
    pub fn candidates(&self) -> &[HandlerConfig] {
        &self.candidates
    }

    /// Index of the handler in use.
    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// Entry names, in archive order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Switch to archive handler `index`, remember it for this extension
    /// and list the entries again.
    pub fn select_handler(&mut self, index: usize) -> Result<(), PreviewError> {
        let config = self
            .candidates
            .get(index)
            .cloned()
            .ok_or(PreviewError::IndexOutOfRange {
                index,
                len: self.candidates.len(),
            })?;

        let (session, entries) = Self::load(&self.registry, &config, &self.archive)?;
        self.preferred
            .set_archive(std::slice::from_ref(&self.extension), &config)?;

        self.selected = index;
        self.session = session;
        self.entries = entries;
        Ok(())
    }

    /// Extract `inner` to `dest`. Returns `false` if extraction stopped
    /// before the entry was complete.
    pub fn extract(&self, inner: &str, dest: &Path) -> Result<bool, PreviewError> {
        Ok(self.session.extract(inner, dest)?)
    }

    /// Extract `inner` to a temp file that is deleted when the returned
    /// path is dropped.
    pub fn extract_to_temp(&self, inner: &str) -> Result<TempPath, PreviewError> {
        let suffix = Path::new(inner)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();

        let file = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(&suffix)
            .tempfile()
            .map_err(|e| PreviewError::io(std::env::temp_dir(), e))?;
        let temp = file.into_temp_path();

        if !self.session.extract(inner, &temp)? {
            return Err(PreviewError::io(
                &self.archive,
                std::io::Error::other(format!("extraction of '{inner}' was interrupted")),
            ));
        }
        Ok(temp)
    }

    /// Extract `inners` and display them. The temp files live until the
    /// preview showing them is superseded.
    ///
    /// If any entry fails to extract, nothing is displayed and the files
    /// extracted so far are removed.
    pub fn display_entries(
        &self,
        orchestrator: &mut PreviewOrchestrator,
        inners: &[&str],
    ) -> Result<DisplayOutcome, PreviewError> {
        let mut temps = Vec::with_capacity(inners.len());
        for inner in inners {
            match self.extract_to_temp(inner) {
                Ok(temp) => temps.push(temp),
                Err(e) => {
                    tracing::error!(
                        target: "archive",
                        archive = %self.archive.display(),
                        entry = *inner,
                        error = %e,
                        "failed to extract entry"
                    );
                    return Err(e);
                }
            }
        }

        let paths = temps.iter().map(|t| t.to_path_buf()).collect();
        orchestrator.display_with_cleanup(paths, Box::new(move || drop(temps)))
    }
}

impl std::fmt::Debug for ArchiveBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveBrowser")
            .field("archive", &self.archive)
            .field("handler", &self.candidates[self.selected].id())
            .field("entries", &self.entries.len())
            .finish()
    }
}
