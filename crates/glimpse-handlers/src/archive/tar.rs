use std::io::{BufReader, Read};
use std::path::{Component, Path};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use glimpse_core::{ArchiveError, ArchiveHandler, Extension, ExtensionHandler, ExtensionSet};
use tar::Archive;
use xz2::read::XzDecoder;

/// Lists and extracts tar archives, optionally gzip, bzip2 or xz compressed.
///
/// The compression is picked from the archive's extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarHandler;

impl TarHandler {
    pub const ID: &'static str = "tar";

    fn open(archive: &Path) -> Result<Archive<Box<dyn Read>>, ArchiveError> {
        let file = BufReader::new(super::open(archive)?);
        let ext = Extension::from_path(archive).unwrap_or_default();
        let reader: Box<dyn Read> = match ext.as_str() {
            "tgz" | "gz" => Box::new(GzDecoder::new(file)),
            "tbz2" | "bz2" => Box::new(BzDecoder::new(file)),
            "txz" | "xz" => Box::new(XzDecoder::new(file)),
            _ => Box::new(file),
        };
        Ok(Archive::new(reader))
    }
}

fn entry_name(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

impl ExtensionHandler for TarHandler {
    fn extensions(&self) -> ExtensionSet {
        ExtensionSet::of(&["tar", "tgz", "gz", "tbz2", "bz2", "txz", "xz"])
    }
}

impl ArchiveHandler for TarHandler {
    fn list_entries(&self, archive: &Path) -> Result<Vec<String>, ArchiveError> {
        let mut tar = Self::open(archive)?;
        let entries = tar.entries().map_err(|e| ArchiveError::format(archive, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ArchiveError::format(archive, e))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let path = entry.path().map_err(|e| ArchiveError::format(archive, e))?;
            names.push(entry_name(&path));
        }
        Ok(names)
    }

    fn extract_entry(&self, archive: &Path, inner: &str, dest: &Path) -> Result<bool, ArchiveError> {
        let mut tar = Self::open(archive)?;
        let entries = tar.entries().map_err(|e| ArchiveError::format(archive, e))?;

        for entry in entries {
            let mut entry = entry.map_err(|e| ArchiveError::format(archive, e))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let matches = entry
                .path()
                .map(|p| entry_name(&p) == inner)
                .map_err(|e| ArchiveError::format(archive, e))?;
            if matches {
                let expected = entry.size();
                return super::write_entry(&mut entry, dest, expected);
            }
        }

        Err(ArchiveError::EntryNotFound {
            archive: archive.to_path_buf(),
            entry: inner.to_string(),
        })
    }
}
