use std::io::BufReader;
use std::path::Path;

use glimpse_core::{ArchiveError, ArchiveHandler, ExtensionHandler, ExtensionSet};
use zip::ZipArchive;
use zip::result::ZipError;

/// Lists and extracts zip (and jar) archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipHandler;

impl ZipHandler {
    pub const ID: &'static str = "zip";

    fn open(archive: &Path) -> Result<ZipArchive<BufReader<std::fs::File>>, ArchiveError> {
        let file = super::open(archive)?;
        ZipArchive::new(BufReader::new(file)).map_err(|e| ArchiveError::format(archive, e))
    }
}

impl ExtensionHandler for ZipHandler {
    fn extensions(&self) -> ExtensionSet {
        ExtensionSet::of(&["zip", "jar"])
    }
}

impl ArchiveHandler for ZipHandler {
    fn list_entries(&self, archive: &Path) -> Result<Vec<String>, ArchiveError> {
        let mut zip = Self::open(archive)?;
        let mut names = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let entry = zip.by_index(i).map_err(|e| ArchiveError::format(archive, e))?;
            if entry.is_file() {
                names.push(entry.name().to_string());
            }
        }
        Ok(names)
    }

    fn extract_entry(&self, archive: &Path, inner: &str, dest: &Path) -> Result<bool, ArchiveError> {
        let mut zip = Self::open(archive)?;
        let mut entry = match zip.by_name(inner) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => {
                return Err(ArchiveError::EntryNotFound {
                    archive: archive.to_path_buf(),
                    entry: inner.to_string(),
                });
            }
            Err(e) => return Err(ArchiveError::format(archive, e)),
        };
        let expected = entry.size();
        super::write_entry(&mut entry, dest, expected)
    }
}
