//! Archive handlers.
//!
//! Entry names always use `/` as separator. Only file entries are listed;
//! directories are implied by the names.

mod tar;
mod zip;

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use glimpse_core::ArchiveError;

pub use self::tar::TarHandler;
pub use self::zip::ZipHandler;

fn open(archive: &Path) -> Result<File, ArchiveError> {
    File::open(archive).map_err(|e| ArchiveError::io(archive, e))
}

/// Copy `reader` into a new file at `dest`. Returns whether exactly
/// `expected` bytes were written.
fn write_entry(reader: &mut impl Read, dest: &Path, expected: u64) -> Result<bool, ArchiveError> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
    }
    let mut out = File::create(dest).map_err(|e| ArchiveError::io(dest, e))?;
    match io::copy(reader, &mut out) {
        Ok(written) => Ok(written == expected),
        Err(e) => {
            tracing::error!(target: "archive", dest = %dest.display(), error = %e, "entry extraction interrupted");
            Ok(false)
        }
    }
}
