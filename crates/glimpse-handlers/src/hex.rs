//! Hex dump handler.

use std::io::Read;
use std::path::Path;

use glimpse_core::{
    ExtensionHandler, ExtensionSet, FileHandler, FocusKind, FocusTarget, HandlerConfig, HandlerError,
    Preview, PreviewContent,
};
use serde::{Deserialize, Serialize};

use crate::open_checked;

/// Options accepted by [`HexHandler`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct HexOptions {
    /// Bytes shown per line.
    pub bytes_per_line: usize,
    /// Maximum number of bytes dumped.
    pub max_bytes: usize,
}

impl Default for HexOptions {
    fn default() -> Self {
        Self {
            bytes_per_line: 16,
            max_bytes: 500 * 16,
        }
    }
}

/// Renders any file as a hex dump.
#[derive(Debug, Clone, Default)]
pub struct HexHandler {
    options: HexOptions,
}

impl HexHandler {
    pub const ID: &'static str = "hex";

    /// Build from a configuration.
    pub fn from_config(config: &HandlerConfig) -> Result<Self, HandlerError> {
        let options: HexOptions = config.options()?;
        if options.bytes_per_line == 0 {
            return Err(HandlerError::InvalidConfig {
                id: Self::ID.to_string(),
                message: "bytes-per-line must be at least 1".to_string(),
            });
        }
        Ok(Self { options })
    }
}

impl ExtensionHandler for HexHandler {
    fn extensions(&self) -> ExtensionSet {
        ExtensionSet::Wildcard
    }
}

impl FileHandler for HexHandler {
    fn create(&self, path: &Path) -> Result<Preview, HandlerError> {
        let content = load_hex(path, &self.options)?;
        Ok(Preview::new(content).with_focus(FocusTarget::new(FocusKind::Text)))
    }
}

/// Read up to `max_bytes` of `path` into a hex dump.
pub(crate) fn load_hex(path: &Path, options: &HexOptions) -> Result<PreviewContent, HandlerError> {
    let file = open_checked(path)?;
    let total_bytes = file.metadata().map_err(|e| HandlerError::io(path, e))?.len();

    let mut buf = Vec::with_capacity(options.max_bytes.min(total_bytes as usize));
    file.take(options.max_bytes as u64)
        .read_to_end(&mut buf)
        .map_err(|e| HandlerError::io(path, e))?;

    Ok(PreviewContent::Hex {
        lines: dump(&buf, options.bytes_per_line),
        total_bytes,
    })
}

/// Format `bytes` as offset, hex and ASCII columns.
pub fn dump(bytes: &[u8], bytes_per_line: usize) -> Vec<String> {
    let width = bytes_per_line.max(1);
    bytes
        .chunks(width)
        .enumerate()
        .map(|(i, chunk)| {
            let offset = format!("{:08x}  ", i * width);
            let hex: String = chunk.iter().map(|b| format!("{b:02x} ")).collect();
            let ascii: String = chunk
                .iter()
                .map(|&b| {
                    if b.is_ascii_graphic() || b == b' ' {
                        b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            format!("{offset}{hex:<pad$} |{ascii}|", pad = width * 3)
        })
        .collect()
}
