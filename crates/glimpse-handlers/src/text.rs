//! Plain text handler.

use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use glimpse_core::{
    ExtensionHandler, ExtensionSet, FileHandler, FocusKind, FocusTarget, HandlerConfig, HandlerError,
    Preview, PreviewContent, ReusableHandler,
};
use serde::{Deserialize, Serialize};

use crate::hex::{self, HexOptions};
use crate::open_checked;

/// Maximum file size to attempt a text preview (10 MB).
const MAX_PREVIEW_SIZE: u64 = 10 * 1024 * 1024;

/// Number of bytes to inspect for binary detection.
const BINARY_CHECK_BYTES: usize = 1024;

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "text", "md", "markdown", "rst", "log", "csv", "tsv", "json", "xml", "html", "htm",
    "yaml", "yml", "toml", "ini", "cfg", "conf", "props", "properties", "rs", "py", "java", "c",
    "h", "cpp", "hpp", "js", "ts", "css", "sh", "bash", "sql", "r", "m",
];

/// Options accepted by [`PlainTextHandler`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct TextOptions {
    /// Spaces a tab expands to.
    pub tab_width: u8,
    /// Maximum number of lines kept.
    pub max_lines: usize,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            tab_width: 4,
            max_lines: 500,
        }
    }
}

/// Shows text files line by line. Binary content falls back to a hex dump.
///
/// Reusable: a second file replaces the lines of the displayed preview and
/// keeps its focus target, so an active search survives.
#[derive(Debug, Clone, Default)]
pub struct PlainTextHandler {
    options: TextOptions,
}

impl PlainTextHandler {
    pub const ID: &'static str = "plain-text";

    /// Build from a configuration.
    pub fn from_config(config: &HandlerConfig) -> Result<Self, HandlerError> {
        Ok(Self {
            options: config.options()?,
        })
    }

    fn load(&self, path: &Path) -> Result<PreviewContent, HandlerError> {
        let file = open_checked(path)?;
        let size = file.metadata().map_err(|e| HandlerError::io(path, e))?.len();
        if size > MAX_PREVIEW_SIZE {
            return Err(HandlerError::render(format!("File too large: {size} bytes")));
        }

        let mut reader = BufReader::new(file);
        if is_binary(&mut reader).map_err(|e| HandlerError::io(path, e))? {
            return hex::load_hex(path, &HexOptions::default());
        }
        reader
            .seek(SeekFrom::Start(0))
            .map_err(|e| HandlerError::io(path, e))?;

        let tab = " ".repeat(self.options.tab_width as usize);
        let mut lines = Vec::new();
        let mut line_buf = String::new();
        let mut total_lines = 0;

        loop {
            line_buf.clear();
            match reader.read_line(&mut line_buf) {
                Ok(0) => break,
                Ok(_) => {}
                // Invalid UTF-8 ends the preview.
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => break,
                Err(e) => return Err(HandlerError::io(path, e)),
            }

            if lines.len() < self.options.max_lines {
                lines.push(line_buf.trim_end_matches(['\r', '\n']).replace('\t', &tab));
            }
            total_lines += 1;
        }

        Ok(PreviewContent::Text { lines, total_lines })
    }
}

fn is_binary(reader: &mut impl Read) -> std::io::Result<bool> {
    let mut buf = [0u8; BINARY_CHECK_BYTES];
    let read = reader.read(&mut buf)?;
    Ok(buf[..read].contains(&0))
}

impl ExtensionHandler for PlainTextHandler {
    fn extensions(&self) -> ExtensionSet {
        ExtensionSet::of(TEXT_EXTENSIONS)
    }
}

impl FileHandler for PlainTextHandler {
    fn create(&self, path: &Path) -> Result<Preview, HandlerError> {
        Ok(Preview::new(self.load(path)?).with_focus(FocusTarget::new(FocusKind::Text)))
    }

    fn as_reusable(&self) -> Option<&dyn ReusableHandler> {
        Some(self)
    }
}

impl ReusableHandler for PlainTextHandler {
    fn reuse(&self, path: &Path, mut previous: Preview) -> Result<Preview, HandlerError> {
        previous.set_content(self.load(path)?);
        if previous.focus().is_none() {
            previous = previous.with_focus(FocusTarget::new(FocusKind::Text));
        }
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use glimpse_core::SearchQuery;

    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_tabs_and_limits() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "a.txt", b"a\tb\r\nline2\nline3\n");
        let config = HandlerConfig::new(PlainTextHandler::ID)
            .with_option("tab-width", "2")
            .with_option("max-lines", "2");
        let handler = PlainTextHandler::from_config(&config).unwrap();

        let preview = handler.create(&path).unwrap();
        assert_eq!(
            preview.content(),
            &PreviewContent::Text {
                lines: vec!["a  b".to_string(), "line2".to_string()],
                total_lines: 3,
            }
        );
    }

    #[test]
    fn test_binary_falls_back_to_hex() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "a.txt", b"\0\x01\x02");
        let preview = PlainTextHandler::default().create(&path).unwrap();
        assert!(matches!(preview.content(), PreviewContent::Hex { total_bytes: 3, .. }));
    }

    #[test]
    fn test_reuse_keeps_search() {
        let dir = tempfile::tempdir().unwrap();
        let first = write(&dir, "a.txt", b"alpha\n");
        let second = write(&dir, "b.txt", b"beta\n");
        let handler = PlainTextHandler::default();

        let mut preview = handler.create(&first).unwrap();
        preview.focus_mut().unwrap().search = Some(SearchQuery::plain("a"));

        let reused = handler.reuse(&second, preview).unwrap();
        assert_eq!(
            reused.focus().and_then(|f| f.search.clone()),
            Some(SearchQuery::plain("a"))
        );
        assert!(matches!(reused.content(), PreviewContent::Text { lines, .. } if lines[0] == "beta"));
    }

    #[test]
    fn test_unknown_option() {
        let config = HandlerConfig::new(PlainTextHandler::ID).with_option("wrap", "true");
        assert!(matches!(
            PlainTextHandler::from_config(&config),
            Err(HandlerError::InvalidConfig { .. })
        ));
    }
}
