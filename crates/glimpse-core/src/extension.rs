//! File extensions used as dispatch keys.

use std::fmt;
use std::path::{Path, PathBuf};

use compact_str::CompactString;

/// Normalized (lowercase, no leading dot) file extension.
///
/// The empty extension stands for "file without a suffix" and only ever
/// resolves to wildcard handlers. `*` is the wildcard itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Extension(CompactString);

impl Extension {
    /// The match-all extension.
    pub const WILDCARD: &'static str = "*";

    /// Create a normalized extension.
    pub fn new(ext: impl AsRef<str>) -> Self {
        let ext = ext.as_ref().trim().trim_start_matches('.');
        Self(CompactString::from(ext.to_lowercase()))
    }

    /// The wildcard extension.
    pub fn wildcard() -> Self {
        Self(CompactString::const_new(Self::WILDCARD))
    }

    /// Extract the extension of a path, if it has one.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(Self::new)
    }

    /// Determine the extension for a selection of paths: the first path
    /// that has one wins.
    pub fn of_paths(paths: &[PathBuf]) -> Option<Self> {
        paths.iter().find_map(|p| Self::from_path(p))
    }

    /// Whether this is the wildcard extension.
    pub fn is_wildcard(&self) -> bool {
        self.0 == Self::WILDCARD
    }

    /// Whether this is the empty extension.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Extension {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Extension {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// The extensions a handler declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionSet {
    /// Handles every extension.
    Wildcard,
    /// Handles exactly these extensions.
    List(Vec<Extension>),
}

impl ExtensionSet {
    /// Build a set from string slices. A `*` entry makes the set a wildcard.
    pub fn of(exts: &[&str]) -> Self {
        if exts.iter().any(|e| e.trim() == Extension::WILDCARD) {
            return Self::Wildcard;
        }
        let mut list: Vec<Extension> = Vec::with_capacity(exts.len());
        for ext in exts.iter().map(Extension::new) {
            if !list.contains(&ext) {
                list.push(ext);
            }
        }
        Self::List(list)
    }

    /// Whether the set matches every extension.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard)
    }

    /// Whether the set accepts `ext`.
    pub fn contains(&self, ext: &Extension) -> bool {
        match self {
            Self::Wildcard => true,
            Self::List(list) => list.contains(ext),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        assert_eq!(Extension::new(".JSON").as_str(), "json");
        assert_eq!(Extension::new(" Csv "), Extension::new("csv"));
        assert!(Extension::new("*").is_wildcard());
    }

    #[test]
    fn test_from_path() {
        assert_eq!(
            Extension::from_path(Path::new("/data/Report.TXT")),
            Some(Extension::new("txt"))
        );
        assert_eq!(Extension::from_path(Path::new("/data/Makefile")), None);
        assert_eq!(
            Extension::from_path(Path::new("archive.tar.gz")),
            Some(Extension::new("gz"))
        );
    }

    #[test]
    fn test_of_paths_first_with_extension() {
        let paths = vec![PathBuf::from("README"), PathBuf::from("b.Md"), PathBuf::from("c.txt")];
        assert_eq!(Extension::of_paths(&paths), Some(Extension::new("md")));
        assert_eq!(Extension::of_paths(&[]), None);
    }

    #[test]
    fn test_extension_set() {
        let set = ExtensionSet::of(&["txt", "TXT", "log"]);
        assert_eq!(set, ExtensionSet::List(vec!["txt".into(), "log".into()]));
        assert!(set.contains(&"log".into()));
        assert!(!set.contains(&"csv".into()));

        let wildcard = ExtensionSet::of(&["txt", "*"]);
        assert!(wildcard.is_wildcard());
        assert!(wildcard.contains(&"anything".into()));
    }
}
