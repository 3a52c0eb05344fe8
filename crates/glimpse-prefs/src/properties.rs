//! Minimal properties-file codec.
//!
//! Supports `key=value`, `key: value` and `key value` separators, `#` and
//! `!` comment lines, backslash line continuations, and the usual escapes
//! (`\t`, `\n`, `\r`, `\f`, `\uXXXX`, escaped separators). Key order is
//! preserved.

use std::fmt::{self, Write as _};
use std::path::Path;

use glimpse_core::PersistenceError;
use indexmap::IndexMap;

/// Ordered key/value pairs backed by a properties file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: IndexMap<String, String>,
}

impl Properties {
    /// Empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse properties text. Malformed escapes are kept literally.
    pub fn parse(text: &str) -> Self {
        let mut props = Self::new();
        let mut logical = String::new();

        for raw in text.lines() {
            let line = if logical.is_empty() {
                raw.trim_start()
            } else {
                raw.trim_start_matches([' ', '\t', '\x0c'])
            };

            if logical.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
                continue;
            }

            if ends_with_continuation(line) {
                logical.push_str(&line[..line.len() - 1]);
                continue;
            }

            logical.push_str(line);
            let (key, value) = split_entry(&logical);
            props.entries.insert(key, value);
            logical.clear();
        }

        if !logical.is_empty() {
            let (key, value) = split_entry(&logical);
            props.entries.insert(key, value);
        }

        props
    }

    /// Load `path`. A missing file yields an empty set.
    pub fn load(path: &Path) -> Result<Self, PersistenceError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(Self::parse(&text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(source) => Err(PersistenceError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Write all entries to `path`, preceded by a `#` comment header.
    pub fn write(&self, path: &Path, header: &str) -> Result<(), PersistenceError> {
        let to_error = |source| PersistenceError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(to_error)?;
        }

        let mut content = String::new();
        for line in header.lines() {
            let _ = writeln!(content, "# {line}");
        }
        content.push_str(&self.to_string());
        std::fs::write(path, content).map_err(to_error)
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Store `value` under `key`, keeping the position of an existing key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.shift_remove(key)
    }

    /// All keys in file order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.entries {
            writeln!(f, "{}={}", escape(key, true), escape(value, false))?;
        }
        Ok(())
    }
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (String, String) {
    let mut key_end = line.len();
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\x0c' => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let key = unescape(&line[..key_end]);
    let mut rest = line[key_end..].trim_start_matches([' ', '\t', '\x0c']);
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start_matches([' ', '\t', '\x0c']);
    }
    (key, unescape(rest))
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let hex: String = chars.clone().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if hex.len() == 4 => {
                        out.push(decoded);
                        for _ in 0..4 {
                            chars.next();
                        }
                    }
                    _ => out.push('u'),
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn escape(s: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, c) in s.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            '=' | ':' | '#' | '!' if is_key => {
                out.push('\\');
                out.push(c);
            }
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}
