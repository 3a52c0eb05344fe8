//! Named handler configurations per extension.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use glimpse_core::{Extension, HandlerConfig, PersistenceError};
use indexmap::IndexMap;

use crate::properties::Properties;

const NAME_SEPARATOR: char = ',';
const CONFIG_SEPARATOR: char = '|';

/// A named handler configuration for one extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Favorite {
    extension: Extension,
    name: String,
    config: HandlerConfig,
}

impl Favorite {
    /// Create a favorite.
    pub fn new(extension: Extension, name: impl Into<String>, config: HandlerConfig) -> Self {
        Self {
            extension,
            name: name.into(),
            config,
        }
    }

    /// The extension bucket.
    pub fn extension(&self) -> &Extension {
        &self.extension
    }

    /// The user-visible name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The handler configuration.
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }
}

type Buckets = IndexMap<Extension, Vec<Favorite>>;

/// Persists favorites grouped by extension.
///
/// Extension buckets are case-insensitive; names are compared exactly.
/// With autosave enabled every mutation rewrites the file and a failed
/// write restores the previous state before the error is returned.
#[derive(Debug)]
pub struct FavoritesStore {
    path: PathBuf,
    autosave: bool,
    buckets: Mutex<Option<Buckets>>,
}

impl FavoritesStore {
    /// Store backed by `path`. Nothing is read yet.
    pub fn new(path: impl Into<PathBuf>, autosave: bool) -> Self {
        Self {
            path: path.into(),
            autosave,
            buckets: Mutex::new(None),
        }
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether mutations are persisted immediately.
    pub fn autosave(&self) -> bool {
        self.autosave
    }

    /// Add a favorite. A favorite with the same name in the same bucket is
    /// replaced in place.
    pub fn add(
        &self,
        ext: &Extension,
        name: impl Into<String>,
        config: HandlerConfig,
    ) -> Result<Favorite, PersistenceError> {
        let favorite = Favorite::new(ext.clone(), name, config);
        let added = favorite.clone();
        self.mutate(move |buckets| {
            let bucket = buckets.entry(favorite.extension.clone()).or_default();
            match bucket.iter_mut().find(|f| f.name == favorite.name) {
                Some(existing) => *existing = favorite,
                None => bucket.push(favorite),
            }
        })?;
        Ok(added)
    }

    /// Remove the first favorite named `name`, searching all buckets.
    pub fn remove(&self, name: &str) -> Result<Option<Favorite>, PersistenceError> {
        self.mutate(|buckets| {
            let mut removed = None;
            for bucket in buckets.values_mut() {
                if let Some(pos) = bucket.iter().position(|f| f.name == name) {
                    removed = Some(bucket.remove(pos));
                    break;
                }
            }
            buckets.retain(|_, bucket| !bucket.is_empty());
            removed
        })
    }

    /// Remove every favorite of `ext`.
    pub fn remove_all(&self, ext: &Extension) -> Result<Vec<Favorite>, PersistenceError> {
        self.mutate(|buckets| buckets.shift_remove(ext).unwrap_or_default())
    }

    /// Favorites of `ext` in insertion order.
    pub fn list(&self, ext: &Extension) -> Vec<Favorite> {
        let mut guard = self.lock();
        self.loaded(&mut guard).get(ext).cloned().unwrap_or_default()
    }

    /// Extensions with at least one favorite.
    pub fn extensions(&self) -> Vec<Extension> {
        let mut guard = self.lock();
        self.loaded(&mut guard).keys().cloned().collect()
    }

    /// Write all favorites to the backing file.
    pub fn save(&self) -> Result<(), PersistenceError> {
        let mut guard = self.lock();
        let buckets = self.loaded(&mut guard);
        self.write(buckets)
    }

    /// Drop the cached state; the next access re-reads the file.
    pub fn reload(&self) {
        *self.lock() = None;
    }

    fn mutate<R>(&self, change: impl FnOnce(&mut Buckets) -> R) -> Result<R, PersistenceError> {
        let mut guard = self.lock();
        let buckets = self.loaded(&mut guard);
        let previous = self.autosave.then(|| buckets.clone());

        let result = change(buckets);

        if let Some(previous) = previous {
            if let Err(e) = self.write(buckets) {
                *buckets = previous;
                return Err(e);
            }
        }
        Ok(result)
    }

    fn write(&self, buckets: &Buckets) -> Result<(), PersistenceError> {
        let mut props = Properties::new();
        for (ext, favorites) in buckets {
            let names: Vec<String> = favorites.iter().map(|f| escape_name(&f.name)).collect();
            props.set(ext.to_string(), names.join(","));
            for favorite in favorites {
                props.set(config_key(ext, &favorite.name), favorite.config.to_string());
            }
        }

        props.write(&self.path, "Preview handler favorites").inspect_err(|e| {
            tracing::error!(target: "prefs", path = %self.path.display(), error = %e, "failed to save favorites");
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<Buckets>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn loaded<'a>(&self, slot: &'a mut Option<Buckets>) -> &'a mut Buckets {
        slot.get_or_insert_with(|| match Properties::load(&self.path) {
            Ok(props) => decode(&props),
            Err(e) => {
                tracing::error!(target: "prefs", error = %e, "failed to load favorites");
                Buckets::new()
            }
        })
    }
}

fn config_key(ext: &Extension, name: &str) -> String {
    format!("{ext}{CONFIG_SEPARATOR}{name}")
}

fn decode(props: &Properties) -> Buckets {
    let mut buckets = Buckets::new();

    for key in props.keys().filter(|k| !k.contains(CONFIG_SEPARATOR)) {
        let ext = Extension::new(key);
        let names = split_names(props.get(key).unwrap_or_default());

        for name in names {
            let raw = props
                .get(&config_key(&ext, &name))
                .or_else(|| props.get(&format!("{key}{CONFIG_SEPARATOR}{name}")));
            let Some(raw) = raw else {
                tracing::warn!(target: "prefs", ext = %ext, name = %name, "favorite has no configuration");
                continue;
            };
            match HandlerConfig::parse(raw) {
                Ok(config) => {
                    let bucket: &mut Vec<Favorite> = buckets.entry(ext.clone()).or_default();
                    bucket.retain(|f| f.name != name);
                    bucket.push(Favorite::new(ext.clone(), name, config));
                }
                Err(e) => {
                    tracing::warn!(target: "prefs", ext = %ext, name = %name, error = %e, "skipping unparsable favorite");
                }
            }
        }
    }

    buckets
}

fn escape_name(name: &str) -> String {
    name.replace('\\', "\\\\").replace(NAME_SEPARATOR, "\\,")
}

fn split_names(list: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut current = String::new();
    let mut chars = list.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            NAME_SEPARATOR => names.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    names.push(current);
    names.retain(|n| !n.is_empty());
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_list_escaping() {
        let names = ["plain", "with,comma", "back\\slash"];
        let joined: Vec<String> = names.iter().map(|n| escape_name(n)).collect();
        assert_eq!(split_names(&joined.join(",")), names);
        assert!(split_names("").is_empty());
    }

    #[test]
    fn test_add_replaces_same_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = FavoritesStore::new(dir.path().join("f.props"), false);
        let txt = Extension::new("txt");

        store.add(&txt, "wide", HandlerConfig::new("plain-text")).unwrap();
        store.add(&txt, "narrow", HandlerConfig::new("plain-text")).unwrap();
        store
            .add(&txt, "wide", HandlerConfig::new("plain-text").with_option("tab-width", "8"))
            .unwrap();

        let list = store.list(&txt);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name(), "wide");
        assert_eq!(list[0].config().option("tab-width"), Some("8"));
    }

    #[test]
    fn test_without_autosave_nothing_written_until_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.props");
        let store = FavoritesStore::new(&path, false);

        store.add(&Extension::new("csv"), "raw", HandlerConfig::new("plain-text")).unwrap();
        assert!(!path.exists());
        store.save().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_decode_lowercases_buckets() {
        let props = Properties::parse("CSV=a\nCSV|a=plain-text\n");
        let buckets = decode(&props);
        let favorites = &buckets[&Extension::new("csv")];
        assert_eq!(favorites[0].name(), "a");
        assert_eq!(favorites[0].extension(), &Extension::new("csv"));
    }
}
