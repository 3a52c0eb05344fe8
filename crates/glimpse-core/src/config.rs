//! Browser configuration.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the configuration directory.
pub const HOME_ENV: &str = "GLIMPSE_HOME";

/// What the orchestrator does with a request that arrives while a render
/// is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DispatchPolicy {
    /// Discard the new request.
    #[default]
    Drop,
    /// Keep only the most recent request and run it when the current
    /// render finishes.
    ReplacePending,
    /// Queue requests up to `capacity`; further requests are discarded.
    Queue { capacity: usize },
}

/// Configuration for the preview browser.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct BrowserConfig {
    /// Directory holding the preference and favorites files.
    #[builder(default = "default_config_dir()")]
    pub config_dir: PathBuf,

    /// Persist favorites after every change.
    #[builder(default = "true")]
    pub autosave_favorites: bool,

    /// Let reusable handlers update the displayed preview in place.
    #[builder(default = "true")]
    pub reuse_previews: bool,

    /// Include hidden files in directory listings.
    #[builder(default = "false")]
    pub show_hidden_files: bool,

    /// Include temporary/backup files in directory listings.
    #[builder(default = "false")]
    pub show_temp_files: bool,

    /// Glob patterns identifying temporary files.
    #[builder(default = "default_temp_patterns()")]
    pub temp_file_patterns: Vec<String>,

    /// Policy for requests arriving while a render is in flight.
    #[builder(default)]
    pub dispatch_policy: DispatchPolicy,
}

fn default_config_dir() -> PathBuf {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(home);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("glimpse")
}

fn default_temp_patterns() -> Vec<String> {
    vec!["*.bak".to_string(), "*.backup".to_string(), "*~".to_string()]
}

impl BrowserConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref dir) = self.config_dir {
            if dir.as_os_str().is_empty() {
                return Err("Configuration directory cannot be empty".to_string());
            }
        }
        if let Some(DispatchPolicy::Queue { capacity: 0 }) = self.dispatch_policy {
            return Err("Queue capacity must be at least 1".to_string());
        }
        Ok(())
    }
}

impl BrowserConfig {
    /// Create a new config builder.
    pub fn builder() -> BrowserConfigBuilder {
        BrowserConfigBuilder::default()
    }

    /// Config rooted at `config_dir` with all other settings at defaults.
    pub fn in_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            ..Self::default()
        }
    }

    /// Path of the config file in the default location.
    pub fn default_path() -> PathBuf {
        default_config_dir().join("config.toml")
    }

    /// Load the config from the default location, or return defaults.
    pub fn load() -> Self {
        Self::load_from(&Self::default_path())
    }

    /// Load the config from `path`, or return defaults.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(target: "config", path = %path.display(), error = %e, "ignoring malformed config");
                Self::default()
            }
        }
    }

    /// Save the config to `path`.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        std::fs::write(path, content)
    }

    /// File holding the preferred handler per extension.
    pub fn preferred_handlers_path(&self) -> PathBuf {
        self.config_dir.join("preferred_handlers.props")
    }

    /// File holding the named favorites.
    pub fn favorites_path(&self) -> PathBuf {
        self.config_dir.join("favorites.props")
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            autosave_favorites: true,
            reuse_previews: true,
            show_hidden_files: false,
            show_temp_files: false,
            temp_file_patterns: default_temp_patterns(),
            dispatch_policy: DispatchPolicy::Drop,
        }
    }
}
