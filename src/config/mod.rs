//! Supervisor configuration.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/     # Configuration section definitions
//! │   ├── ignore   # exclude rules (root and per-watcher)
//! │   ├── watcher  # [[watchers]] entries
//! │   └── proxy    # [proxy]
//! ├── error        # ConfigError
//! ├── format       # JSON/TOML/YAML encode/decode
//! └── mod.rs       # Config (this file)
//! ```
//!
//! The config file is read once at startup and immutable thereafter. The
//! encoding is chosen by extension (`.json`, `.toml`, `.yaml`).

mod error;
mod format;
pub mod section;

pub use error::ConfigError;
pub use format::{ConfigFormat, read, write_default};
pub use section::{IgnoreConfig, ProxyConfig, WatcherConfig};

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file names probed when `--config` is not given, in order.
const DEFAULT_CANDIDATES: [&str; 3] = [
    format::JSON_CONFIG,
    format::TOML_CONFIG,
    format::YAML_CONFIG,
];

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project root to watch; `.` for the working directory.
    pub root_dir: String,

    /// Create `{root}/tmp` at startup (build output scratch space).
    pub tmp: bool,

    /// Remove `{root}/tmp` on shutdown.
    pub cleanup_tmp: bool,

    /// Root-level ignore rules, applied to every watcher.
    pub exclude: IgnoreConfig,

    /// Watchers, dispatched in declaration order.
    pub watchers: Vec<WatcherConfig>,

    /// Browser-refresh proxy settings.
    pub proxy: ProxyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: ".".into(),
            tmp: false,
            cleanup_tmp: false,
            exclude: IgnoreConfig {
                dirs: ["data", "dist", "node_modules", "tmp"]
                    .map(String::from)
                    .to_vec(),
                files: Vec::new(),
                regex: vec![
                    // dotfiles on windows or unix at any hierarchy
                    r"^\.?(\/?|\\?)(?:\w+(\/|\\))*(\.\w+)$".into(),
                    r"^.+\.sqlite$".into(),
                    r"^.+\.wal$".into(),
                    r"^.+\.shm$".into(),
                ],
            },
            watchers: vec![WatcherConfig {
                file_types: [".html", ".css", ".js"].map(String::from).to_vec(),
                tasks: vec!["echo files changed".into()],
                ..WatcherConfig::default()
            }],
            proxy: ProxyConfig::default(),
        }
    }
}

impl Config {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = format::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config path: explicit `--config`, or the first default
    /// candidate present in the working directory.
    pub fn find(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }

        for candidate in DEFAULT_CANDIDATES {
            let path = PathBuf::from(candidate);
            if path.is_file() {
                return Ok(path);
            }
        }

        Err(ConfigError::Validation(format!(
            "no config file found (tried {}); run `eavesdrop init` to create one",
            DEFAULT_CANDIDATES.join(", ")
        )))
    }

    /// Validate the whole configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_dir.is_empty() {
            return Err(ConfigError::Validation(
                "root directory required. use '.' for the current working directory".into(),
            ));
        }

        let mut names = FxHashSet::default();
        for watcher in &self.watchers {
            watcher.validate()?;

            if !names.insert(watcher.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "two watchers with the same name: {}",
                    watcher.name
                )));
            }
        }

        self.proxy.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_empty_root_rejected() {
        let config = Config {
            root_dir: String::new(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(format!("{err}").contains("root directory"));
    }

    #[test]
    fn test_duplicate_watcher_names_rejected() {
        let mut config = Config::default();
        config.watchers.push(config.watchers[0].clone());

        let err = config.validate().unwrap_err();
        assert!(format!("{err}").contains("same name"));
    }

    #[test]
    fn test_invalid_watcher_surfaces() {
        let mut config = Config::default();
        config.watchers[0].file_types.clear();
        config.watchers[0].file_names.clear();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_proxy_surfaces() {
        let mut config = Config::default();
        config.proxy.enabled = true;
        config.proxy.app_port = 80;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            "[[watchers]]\nname = \"assets\"\nfile_types = [\".css\"]\ntasks = [\"true\"]\n",
        )
        .unwrap();

        assert_eq!(config.root_dir, ".");
        assert_eq!(config.watchers.len(), 1);
        assert_eq!(config.watchers[0].name, "assets");
        // unspecified durations fall back to the watcher defaults
        assert_eq!(config.watchers[0].max_task_time, 2000);
        assert_eq!(config.watchers[0].debounce_delay, 300);
        assert!(!config.proxy.enabled);
    }

    #[test]
    fn test_find_prefers_explicit() {
        let path = Config::find(Some(Path::new("custom.toml"))).unwrap();
        assert_eq!(path, PathBuf::from("custom.toml"));
    }
}
