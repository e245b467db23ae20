//! `watchers` section configuration.
//!
//! Each watcher couples a file filter with the work to run when a matching
//! file changes:
//!
//! ```toml
//! [[watchers]]
//! name = "server"
//! file_types = [".go", ".templ"]
//! tasks = ["go generate ./...", "go build -o tmp/app ."]
//! service = "./tmp/app"
//! run_on_start = true
//! trigger_refresh = true
//! ```

use serde::{Deserialize, Serialize};

use super::IgnoreConfig;
use super::super::ConfigError;

/// A single watcher: file filter + debounced task/service pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Unique watcher name, used as the log prefix.
    pub name: String,

    /// File extensions to react to (with or without the leading dot).
    pub file_types: Vec<String>,

    /// Exact file names to react to.
    pub file_names: Vec<String>,

    /// Shell commands run sequentially before the service is (re)started.
    pub tasks: Vec<String>,

    /// Long-running service command; empty means tasks only.
    pub service: String,

    /// Run the task/service pipeline once at startup.
    pub run_on_start: bool,

    /// Hard per-task timeout in milliseconds.
    pub max_task_time: u64,

    /// Grace period before a service is forcefully killed, in milliseconds.
    pub max_service_timeout: u64,

    /// Quiescent interval before a burst of changes triggers the pipeline.
    pub debounce_delay: u64,

    /// Broadcast a browser refresh through the proxy after a successful run.
    pub trigger_refresh: bool,

    /// Watcher-local ignore overlay, applied after the root rules.
    ///
    /// Declared last so the TOML encoding keeps every scalar field ahead
    /// of this sub-table.
    pub exclude: IgnoreConfig,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            name: "watcher".into(),
            file_types: Vec::new(),
            file_names: Vec::new(),
            tasks: Vec::new(),
            service: String::new(),
            run_on_start: true,
            max_task_time: 2000,
            max_service_timeout: 5000,
            debounce_delay: 300,
            trigger_refresh: false,
            exclude: IgnoreConfig::default(),
        }
    }
}

impl WatcherConfig {
    /// Check that the watcher describes something actionable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Validation("watcher requires a name".into()));
        }

        if self.file_types.is_empty() && self.file_names.is_empty() {
            return Err(ConfigError::Validation(format!(
                "{}: at least one file type or file name is required",
                self.name
            )));
        }

        if self.tasks.is_empty() && self.service.is_empty() {
            return Err(ConfigError::Validation(format!(
                "{}: at least one task or service is required",
                self.name
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_watcher() -> WatcherConfig {
        WatcherConfig {
            file_types: vec![".rs".into()],
            tasks: vec!["cargo check".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(valid_watcher().validate().is_ok());
    }

    #[test]
    fn test_validate_requires_name() {
        let watcher = WatcherConfig {
            name: String::new(),
            ..valid_watcher()
        };
        assert!(watcher.validate().is_err());
    }

    #[test]
    fn test_validate_requires_filter() {
        let watcher = WatcherConfig {
            file_types: Vec::new(),
            file_names: Vec::new(),
            ..valid_watcher()
        };
        let err = watcher.validate().unwrap_err();
        assert!(format!("{err}").contains("file type or file name"));
    }

    #[test]
    fn test_validate_requires_work() {
        let watcher = WatcherConfig {
            tasks: Vec::new(),
            service: String::new(),
            ..valid_watcher()
        };
        let err = watcher.validate().unwrap_err();
        assert!(format!("{err}").contains("task or service"));
    }

    #[test]
    fn test_file_names_only_is_valid() {
        let watcher = WatcherConfig {
            file_types: Vec::new(),
            file_names: vec!["Makefile".into()],
            ..valid_watcher()
        };
        assert!(watcher.validate().is_ok());
    }
}
