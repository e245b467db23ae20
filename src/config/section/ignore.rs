//! `exclude` section configuration.
//!
//! Declarative ignore rules, shared by the root config and per-watcher
//! overlays. Rules are interpreted relative to the project root:
//!
//! ```toml
//! [exclude]
//! dirs = ["node_modules", "dist"]
//! files = ["generated.go"]
//! regex = ['^.+\.sqlite$']
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::super::ConfigError;
use crate::watch::IgnoreMatcher;

/// Declarative ignore rules for a watch root or a single watcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Directory names/paths whose whole subtree is excluded.
    pub dirs: Vec<String>,

    /// Exact root-relative file paths to exclude.
    pub files: Vec<String>,

    /// Regular expressions matched against the root-relative path.
    pub regex: Vec<String>,
}

impl IgnoreConfig {
    /// Compile the declared rules into a matcher rooted at `root`.
    ///
    /// Fails on the first invalid regex pattern.
    pub fn compile(&self, root: &Path) -> Result<IgnoreMatcher, ConfigError> {
        let mut regexes = Vec::with_capacity(self.regex.len());
        for pattern in &self.regex {
            let regex = regex::Regex::new(pattern).map_err(|source| ConfigError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
            regexes.push(regex);
        }

        Ok(IgnoreMatcher::new(root, &self.dirs, &self.files, regexes))
    }
}
