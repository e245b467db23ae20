//! Config file encodings.
//!
//! The on-disk format is chosen by file extension; JSON, TOML, and YAML
//! carry the same schema. `write_default` is the backing for
//! `eavesdrop init`.

use clap::ValueEnum;
use std::{
    fs,
    path::{Path, PathBuf},
};

use super::{Config, ConfigError};

/// Default config file name per encoding.
pub const JSON_CONFIG: &str = ".eavesdrop.json";
pub const TOML_CONFIG: &str = ".eavesdrop.toml";
pub const YAML_CONFIG: &str = ".eavesdrop.yaml";

/// Supported config encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Json,
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// Default file name for this encoding.
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Json => JSON_CONFIG,
            Self::Toml => TOML_CONFIG,
            Self::Yaml => YAML_CONFIG,
        }
    }

    /// Determine the encoding from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();

        match ext.as_str() {
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(ConfigError::UnsupportedFormat(format!(".{other}"))),
        }
    }
}

/// Read and decode a config file; the encoding follows the extension.
///
/// Empty files are rejected so a stray `touch .eavesdrop.toml` fails loudly
/// instead of silently watching nothing.
pub fn read(path: &Path) -> Result<Config, ConfigError> {
    let format = ConfigFormat::from_path(path)?;

    let content =
        fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
    if content.trim().is_empty() {
        return Err(ConfigError::Empty(path.to_path_buf()));
    }

    let config = match format {
        ConfigFormat::Json => serde_json::from_str(&content)?,
        ConfigFormat::Toml => toml::from_str(&content)?,
        ConfigFormat::Yaml => serde_yaml::from_str(&content)?,
    };

    Ok(config)
}

/// Write the default config into `dir` using the chosen encoding.
///
/// Returns the path of the written file.
pub fn write_default(dir: &Path, format: ConfigFormat) -> Result<PathBuf, ConfigError> {
    let path = dir.join(format.file_name());

    let content = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(&Config::default())?,
        ConfigFormat::Toml => toml::to_string_pretty(&Config::default())?,
        ConfigFormat::Yaml => serde_yaml::to_string(&Config::default())?,
    };

    fs::write(&path, content).map_err(|err| ConfigError::Io(path.clone(), err))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new(".eavesdrop.json")).unwrap(),
            ConfigFormat::Json
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("a/b/.eavesdrop.toml")).unwrap(),
            ConfigFormat::Toml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("config.yml")).unwrap(),
            ConfigFormat::Yaml
        );
    }

    #[test]
    fn test_format_from_path_unsupported() {
        assert!(ConfigFormat::from_path(Path::new("config.ini")).is_err());
        assert!(ConfigFormat::from_path(Path::new("config")).is_err());
    }

    #[test]
    fn test_read_missing_file() {
        let err = read(Path::new("/nonexistent/.eavesdrop.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_, _)));
    }

    #[test]
    fn test_read_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".eavesdrop.toml");
        fs::write(&path, "  \n").unwrap();

        let err = read(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Empty(_)));
    }

    #[test]
    fn test_read_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".eavesdrop.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(read(&path), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_roundtrip_all_formats() {
        let dir = tempfile::tempdir().unwrap();
        let defaults = Config::default();

        for format in [ConfigFormat::Json, ConfigFormat::Toml, ConfigFormat::Yaml] {
            let path = write_default(dir.path(), format).unwrap();
            let read_back = read(&path).unwrap();
            read_back.validate().unwrap();

            assert_eq!(read_back.root_dir, defaults.root_dir);
            assert_eq!(read_back.tmp, defaults.tmp);
            assert_eq!(read_back.cleanup_tmp, defaults.cleanup_tmp);
            assert_eq!(read_back.exclude.dirs, defaults.exclude.dirs);
            assert_eq!(read_back.exclude.regex, defaults.exclude.regex);
            assert_eq!(read_back.watchers.len(), defaults.watchers.len());
            assert_eq!(read_back.watchers[0].name, defaults.watchers[0].name);
            assert_eq!(
                read_back.watchers[0].debounce_delay,
                defaults.watchers[0].debounce_delay
            );
            assert_eq!(read_back.proxy.enabled, defaults.proxy.enabled);
            assert_eq!(read_back.proxy.app_port, defaults.proxy.app_port);
        }
    }
}
