//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("config file `{0}` is empty")]
    Empty(PathBuf),

    #[error("please use .json, .yaml, or .toml, not `{0}`")]
    UnsupportedFormat(String),

    #[error("failed to parse JSON config")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse TOML config")]
    Toml(#[from] toml::de::Error),

    #[error("failed to serialize TOML config")]
    TomlSer(#[from] toml::ser::Error),

    #[error("failed to parse YAML config")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid ignore pattern `{pattern}`")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_config_error_display() {
        let io_err = ConfigError::Io(
            PathBuf::from("test.toml"),
            Error::new(ErrorKind::NotFound, "file not found"),
        );
        let display = format!("{io_err}");
        assert!(display.contains("IO error"));
        assert!(display.contains("test.toml"));

        let validation_err = ConfigError::Validation("two watchers with the same name".into());
        assert!(format!("{validation_err}").contains("two watchers"));
    }

    #[test]
    fn test_unsupported_format_display() {
        let err = ConfigError::UnsupportedFormat(".ini".into());
        assert!(format!("{err}").contains(".ini"));
    }
}
