//! `proxy` section configuration.
//!
//! ```toml
//! [proxy]
//! enabled = true
//! app_port = 8000     # where the supervised service listens
//! proxy_port = 8001   # where browsers connect
//! ```

use serde::{Deserialize, Serialize};

use super::super::ConfigError;

/// Lowest port the proxy will accept; everything below is reserved space.
pub const MIN_PORT: u16 = 2000;

/// Browser-refresh proxy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Enable the reverse proxy and its refresh channel.
    pub enabled: bool,

    /// Port the supervised application listens on.
    pub app_port: u16,

    /// Port the proxy binds; browsers connect here.
    pub proxy_port: u16,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            app_port: 8000,
            proxy_port: 8001,
        }
    }
}

impl ProxyConfig {
    /// Check port ranges; only enforced when the proxy is enabled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }

        if self.app_port < MIN_PORT {
            return Err(ConfigError::Validation(format!(
                "app_port must be between {MIN_PORT} and {}",
                u16::MAX
            )));
        }

        if self.proxy_port < MIN_PORT {
            return Err(ConfigError::Validation(format!(
                "proxy_port must be between {MIN_PORT} and {}",
                u16::MAX
            )));
        }

        if self.app_port == self.proxy_port {
            return Err(ConfigError::Validation(
                "app_port and proxy_port must be different".into(),
            ));
        }

        Ok(())
    }
}
