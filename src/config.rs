//! Client configuration
//!
//! Where the daemon and the geolocation service live. Everything has a
//! default, so the file is optional and may list only what differs.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::constants::{DEFAULT_GEOIP_URL, DEFAULT_RPC_URL};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Wallet daemon JSON-RPC endpoint
    pub rpc_url: String,
    /// Geolocation service prefix; the IP is appended
    pub geoip_url: String,
    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,
    /// How often `watch` re-reads the chain tip, in seconds
    pub status_refresh_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            geoip_url: DEFAULT_GEOIP_URL.to_string(),
            request_timeout_secs: 30,
            status_refresh_secs: 15,
        }
    }
}

impl Config {
    /// Load a TOML config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, url) in [("rpc_url", &self.rpc_url), ("geoip_url", &self.geoip_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{:?} is not an http(s) URL", url),
                });
            }
        }
        for (field, secs) in [
            ("request_timeout_secs", self.request_timeout_secs),
            ("status_refresh_secs", self.status_refresh_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than 0".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn status_refresh(&self) -> Duration {
        Duration::from_secs(self.status_refresh_secs)
    }
}
