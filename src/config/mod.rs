//! Configuration loading and management
//!
//! The hub is configured from YAML, from environment variables, or both:
//! YAML first, then the environment layered on top.
//!
//! ```yaml
//! host: 0.0.0.0
//! port: 8080
//! ws_path: /ws
//! allowed_origins:
//!   - https://chat.example.com
//! heartbeat_interval_secs: 30
//! ```
//!
//! | Variable                  | Field                     |
//! |---------------------------|---------------------------|
//! | `HOST`                    | `host`                    |
//! | `PORT`                    | `port`                    |
//! | `WS_PATH`                 | `ws_path`                 |
//! | `ALLOWED_ORIGINS`         | `allowed_origins` (comma-separated) |
//! | `HEARTBEAT_INTERVAL_SECS` | `heartbeat_interval_secs` |

use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Complete configuration for the chat hub
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Interface to bind
    pub host: String,

    /// Listening port (0 picks an ephemeral port)
    pub port: u16,

    /// Fixed WebSocket upgrade path
    pub ws_path: String,

    /// Exact origins allowed to connect. Empty means open mode.
    pub allowed_origins: Vec<String>,

    /// Seconds between heartbeat probes
    pub heartbeat_interval_secs: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            ws_path: "/ws".to_string(),
            allowed_origins: Vec::new(),
            heartbeat_interval_secs: 30,
        }
    }
}

impl HubConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env()
    }

    /// Layer the process environment over this configuration
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Layer variables from `lookup` over this configuration
    ///
    /// Unset variables leave the current value untouched.
    pub fn apply_vars<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.port = parse_var("PORT", &port)?;
        }
        if let Some(path) = lookup("WS_PATH") {
            self.ws_path = path;
        }
        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            self.allowed_origins = split_origins(&origins);
        }
        if let Some(secs) = lookup("HEARTBEAT_INTERVAL_SECS") {
            self.heartbeat_interval_secs = parse_var("HEARTBEAT_INTERVAL_SECS", &secs)?;
        }
        Ok(self)
    }

    /// Check the configuration for values the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.ws_path.starts_with('/') {
            return Err(ConfigError::InvalidPath(self.ws_path.clone()));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(ConfigError::ZeroHeartbeat);
        }
        Ok(())
    }

    /// `host:port` for binding the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Heartbeat probe interval
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Set the allowed origins (builder style)
    pub fn with_allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }
}

/// Split a comma-separated origin list, dropping blank entries
pub fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
