//! Typed error handling for the hub
//!
//! # Error Categories
//!
//! - [`ConfigError`]: Errors related to loading and validating [`HubConfig`](crate::config::HubConfig)
//! - [`ProtocolError`]: Errors related to inbound frames
//!
//! Both fold into [`HubError`], which is what the server assembly returns.
//! None of these ever tear down the broadcast channel: a protocol error is
//! answered on the offending connection only.

use thiserror::Error;

/// The main error type for the hub
#[derive(Debug, Error)]
pub enum HubError {
    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Inbound frame errors
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Socket or listener errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to configuration parsing and validation
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable or field held an unusable value
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    /// The upgrade path is not absolute
    #[error("WebSocket path must start with '/', got {0:?}")]
    InvalidPath(String),

    /// The heartbeat interval would spin
    #[error("Heartbeat interval must be greater than zero")]
    ZeroHeartbeat,

    /// YAML parsing failed
    #[error("Failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The configuration file could not be read
    #[error("Failed to read configuration file: {0}")]
    Read(#[from] std::io::Error),
}

/// Errors related to inbound frames
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The payload is not valid JSON
    #[error("Invalid message format")]
    Malformed(#[source] serde_json::Error),
}

impl ProtocolError {
    /// Text carried by the unicast system notice sent back to the sender
    pub fn notice(&self) -> String {
        self.to_string()
    }
}
