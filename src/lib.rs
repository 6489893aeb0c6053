//! # Hub
//!
//! A single-process, in-memory real-time chat hub served over WebSocket.
//!
//! ## Features
//!
//! - **Origin Gating**: Reject upgrades from origins outside a configured allow-list
//! - **Connection Registry**: One session per connection with a unique id and a sequential display id
//! - **Nickname Negotiation**: Distinct "joined" and "renamed" notices
//! - **Broadcast Relay**: Every chat message goes to every open connection, sender included
//! - **Heartbeat Liveness**: Silent peers are pruned within two probe intervals
//! - **Graceful Shutdown**: Heartbeat cancelled and connections closed on SIGTERM/Ctrl+C
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hub::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = HubConfig::from_env()?;
//!     ServerBuilder::new().with_config(config).serve().await
//! }
//! ```

pub mod config;
pub mod core;
pub mod server;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        ConfigError, ConnectionEvent, HubError, NicknameChange, ProtocolError, Session,
    };

    // === Config ===
    pub use crate::config::HubConfig;

    // === Server ===
    pub use crate::server::exposure::websocket::{
        ConnectionManager, LivenessMonitor, MessageRouter, OriginGate, OriginRejection,
        RouteOutcome, SweepReport,
        protocol::{ClientMessage, ServerMessage},
    };
    pub use crate::server::{RestExposure, ServerBuilder, ServerHost, WebSocketExposure};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use uuid::Uuid;
}
