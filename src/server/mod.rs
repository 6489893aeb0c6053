//! Server module for assembling the hub
//!
//! This module provides a `ServerBuilder` that wires together:
//! - The shared `ServerHost` (configuration, registry, origin gate)
//! - Health check routes
//! - The WebSocket chat endpoint and its liveness monitor

pub mod builder;
pub mod exposure;
pub mod host;

pub use builder::ServerBuilder;
pub use exposure::{RestExposure, WebSocketExposure};
pub use host::ServerHost;
