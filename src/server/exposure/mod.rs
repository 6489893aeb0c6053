//! API exposure modules for the hub
//!
//! Each exposure consumes a `ServerHost` and produces a Router for its
//! protocol: plain HTTP for health checks, WebSocket for chat.

pub mod rest;
pub mod websocket;

// Re-export for convenience
pub use rest::RestExposure;
pub use websocket::WebSocketExposure;
