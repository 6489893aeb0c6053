//! WebSocket chat exposure
//!
//! This module provides the real-time chat hub: origin gating, the
//! connection registry, message routing, broadcast fan-out, and heartbeat
//! liveness checking.
//!
//! # Architecture
//!
//! ```text
//! Client ──ws──▶ /ws ──▶ ws_handler() ──OriginGate──▶ handle_socket()
//!                                                         │
//!                                               ConnectionEvent per frame
//!                                                         │
//!                                                   MessageRouter
//!                                                         │
//!                          LivenessMonitor ──▶ ConnectionManager ──broadcast──▶ Clients
//! ```
//!
//! # Protocol
//!
//! Client → Server (JSON):
//! - `{"type": "nickname", "nickname": "alice"}`
//! - `{"type": "message", "message": "hi"}`
//!
//! Server → Client (JSON):
//! - `{"type": "meta", "sid": "...", "timestamp": "..."}`
//! - `{"type": "system", "message": "...", "timestamp": "..."}`
//! - `{"type": "user", "user": "...", "message": "...", "senderSid": "...", "timestamp": "..."}`

pub mod dispatch;
mod handler;
pub mod heartbeat;
pub mod manager;
pub mod origin;
pub mod protocol;

pub use dispatch::{MessageRouter, RouteOutcome};
pub use heartbeat::{DEFAULT_HEARTBEAT_INTERVAL, LivenessMonitor, SweepReport};
pub use manager::ConnectionManager;
pub use origin::{OriginGate, OriginRejection};

use crate::server::host::ServerHost;
use anyhow::Result;
use axum::{Router, routing::get};
use std::sync::Arc;

/// Shared state for the upgrade handler
pub struct WsContext {
    /// Handshake-time origin check
    pub gate: OriginGate,
    /// Frame router over the shared registry
    pub router: MessageRouter,
}

/// WebSocket API exposure implementation
///
/// Consumes a `ServerHost` and produces an Axum router with the upgrade
/// endpoint mounted at the configured path.
///
/// The liveness monitor is not started here; `ServerBuilder::serve` owns its
/// lifetime so it can be cancelled on shutdown. Call
/// [`WebSocketExposure::spawn_liveness_monitor`] when serving the router by hand.
///
/// # Example
///
/// ```rust,ignore
/// use hub::server::{ServerHost, WebSocketExposure};
/// use hub::config::HubConfig;
/// use std::sync::Arc;
///
/// let host = Arc::new(ServerHost::new(HubConfig::default()));
/// let ws_router = WebSocketExposure::build_router(host.clone())?;
/// let monitor = WebSocketExposure::spawn_liveness_monitor(&host);
/// ```
pub struct WebSocketExposure;

impl WebSocketExposure {
    /// Build the WebSocket router from a host
    pub fn build_router(host: Arc<ServerHost>) -> Result<Router> {
        let ctx = Arc::new(WsContext {
            gate: host.gate.clone(),
            router: MessageRouter::new(host.manager.clone()),
        });

        if ctx.gate.is_open() {
            tracing::warn!(
                "WebSocketExposure: no allowed origins configured, accepting connections from any origin"
            );
        }

        let router = Router::new()
            .route(&host.config.ws_path, get(handler::ws_handler))
            .with_state(ctx);

        Ok(router)
    }

    /// Start the heartbeat loop for the host's registry
    pub fn spawn_liveness_monitor(host: &ServerHost) -> tokio::task::JoinHandle<()> {
        LivenessMonitor::new(host.manager.clone(), host.config.heartbeat_interval()).spawn()
    }
}
