//! Server host for transport-agnostic hub state
//!
//! The host owns the single connection registry and the origin gate. Every
//! exposure (REST health, WebSocket chat) and the liveness monitor borrow the
//! same `Arc<ConnectionManager>` from here, so there is exactly one registry
//! per server and no global state.

use crate::config::HubConfig;
use crate::server::exposure::websocket::{ConnectionManager, OriginGate};
use std::sync::Arc;

/// Host context containing all hub state
///
/// # Example
///
/// ```rust,ignore
/// let host = Arc::new(ServerHost::new(config));
///
/// let rest_app = RestExposure::build_router(host.clone(), vec![])?;
/// let ws_app = WebSocketExposure::build_router(host)?;
/// ```
pub struct ServerHost {
    /// Effective configuration
    pub config: Arc<HubConfig>,

    /// The connection registry shared by every component
    pub manager: Arc<ConnectionManager>,

    /// Origin allow-list built from the configuration
    pub gate: OriginGate,
}

impl ServerHost {
    /// Build the host from a configuration
    pub fn new(config: HubConfig) -> Self {
        let gate = OriginGate::new(&config.allowed_origins);
        Self {
            config: Arc::new(config),
            manager: Arc::new(ConnectionManager::new()),
            gate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_follows_config() {
        let open = ServerHost::new(HubConfig::default());
        assert!(open.gate.is_open());

        let gated = ServerHost::new(
            HubConfig::default().with_allowed_origins(["https://a.test"]),
        );
        assert!(!gated.gate.is_open());
        assert!(gated.gate.check(Some("https://a.test")).is_ok());
    }
}
