//! Connection lifecycle events
//!
//! The transport loop translates raw WebSocket traffic into [`ConnectionEvent`]s
//! and feeds them to the message router one at a time, per connection. This
//! keeps the hub logic independent of the socket API.
//!
//! ```text
//! WebSocket ──recv──▶ handler ──ConnectionEvent──▶ MessageRouter ──▶ ConnectionManager
//! ```

/// Something that happened on a single connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The connection was registered and greeted
    Connected,
    /// A text frame arrived
    Frame(String),
    /// The peer answered a heartbeat probe
    Pong,
    /// The peer closed the connection, or the transport failed
    Closed,
}

impl ConnectionEvent {
    /// Short name used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            ConnectionEvent::Connected => "connected",
            ConnectionEvent::Frame(_) => "frame",
            ConnectionEvent::Pong => "pong",
            ConnectionEvent::Closed => "closed",
        }
    }
}
