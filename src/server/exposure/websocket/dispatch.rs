//! Inbound frame routing
//!
//! The `MessageRouter` applies one [`ConnectionEvent`] at a time for a given
//! connection. Text frames are parsed and dispatched by kind:
//!
//! - `nickname`: update the session, broadcast a join or rename notice
//! - `message`: relay a `user` frame to everyone, sender included
//! - anything else: ignored
//!
//! A frame that is not valid JSON is answered with a system notice to the
//! sender only; the connection stays open.

use super::manager::ConnectionManager;
use super::protocol::{ClientMessage, ServerMessage};
use crate::core::error::ProtocolError;
use crate::core::events::ConnectionEvent;
use crate::core::session::NicknameChange;
use std::ops::ControlFlow;
use std::sync::Arc;
use uuid::Uuid;

/// What the router did with one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Invalid JSON; the sender got an error notice
    Malformed,
    /// Nickname set and the notice broadcast
    Nickname(NicknameChange),
    /// Chat message relayed to this many connections
    Relayed(usize),
    /// Unrecognized frame kind
    Ignored,
    /// The connection was already gone
    UnknownSession,
}

/// Dispatches inbound frames against the shared registry
#[derive(Clone)]
pub struct MessageRouter {
    manager: Arc<ConnectionManager>,
}

impl MessageRouter {
    /// Create a router over `manager`
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    /// The registry this router broadcasts through
    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Apply a lifecycle event for connection `sid`
    ///
    /// Returns `Break` once the connection should stop reading.
    pub async fn handle_event(&self, sid: &Uuid, event: ConnectionEvent) -> ControlFlow<()> {
        tracing::trace!(sid = %sid, event = event.kind(), "Connection event");

        match event {
            // `meta` is queued by the registry at registration time
            ConnectionEvent::Connected => ControlFlow::Continue(()),
            ConnectionEvent::Frame(text) => {
                self.route(sid, &text).await;
                ControlFlow::Continue(())
            }
            ConnectionEvent::Pong => {
                self.manager.mark_alive(sid).await;
                ControlFlow::Continue(())
            }
            ConnectionEvent::Closed => {
                self.manager.disconnect(sid).await;
                ControlFlow::Break(())
            }
        }
    }

    /// Process a single inbound text frame
    pub async fn route(&self, sid: &Uuid, text: &str) -> RouteOutcome {
        let message = match ClientMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                let ProtocolError::Malformed(detail) = &e;
                tracing::warn!(sid = %sid, error = %e, detail = %detail, "Malformed frame");
                self.manager
                    .send_to(sid, &ServerMessage::system(e.notice()))
                    .await;
                return RouteOutcome::Malformed;
            }
        };

        match message {
            ClientMessage::Nickname { nickname } => self.set_nickname(sid, &nickname).await,
            ClientMessage::Message { message } => self.relay(sid, message).await,
            ClientMessage::Unknown => RouteOutcome::Ignored,
        }
    }

    async fn set_nickname(&self, sid: &Uuid, candidate: &str) -> RouteOutcome {
        let Some(change) = self.manager.set_nickname(sid, candidate).await else {
            return RouteOutcome::UnknownSession;
        };

        tracing::info!(sid = %sid, nickname = %change.nickname(), "{}", change.notice());
        self.manager
            .broadcast(&ServerMessage::system(change.notice()))
            .await;

        RouteOutcome::Nickname(change)
    }

    async fn relay(&self, sid: &Uuid, body: String) -> RouteOutcome {
        let Some(session) = self.manager.session(sid).await else {
            return RouteOutcome::UnknownSession;
        };

        let frame = ServerMessage::user(session.display_name(), body, session.sid);
        RouteOutcome::Relayed(self.manager.broadcast(&frame).await)
    }
}
