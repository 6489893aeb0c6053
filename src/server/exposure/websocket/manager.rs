//! Connection registry and broadcast emitter
//!
//! The `ConnectionManager` owns the only shared mutable state in the hub: the
//! mapping from session id to connection handle. Every mutation goes through
//! its `RwLock`, so registrations, nickname changes, liveness updates and
//! removals are serialized even on a multi-threaded runtime.
//!
//! # Architecture
//!
//! ```text
//! handler ──register()──▶ ConnectionManager ◀──probe_liveness()── LivenessMonitor
//!                               │
//!                        broadcast(frame)
//!                               │
//!                serialize once, snapshot peers
//!                               │
//!                ──for each open peer──▶ mpsc ──▶ write loop ──▶ WebSocket
//! ```
//!
//! Each connection's write loop drains its own unbounded channel, so a
//! broadcast never waits on a slow socket and a dead peer only fails its own
//! send.

use super::protocol::ServerMessage;
use crate::core::session::{NicknameChange, Session};
use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Notify, RwLock, mpsc};
use uuid::Uuid;

/// A handle to a single WebSocket connection
struct ConnectionHandle {
    /// Sender feeding the connection's write loop
    tx: mpsc::UnboundedSender<Message>,
    /// Identity and liveness state
    session: Session,
    /// Fired to make the read loop drop the socket
    kill: Arc<Notify>,
}

/// Everything the transport loop needs after registering a connection
pub struct Registration {
    /// The new session (also the registry key via `session.sid`)
    pub session: Session,
    /// Frames to write to the socket, in order
    pub outbound: mpsc::UnboundedReceiver<Message>,
    /// Notified when the connection must be torn down without a handshake
    pub kill: Arc<Notify>,
}

/// A point-in-time view of one registered connection
#[derive(Clone)]
pub struct Peer {
    /// Copy of the session at snapshot time
    pub session: Session,
    tx: mpsc::UnboundedSender<Message>,
}

impl Peer {
    /// Whether the connection's write loop is still accepting frames
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Best-effort send; `false` if the write loop is gone
    pub fn send(&self, message: Message) -> bool {
        self.tx.send(message).is_ok()
    }
}

/// Outcome of one heartbeat probe cycle over the registry
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProbeCycle {
    /// Connections that were sent a fresh probe
    pub probed: usize,
    /// Connections that never answered the previous probe
    pub stale: Vec<Uuid>,
}

/// Tracks all open chat connections and fans frames out to them
pub struct ConnectionManager {
    /// All active connections indexed by session id
    connections: RwLock<HashMap<Uuid, ConnectionHandle>>,
    /// Monotonic display-id counter, never reset within a process run
    next_display_seq: AtomicU64,
}

impl ConnectionManager {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            next_display_seq: AtomicU64::new(1),
        }
    }

    /// Register a new connection
    ///
    /// Allocates a fresh session id and the next display id, and stores the
    /// session with no nickname. The `meta` frame is queued before the
    /// connection becomes visible to broadcasts, so it is always the first
    /// frame the client receives.
    pub async fn register(&self) -> Registration {
        let sequence = self.next_display_seq.fetch_add(1, Ordering::Relaxed);
        let session = Session::new(sequence);
        let (tx, outbound) = mpsc::unbounded_channel();
        let kill = Arc::new(Notify::new());

        if let Some(meta) = encode(&ServerMessage::meta(session.sid)) {
            let _ = tx.send(Message::Text(meta));
        }

        let handle = ConnectionHandle {
            tx,
            session: session.clone(),
            kill: kill.clone(),
        };

        self.connections.write().await.insert(session.sid, handle);

        tracing::debug!(
            sid = %session.sid,
            display_id = %session.display_id,
            "WebSocket client connected"
        );

        Registration {
            session,
            outbound,
            kill,
        }
    }

    /// Remove a connection and return its session
    ///
    /// Returns `None` if it was already removed, which makes duplicate
    /// close/error events harmless.
    pub async fn unregister(&self, sid: &Uuid) -> Option<Session> {
        self.connections
            .write()
            .await
            .remove(sid)
            .map(|handle| handle.session)
    }

    /// Remove a connection and tell everyone else it left
    ///
    /// Returns `true` if this call performed the removal. Only that call
    /// broadcasts the departure notice.
    pub async fn disconnect(&self, sid: &Uuid) -> bool {
        let Some(session) = self.unregister(sid).await else {
            return false;
        };

        tracing::debug!(
            sid = %sid,
            name = %session.display_name(),
            "WebSocket client disconnected"
        );

        self.broadcast(&ServerMessage::system(format!(
            "{} left.",
            session.display_name()
        )))
        .await;

        true
    }

    /// Forcibly drop a connection without a closing handshake
    ///
    /// Wakes the connection's read loop so it releases the socket, then runs
    /// the normal disconnect path.
    pub async fn terminate(&self, sid: &Uuid) -> bool {
        if let Some(handle) = self.connections.read().await.get(sid) {
            handle.kill.notify_one();
        }
        self.disconnect(sid).await
    }

    /// Copy of a session's current state
    pub async fn session(&self, sid: &Uuid) -> Option<Session> {
        self.connections
            .read()
            .await
            .get(sid)
            .map(|handle| handle.session.clone())
    }

    /// Apply an identity-set to a session
    ///
    /// Returns `None` if the connection is no longer registered.
    pub async fn set_nickname(&self, sid: &Uuid, candidate: &str) -> Option<NicknameChange> {
        let mut connections = self.connections.write().await;
        let handle = connections.get_mut(sid)?;
        Some(handle.session.set_nickname(candidate))
    }

    /// Record a pong from the peer
    pub async fn mark_alive(&self, sid: &Uuid) {
        if let Some(handle) = self.connections.write().await.get_mut(sid) {
            handle.session.alive = true;
        }
    }

    /// Run one heartbeat cycle over every registered connection
    ///
    /// Connections whose flag is still cleared are reported as stale and left
    /// for the caller to terminate. All others get their flag cleared and a
    /// fresh ping.
    pub async fn probe_liveness(&self) -> ProbeCycle {
        let mut cycle = ProbeCycle::default();
        let mut connections = self.connections.write().await;

        for (sid, handle) in connections.iter_mut() {
            if !handle.session.alive {
                cycle.stale.push(*sid);
                continue;
            }

            handle.session.alive = false;
            if handle.tx.send(Message::Ping(Bytes::new())).is_ok() {
                cycle.probed += 1;
            }
        }

        cycle
    }

    /// Snapshot of every registered connection
    ///
    /// The lock is released before the snapshot is returned, so callers can
    /// send, await, or unregister while iterating.
    pub async fn snapshot(&self) -> Vec<Peer> {
        self.connections
            .read()
            .await
            .values()
            .map(|handle| Peer {
                session: handle.session.clone(),
                tx: handle.tx.clone(),
            })
            .collect()
    }

    /// Visit a snapshot of the currently registered connections
    pub async fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&Peer),
    {
        for peer in self.snapshot().await {
            visitor(&peer);
        }
    }

    /// Send a frame to every open connection
    ///
    /// The frame is serialized once and every recipient gets the identical
    /// payload. Failed or closed recipients are skipped. Returns the number of
    /// connections the frame was queued for.
    pub async fn broadcast(&self, message: &ServerMessage) -> usize {
        let Some(payload) = encode(message) else {
            return 0;
        };

        let mut delivered = 0;
        self.for_each(|peer| {
            if !peer.is_open() {
                return;
            }
            if peer.send(Message::Text(payload.clone())) {
                delivered += 1;
            } else {
                tracing::debug!(
                    sid = %peer.session.sid,
                    "Failed to send broadcast to connection (likely disconnected)"
                );
            }
        })
        .await;

        delivered
    }

    /// Send a frame to a single connection
    pub async fn send_to(&self, sid: &Uuid, message: &ServerMessage) -> bool {
        let Some(payload) = encode(message) else {
            return false;
        };

        let connections = self.connections.read().await;
        match connections.get(sid) {
            Some(handle) => handle.tx.send(Message::Text(payload)).is_ok(),
            None => false,
        }
    }

    /// Ask every connection to close (used on server shutdown)
    pub async fn close_all(&self, code: u16, reason: &'static str) {
        self.for_each(|peer| {
            let _ = peer.send(Message::Close(Some(CloseFrame {
                code,
                reason: Utf8Bytes::from_static(reason),
            })));
        })
        .await;
    }

    /// Get the number of active connections (for monitoring)
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

/// Serialize a frame once for the wire
fn encode(message: &ServerMessage) -> Option<Utf8Bytes> {
    match serde_json::to_string(message) {
        Ok(json) => Some(json.into()),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize ServerMessage");
            None
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
