//! WebSocket upgrade handler and message loop
//!
//! This module handles the HTTP → WebSocket upgrade and runs the per-connection
//! message loop. Each accepted connection gets:
//!
//! 1. A `meta` frame with its session id, queued before any broadcast
//! 2. A write loop that forwards queued frames to the WebSocket
//! 3. A read loop that turns socket traffic into `ConnectionEvent`s
//!
//! Connections from disallowed origins are upgraded only to be closed with a
//! policy-violation code; they are never registered.

use super::WsContext;
use super::dispatch::MessageRouter;
use super::origin::OriginRejection;
use crate::core::events::ConnectionEvent;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, close_code};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::{HeaderMap, header};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::stream::StreamExt;
use std::sync::Arc;

/// WebSocket upgrade handler
///
/// This is the axum handler for the configured upgrade path. The origin is
/// checked here, before anything is registered.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(ctx): State<Arc<WsContext>>,
) -> impl IntoResponse {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());
    let verdict = ctx.gate.check(origin);

    let router = ctx.router.clone();
    ws.on_upgrade(move |socket| async move {
        match verdict {
            Ok(()) => handle_socket(socket, router).await,
            Err(rejection) => reject_socket(socket, rejection).await,
        }
    })
}

/// Close a connection that failed the origin check
async fn reject_socket(mut socket: WebSocket, rejection: OriginRejection) {
    tracing::warn!(reason = %rejection, "Rejected WebSocket connection");

    let frame = CloseFrame {
        code: close_code::POLICY,
        reason: Utf8Bytes::from_static("Origin not allowed"),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        tracing::debug!(error = %e, "Failed to send policy close frame");
    }
}

/// Handle a single accepted WebSocket connection
///
/// This function:
/// 1. Registers the connection with the ConnectionManager, which queues
///    the `meta` frame
/// 2. Spawns a write loop that drains the connection's outbound queue
/// 3. Emits the `Connected` event
/// 4. Runs the read loop until close, error, or termination
/// 5. Cleans up on disconnect
async fn handle_socket(socket: WebSocket, router: MessageRouter) {
    let manager = router.manager().clone();
    let registration = manager.register().await;
    let sid = registration.session.sid;
    let kill = registration.kill;
    let mut outbound = registration.outbound;

    let (mut ws_write, mut ws_read) = socket.split();

    // Spawn write loop: forward queued frames to the WebSocket
    let write_handle = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if ws_write.send(msg).await.is_err() {
                tracing::debug!(sid = %sid, "WebSocket write failed, closing");
                break;
            }
            if closing {
                break;
            }
        }
    });

    let _ = router.handle_event(&sid, ConnectionEvent::Connected).await;

    // Read loop: translate socket traffic into connection events
    loop {
        let next = tokio::select! {
            _ = kill.notified() => {
                tracing::debug!(sid = %sid, "Connection terminated by server");
                break;
            }
            next = ws_read.next() => next,
        };

        let event = match next {
            Some(Ok(Message::Text(text))) => ConnectionEvent::Frame(text.as_str().to_owned()),
            Some(Ok(Message::Binary(bytes))) => {
                ConnectionEvent::Frame(String::from_utf8_lossy(&bytes).into_owned())
            }
            Some(Ok(Message::Pong(_))) => ConnectionEvent::Pong,
            Some(Ok(Message::Close(_))) => {
                tracing::debug!(sid = %sid, "Client sent close frame");
                ConnectionEvent::Closed
            }
            Some(Ok(_)) => {
                // Pings are answered by the transport
                continue;
            }
            Some(Err(e)) => {
                tracing::debug!(sid = %sid, error = %e, "WebSocket read error");
                ConnectionEvent::Closed
            }
            None => ConnectionEvent::Closed,
        };

        if router.handle_event(&sid, event).await.is_break() {
            break;
        }
    }

    // Cleanup
    write_handle.abort();
    manager.disconnect(&sid).await;
}
