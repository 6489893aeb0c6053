//! Integration tests for the WebSocket chat hub
//!
//! These tests spin up a real HTTP+WebSocket server and verify the full flow:
//! connect → meta → nickname/message frames → broadcast to every client.

use futures_util::{SinkExt, StreamExt};
use hub::config::HubConfig;
use hub::server::exposure::rest::RestExposure;
use hub::server::exposure::websocket::WebSocketExposure;
use hub::server::host::ServerHost;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type WsWrite =
    futures_util::stream::SplitSink<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>, Message>;
type WsRead = futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Helper: start a test server for `config` and return (address, host)
async fn start_test_server(config: HubConfig) -> (SocketAddr, Arc<ServerHost>) {
    let host = Arc::new(ServerHost::new(config));

    let rest_router = RestExposure::build_router(host.clone(), vec![]).unwrap();
    let ws_router = WebSocketExposure::build_router(host.clone()).unwrap();
    let app = rest_router.merge(ws_router);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Small delay to let the server start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, host)
}

/// Helper: open a WebSocket, optionally with an Origin header
async fn ws_open(addr: SocketAddr, origin: Option<&'static str>) -> (WsWrite, WsRead) {
    let mut request = format!("ws://{}/ws", addr).into_client_request().unwrap();
    if let Some(origin) = origin {
        request
            .headers_mut()
            .insert("Origin", HeaderValue::from_static(origin));
    }

    let (ws_stream, _) = connect_async(request).await.expect("Failed to connect");
    ws_stream.split()
}

/// Helper: connect, read the meta frame, return it with the stream halves
async fn ws_connect(addr: SocketAddr) -> (Value, WsWrite, WsRead) {
    let (write, mut read) = ws_open(addr, None).await;

    let meta = ws_recv(&mut read).await;
    assert_eq!(meta["type"], "meta");
    assert!(meta["sid"].is_string());
    assert!(meta["timestamp"].is_string());

    (meta, write, read)
}

/// Helper: send a JSON message over WS
async fn ws_send(write: &mut WsWrite, msg: &Value) {
    let text = serde_json::to_string(msg).unwrap();
    write.send(Message::Text(text.into())).await.unwrap();
}

/// Helper: receive the next text frame verbatim (with timeout), skipping control frames
async fn ws_recv_text(read: &mut WsRead) -> String {
    loop {
        let msg = timeout(Duration::from_secs(2), read.next())
            .await
            .expect("Timeout waiting for WS message")
            .expect("Stream ended")
            .expect("WS error");

        match msg {
            Message::Text(text) => return text.to_string(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("Expected text message, got {:?}", other),
        }
    }
}

/// Helper: receive next JSON message from WS (with timeout)
async fn ws_recv(read: &mut WsRead) -> Value {
    serde_json::from_str(&ws_recv_text(read).await).unwrap()
}

/// Helper: assert nothing else arrives for a short while
async fn ws_expect_silence(read: &mut WsRead) {
    let result = timeout(Duration::from_millis(200), async {
        loop {
            match read.next().await {
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                other => return other,
            }
        }
    })
    .await;
    assert!(result.is_err(), "Unexpected frame: {:?}", result);
}

// === Tests ===

#[tokio::test]
async fn test_ws_connect_and_meta() {
    let (addr, host) = start_test_server(HubConfig::default()).await;
    let (meta, _write, _read) = ws_connect(addr).await;

    let sid = meta["sid"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(sid).is_ok());
    assert_eq!(host.manager.connection_count().await, 1);
}

#[tokio::test]
async fn test_ws_three_client_scenario() {
    let (addr, host) = start_test_server(HubConfig::default()).await;

    let (_meta_a, mut write_a, mut read_a) = ws_connect(addr).await;
    let (meta_b, mut write_b, mut read_b) = ws_connect(addr).await;
    let (_meta_c, mut write_c, mut read_c) = ws_connect(addr).await;

    // A sets a nickname: everyone sees exactly one join notice
    ws_send(&mut write_a, &json!({"type": "nickname", "nickname": "alice"})).await;
    for read in [&mut read_a, &mut read_b, &mut read_c] {
        let notice = ws_recv(read).await;
        assert_eq!(notice["type"], "system");
        assert_eq!(notice["message"], "alice joined.");
    }

    // B chats without a nickname: everyone, B included, gets the same frame
    ws_send(&mut write_b, &json!({"type": "message", "message": "hi"})).await;
    let raw_a = ws_recv_text(&mut read_a).await;
    let raw_b = ws_recv_text(&mut read_b).await;
    let raw_c = ws_recv_text(&mut read_c).await;
    assert_eq!(raw_a, raw_b);
    assert_eq!(raw_b, raw_c);

    let frame: Value = serde_json::from_str(&raw_a).unwrap();
    assert_eq!(frame["type"], "user");
    assert_eq!(frame["user"], "User2");
    assert_eq!(frame["message"], "hi");
    assert_eq!(frame["senderSid"], meta_b["sid"]);

    // C leaves: A and B get exactly one departure notice
    write_c.send(Message::Close(None)).await.unwrap();
    for read in [&mut read_a, &mut read_b] {
        let notice = ws_recv(read).await;
        assert_eq!(notice["type"], "system");
        assert_eq!(notice["message"], "User3 left.");
    }
    ws_expect_silence(&mut read_a).await;
    ws_expect_silence(&mut read_b).await;

    assert_eq!(host.manager.connection_count().await, 2);
}

#[tokio::test]
async fn test_ws_rename_is_not_a_second_join() {
    let (addr, _host) = start_test_server(HubConfig::default()).await;
    let (_meta, mut write, mut read) = ws_connect(addr).await;

    ws_send(&mut write, &json!({"type": "nickname", "nickname": "alice"})).await;
    assert_eq!(ws_recv(&mut read).await["message"], "alice joined.");

    ws_send(&mut write, &json!({"type": "nickname", "nickname": "  alicia  "})).await;
    assert_eq!(
        ws_recv(&mut read).await["message"],
        "alice renamed to alicia."
    );

    ws_send(&mut write, &json!({"type": "message", "message": "renamed"})).await;
    assert_eq!(ws_recv(&mut read).await["user"], "alicia");
}

#[tokio::test]
async fn test_ws_malformed_frame_keeps_connections_open() {
    let (addr, host) = start_test_server(HubConfig::default()).await;
    let (_meta1, mut write1, mut read1) = ws_connect(addr).await;
    let (_meta2, _write2, mut read2) = ws_connect(addr).await;

    write1
        .send(Message::Text("{this is not json".into()))
        .await
        .unwrap();

    // Only the sender hears about it
    let error = ws_recv(&mut read1).await;
    assert_eq!(error["type"], "system");
    assert_eq!(error["message"], "Invalid message format");
    ws_expect_silence(&mut read2).await;

    // The next well-formed frame is processed normally
    ws_send(&mut write1, &json!({"type": "message", "message": "ok"})).await;
    assert_eq!(ws_recv(&mut read1).await["message"], "ok");
    assert_eq!(ws_recv(&mut read2).await["message"], "ok");

    assert_eq!(host.manager.connection_count().await, 2);
}

#[tokio::test]
async fn test_ws_meta_is_first_frame_while_others_chat() {
    let (addr, _host) = start_test_server(HubConfig::default()).await;
    let (_meta, mut chatter_write, _chatter_read) = ws_connect(addr).await;

    let chatter = tokio::spawn(async move {
        for i in 0.. {
            let frame = json!({"type": "message", "message": i.to_string()});
            if chatter_write
                .send(Message::Text(frame.to_string().into()))
                .await
                .is_err()
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    });

    for _ in 0..50 {
        let (_write, mut read) = ws_open(addr, None).await;
        let first: Value = serde_json::from_str(&ws_recv_text(&mut read).await).unwrap();
        assert_eq!(first["type"], "meta", "first frame was {}", first);
    }

    chatter.abort();
}

#[tokio::test]
async fn test_ws_binary_frames_are_routed_like_text() {
    let (addr, _host) = start_test_server(HubConfig::default()).await;
    let (meta, mut write, mut read) = ws_connect(addr).await;

    let payload = json!({"type": "message", "message": "from binary"}).to_string();
    write
        .send(Message::Binary(payload.into_bytes().into()))
        .await
        .unwrap();
    let frame = ws_recv(&mut read).await;
    assert_eq!(frame["type"], "user");
    assert_eq!(frame["message"], "from binary");
    assert_eq!(frame["senderSid"], meta["sid"]);

    write
        .send(Message::Binary(vec![0xff, 0xfe].into()))
        .await
        .unwrap();
    let error = ws_recv(&mut read).await;
    assert_eq!(error["type"], "system");
    assert_eq!(error["message"], "Invalid message format");
}

#[tokio::test]
async fn test_ws_unknown_kind_is_ignored() {
    let (addr, _host) = start_test_server(HubConfig::default()).await;
    let (_meta, mut write, mut read) = ws_connect(addr).await;

    ws_send(&mut write, &json!({"type": "typing", "active": true})).await;
    ws_expect_silence(&mut read).await;
}

#[tokio::test]
async fn test_ws_origin_gate_rejects_disallowed_origin() {
    let config = HubConfig::default().with_allowed_origins(["https://a.test"]);
    let (addr, host) = start_test_server(config).await;

    // An accepted client to observe broadcasts
    let (_write_ok, mut read_ok) = ws_open(addr, Some("https://a.test")).await;
    assert_eq!(ws_recv(&mut read_ok).await["type"], "meta");

    let (_write, mut read) = ws_open(addr, Some("https://b.test")).await;
    let msg = timeout(Duration::from_secs(2), read.next())
        .await
        .expect("Timeout waiting for close")
        .expect("Stream ended")
        .expect("WS error");

    match msg {
        Message::Close(Some(frame)) => {
            assert_eq!(u16::from(frame.code), 1008);
            assert_eq!(frame.reason.as_str(), "Origin not allowed");
        }
        other => panic!("Expected policy close, got {:?}", other),
    }

    // No session was created and nobody was told about it
    assert_eq!(host.manager.connection_count().await, 1);
    ws_expect_silence(&mut read_ok).await;
}

#[tokio::test]
async fn test_ws_origin_gate_rejects_missing_origin() {
    let config = HubConfig::default().with_allowed_origins(["https://a.test"]);
    let (addr, host) = start_test_server(config).await;

    let (_write, mut read) = ws_open(addr, None).await;
    let msg = timeout(Duration::from_secs(2), read.next())
        .await
        .expect("Timeout waiting for close")
        .expect("Stream ended")
        .expect("WS error");
    assert!(matches!(msg, Message::Close(Some(_))));
    assert_eq!(host.manager.connection_count().await, 0);
}

#[tokio::test]
async fn test_ws_heartbeat_prunes_silent_clients_only() {
    let config = HubConfig {
        heartbeat_interval_secs: 1,
        ..Default::default()
    };
    let (addr, host) = start_test_server(config).await;
    let monitor = WebSocketExposure::spawn_liveness_monitor(&host);

    // Responsive client: keeps polling, so pings are answered automatically
    let (_meta, _write_live, mut read_live) = ws_connect(addr).await;
    let (frames_tx, mut frames_rx) = tokio::sync::mpsc::unbounded_channel();
    let reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = read_live.next().await {
            if let Message::Text(text) = msg {
                let _ = frames_tx.send(text.to_string());
            }
        }
    });

    // Silent client: read the meta frame, then never poll again
    let (_meta, _write_silent, _read_silent) = ws_connect(addr).await;
    assert_eq!(host.manager.connection_count().await, 2);

    tokio::time::sleep(Duration::from_millis(3200)).await;

    assert_eq!(host.manager.connection_count().await, 1);
    let departure = frames_rx.recv().await.expect("departure notice");
    let notice: Value = serde_json::from_str(&departure).unwrap();
    assert_eq!(notice["message"], "User2 left.");

    monitor.abort();
    reader.abort();
}
