//! Channel driver against a loopback WebSocket server.

use std::{sync::Arc, time::Duration};

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tether_client::{ChannelDriver, ChannelHandle, TcpDialer, TokioEnv};
use tether_core::{
    Channel, ChannelEvent, ConnectionConfig, ConnectionState, EventBus, EventKind,
    ReconnectPolicy, listener,
};
use tether_proto::{CloseCode, OutboundPayload};
use tokio::{net::TcpListener, sync::mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Echo-style backend: answers chat messages and pings, reports every frame
/// it receives.
async fn spawn_backend() -> (String, mpsc::UnboundedReceiver<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let seen = seen_tx.clone();
            tokio::spawn(async move {
                let mut ws = accept_async(stream).await.unwrap();
                while let Some(Ok(message)) = ws.next().await {
                    match message {
                        Message::Text(text) => {
                            let frame: Value = serde_json::from_str(text.as_str()).unwrap();
                            let reply = match frame["type"].as_str() {
                                Some("message") => Some(json!({
                                    "type": "response",
                                    "message": "¡Hola!",
                                    "confidence": 0.9,
                                    "session_id": "s1"
                                })),
                                Some("ping") => Some(json!({"type": "pong"})),
                                _ => None,
                            };
                            let _ = seen.send(frame);
                            if let Some(reply) = reply {
                                ws.send(Message::text(reply.to_string())).await.unwrap();
                            }
                        },
                        Message::Close(_) => {
                            let _ = ws.close(None).await;
                            break;
                        },
                        _ => {},
                    }
                }
            });
        }
    });

    (format!("ws://{addr}"), seen_rx)
}

fn start(url: &str, config: ConnectionConfig) -> (ChannelHandle, mpsc::UnboundedReceiver<ChannelEvent>) {
    let bus = Arc::new(EventBus::new());
    let (tx, rx) = mpsc::unbounded_channel();
    for kind in [
        EventKind::Connected,
        EventKind::Disconnected,
        EventKind::Message,
        EventKind::Error,
        EventKind::Reconnecting,
        EventKind::MaxReconnectAttempts,
    ] {
        let tx = tx.clone();
        bus.on(
            kind,
            listener(move |event| {
                let _ = tx.send(event.clone());
                Ok(())
            }),
        );
    }

    let handle = ChannelDriver::spawn(TokioEnv, TcpDialer, Channel::chat(url), config, bus);
    (handle, rx)
}

async fn wait_for(events: &mut mpsc::UnboundedReceiver<ChannelEvent>, kind: EventKind) -> ChannelEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.unwrap();
            if event.kind() == kind {
                return event;
            }
        }
    })
    .await
    .unwrap()
}

async fn next_seen(seen: &mut mpsc::UnboundedReceiver<Value>) -> Value {
    tokio::time::timeout(Duration::from_secs(5), seen.recv()).await.unwrap().unwrap()
}

#[tokio::test]
async fn message_round_trip_reaches_listeners() {
    let (url, mut seen) = spawn_backend().await;
    let (handle, mut events) = start(&url, ConnectionConfig::default());

    handle.connect();
    wait_for(&mut events, EventKind::Connected).await;

    handle.send(OutboundPayload::message("hola", Some("s1".into()), vec![]));

    let sent = next_seen(&mut seen).await;
    assert_eq!(sent["type"], "message");
    assert_eq!(sent["message"], "hola");
    assert!(sent["id"].as_str().unwrap().starts_with("msg_"));

    let reply = wait_for(&mut events, EventKind::Message).await;
    let frame = reply.frame().unwrap();
    assert_eq!(frame.text(), Some("¡Hola!"));
    assert_eq!(frame.confidence(), Some(0.9));
}

#[tokio::test]
async fn offline_sends_flush_in_order_before_new_sends() {
    let (url, mut seen) = spawn_backend().await;
    let (handle, mut events) = start(&url, ConnectionConfig::default());

    for text in ["one", "two", "three"] {
        handle.send(OutboundPayload::message(text, None, vec![]));
    }
    assert_eq!(handle.status().await.unwrap().queued, 3);

    handle.connect();
    handle.send(OutboundPayload::message("four", None, vec![]));
    wait_for(&mut events, EventKind::Connected).await;

    let mut order = Vec::new();
    for _ in 0..4 {
        order.push(next_seen(&mut seen).await["message"].as_str().unwrap().to_string());
    }
    assert_eq!(order, vec!["one", "two", "three", "four"]);
    assert_eq!(handle.status().await.unwrap().queued, 0);
}

#[tokio::test]
async fn disconnect_closes_cleanly_without_reconnecting() {
    let (url, _seen) = spawn_backend().await;
    let (handle, mut events) = start(&url, ConnectionConfig::default());

    handle.connect();
    wait_for(&mut events, EventKind::Connected).await;
    handle.disconnect();

    match wait_for(&mut events, EventKind::Disconnected).await {
        ChannelEvent::Disconnected { code, .. } => assert_eq!(code, CloseCode::NORMAL),
        other => panic!("unexpected {other:?}"),
    }

    let status = handle.status().await.unwrap();
    assert_eq!(status.state, ConnectionState::Disconnected);
    assert!(!status.reconnect_enabled);
}

#[tokio::test]
async fn refused_dials_exhaust_reconnects() {
    // Bind then drop to get a port nothing listens on.
    let addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
    let config = ConnectionConfig {
        reconnect: ReconnectPolicy {
            base_delay: Duration::from_millis(10),
            multiplier: 2,
            max_attempts: 2,
        },
        ..ConnectionConfig::default()
    };
    let (handle, mut events) = start(&format!("ws://{addr}"), config);

    handle.connect();
    wait_for(&mut events, EventKind::Error).await;
    match wait_for(&mut events, EventKind::MaxReconnectAttempts).await {
        ChannelEvent::ReconnectExhausted { attempts } => assert_eq!(attempts, 2),
        other => panic!("unexpected {other:?}"),
    }

    let status = handle.status().await.unwrap();
    assert_eq!(status.state, ConnectionState::Disconnected);
    assert_eq!(status.attempts, 2);
}
