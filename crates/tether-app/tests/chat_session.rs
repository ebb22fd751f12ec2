//! App, bridge and channel driver against a loopback WebSocket server.

use std::{sync::Arc, time::Duration};

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tether_app::{
    App, AppAction, AppEvent, Bridge, ChannelRole, LinkStatus, MemoryStorage, Storage,
};
use tether_client::{ChannelDriver, TcpDialer, TokioEnv};
use tether_core::{Channel, ChannelEvent, ConnectionConfig, EventBus};
use tether_proto::Role;
use tokio::{net::TcpListener, sync::mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};

async fn spawn_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut ws = accept_async(stream).await.unwrap();
                while let Some(Ok(Message::Text(text))) = ws.next().await {
                    let frame: Value = serde_json::from_str(text.as_str()).unwrap();
                    if frame["type"] == "message" {
                        let reply = json!({
                            "type": "response",
                            "message": "¡Hola!",
                            "confidence": 0.9,
                            "session_id": "s1",
                            "timestamp": "2026-01-01T12:00:00"
                        });
                        ws.send(Message::text(reply.to_string())).await.unwrap();
                    }
                }
            });
        }
    });

    format!("ws://{addr}")
}

/// Feed events through the app until `done` holds.
async fn pump<F>(
    app: &mut App<TokioEnv, MemoryStorage>,
    bridge: &Bridge,
    events: &mut mpsc::UnboundedReceiver<AppEvent>,
    done: F,
) where
    F: Fn(&App<TokioEnv, MemoryStorage>) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done(app) {
            let event = events.recv().await.unwrap();
            for action in app.handle(event) {
                bridge.execute(action);
            }
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn hola_round_trip_appends_assistant_entry() {
    let url = spawn_backend().await;
    let bus = Arc::new(EventBus::new());
    let chat = ChannelDriver::spawn(
        TokioEnv,
        TcpDialer,
        Channel::chat(&url),
        ConnectionConfig::default(),
        bus,
    );

    let (events_tx, mut events) = mpsc::unbounded_channel();
    let bridge = Bridge::new(chat, events_tx);
    bridge.subscribe();

    let mut app = App::new(TokioEnv, MemoryStorage::new());
    for action in app.handle(AppEvent::Connect) {
        bridge.execute(action);
    }
    pump(&mut app, &bridge, &mut events, |app| {
        app.conversation().link() == LinkStatus::Connected
    })
    .await;

    let actions = app.handle(AppEvent::Submit("hola".into()));
    assert!(matches!(actions[0], AppAction::Send(_)));
    for action in actions {
        bridge.execute(action);
    }
    assert!(app.conversation().is_assistant_typing());

    pump(&mut app, &bridge, &mut events, |app| app.conversation().messages().len() == 2).await;

    let reply = &app.conversation().messages()[1];
    assert_eq!(reply.role, Role::Assistant);
    assert_eq!(reply.content, "¡Hola!");
    assert_eq!(reply.confidence, Some(0.9));
    assert!(!app.conversation().is_assistant_typing());
    assert_eq!(app.conversation().session_id(), Some("s1"));

    let stored = app.storage().get("chatbot-conversations").unwrap().unwrap();
    let stored: Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(stored[0]["title"], "hola");
    assert_eq!(stored[0]["preview"], "¡Hola!");
    assert_eq!(stored[0]["messageCount"], 2);
}

#[tokio::test]
async fn history_without_http_endpoint_fails_softly() {
    let bus = Arc::new(EventBus::new());
    let chat = ChannelDriver::spawn(
        TokioEnv,
        TcpDialer,
        Channel::chat("ws://127.0.0.1:9"),
        ConnectionConfig::default(),
        bus,
    );
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let bridge = Bridge::new(chat, events_tx);

    let mut app = App::new(TokioEnv, MemoryStorage::new()).with_session("s1");
    for action in app.handle(AppEvent::LoadHistory) {
        bridge.execute(action);
    }

    let event = events.recv().await.unwrap();
    assert!(matches!(event, AppEvent::HistoryFailed(_)));
    app.handle(event);
    assert_eq!(app.conversation().notifications().len(), 1);
}

#[tokio::test]
async fn bridge_tags_events_with_their_channel() {
    let url = spawn_backend().await;
    let spawn = |channel| {
        ChannelDriver::spawn(
            TokioEnv,
            TcpDialer,
            channel,
            ConnectionConfig::default(),
            Arc::new(EventBus::new()),
        )
    };
    let chat = spawn(Channel::chat(&url));
    let admin = spawn(Channel::admin(&url));

    let (events_tx, mut events) = mpsc::unbounded_channel();
    let bridge = Bridge::new(chat, events_tx).with_admin(admin);
    bridge.subscribe();
    bridge.execute(AppAction::Connect);

    let mut connected = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        while connected.len() < 2 {
            if let AppEvent::Channel { role, event: ChannelEvent::Connected } =
                events.recv().await.unwrap()
            {
                connected.push(role);
            }
        }
    })
    .await
    .unwrap();

    connected.sort_by_key(|role| *role == ChannelRole::Admin);
    assert_eq!(connected, vec![ChannelRole::Chat, ChannelRole::Admin]);
}
