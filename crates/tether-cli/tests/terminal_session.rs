//! Scripted terminal sessions against an offline channel.

use std::sync::Arc;

use tether_app::{App, Bridge, MemoryStorage};
use tether_cli::Terminal;
use tether_client::{ChannelDriver, TcpDialer, TokioEnv};
use tether_core::{Channel, ConnectionConfig, EventBus};
use tokio::sync::mpsc;

async fn run_script(script: &str) -> String {
    let chat = ChannelDriver::spawn(
        TokioEnv,
        TcpDialer,
        Channel::chat("ws://127.0.0.1:9"),
        ConnectionConfig::default(),
        Arc::new(EventBus::new()),
    );
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let bridge = Bridge::new(chat, events_tx);
    bridge.subscribe();

    let app = App::new(TokioEnv, MemoryStorage::new());
    let out = Terminal::new(app, bridge, events_rx, Vec::new())
        .run(script.as_bytes())
        .await
        .unwrap();
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn local_commands_print_without_a_connection() {
    let out = run_script("/help\n/bogus\n/conversations\n/stats\n/quit\n").await;

    assert!(out.starts_with("tether chat, type /help for commands\n"));
    assert!(out.contains("Commands:"));
    assert!(out.contains("unknown command /bogus, type /help"));
    assert!(out.contains("no saved conversations"));
    assert!(out.contains("no HTTP endpoint configured"));
}

#[tokio::test]
async fn messages_and_settings_render_while_offline() {
    let out = run_script("/theme dark\n\nhola\n/quit\n").await;

    assert!(out.contains("Theme set to dark"));
    assert!(out.contains("] you: hola"));
}

#[tokio::test]
async fn end_of_input_quits() {
    let out = run_script("hola\n").await;
    assert!(out.contains("] you: hola"));
}
