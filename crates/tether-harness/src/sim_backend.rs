//! Scripted chat backend for simulations.
//!
//! Accepts WebSocket connections on a turmoil host and answers the chat
//! protocol: `message` gets a `response`, `ping` gets a `pong` (unless pings
//! are being ignored), admin commands get their admin replies. Every frame
//! received is recorded in a [`BackendLog`] shared with the test.

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use turmoil::net::{TcpListener, TcpStream};

/// How the backend answers.
#[derive(Debug, Clone)]
pub struct BackendBehavior {
    /// Text of every `response`.
    pub reply: String,
    /// Confidence attached to every `response`.
    pub confidence: f64,
    /// Session id handed out in responses.
    pub session_id: String,
    /// Answer `ping` with `pong`.
    pub answer_pings: bool,
    /// Send a `typing` frame before each response.
    pub send_typing: bool,
    /// Delay before each response.
    pub response_delay: Duration,
}

impl Default for BackendBehavior {
    fn default() -> Self {
        Self {
            reply: "¡Hola!".to_string(),
            confidence: 0.9,
            session_id: "sim-session".to_string(),
            answer_pings: true,
            send_typing: false,
            response_delay: Duration::ZERO,
        }
    }
}

/// Frames and connections observed by the backend.
#[derive(Debug, Clone, Default)]
pub struct BackendLog {
    inner: Arc<Mutex<LogInner>>,
}

#[derive(Debug, Default)]
struct LogInner {
    frames: Vec<Value>,
    connections: usize,
}

impl BackendLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, frame: Value) {
        self.lock().frames.push(frame);
    }

    /// Every frame received, in arrival order.
    pub fn frames(&self) -> Vec<Value> {
        self.lock().frames.clone()
    }

    /// `type` of every frame received.
    pub fn kinds(&self) -> Vec<String> {
        self.frames().iter().filter_map(|f| f["type"].as_str().map(str::to_string)).collect()
    }

    /// `message` of every chat frame received.
    pub fn messages(&self) -> Vec<String> {
        self.frames()
            .iter()
            .filter(|f| f["type"] == "message")
            .filter_map(|f| f["message"].as_str().map(str::to_string))
            .collect()
    }

    /// WebSocket connections accepted.
    pub fn connections(&self) -> usize {
        self.lock().connections
    }
}

/// A backend bound to one port of the current turmoil host.
#[derive(Debug, Clone)]
pub struct SimBackend {
    behavior: BackendBehavior,
    log: BackendLog,
}

impl SimBackend {
    /// Backend with `behavior`, recording into `log`.
    pub fn new(behavior: BackendBehavior, log: BackendLog) -> Self {
        Self { behavior, log }
    }

    /// Accept connections on `port` forever.
    pub async fn serve(self, port: u16) -> std::io::Result<()> {
        let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
        loop {
            let (stream, peer) = listener.accept().await?;
            tracing::debug!(%peer, "backend accepted");
            let backend = self.clone();
            tokio::spawn(async move {
                if let Err(error) = backend.session(stream).await {
                    tracing::debug!(%peer, %error, "backend session ended");
                }
            });
        }
    }

    async fn session(self, stream: TcpStream) -> Result<(), tokio_tungstenite::tungstenite::Error> {
        let mut ws = accept_async(stream).await?;
        self.log.lock().connections += 1;

        while let Some(message) = ws.next().await {
            let text = match message? {
                Message::Text(text) => text,
                Message::Close(_) => {
                    // Flushes the echoed close frame.
                    let _ = ws.close(None).await;
                    break;
                },
                _ => continue,
            };
            let Ok(frame) = serde_json::from_str::<Value>(text.as_str()) else {
                continue;
            };
            let replies = self.replies(&frame);
            self.log.record(frame);

            for reply in replies {
                if reply["type"] == "response" && !self.behavior.response_delay.is_zero() {
                    tokio::time::sleep(self.behavior.response_delay).await;
                }
                ws.send(Message::text(reply.to_string())).await?;
            }
        }
        Ok(())
    }

    fn replies(&self, frame: &Value) -> Vec<Value> {
        let behavior = &self.behavior;
        match frame["type"].as_str() {
            Some("message") => {
                let mut replies = Vec::new();
                if behavior.send_typing {
                    replies.push(json!({"type": "typing", "is_typing": true}));
                }
                replies.push(json!({
                    "type": "response",
                    "message": behavior.reply,
                    "confidence": behavior.confidence,
                    "session_id": frame["session_id"].as_str().unwrap_or(&behavior.session_id),
                    "context": {"intent": "greeting"},
                    "timestamp": "2026-01-01T00:00:00",
                }));
                replies
            },
            Some("ping") if behavior.answer_pings => vec![json!({"type": "pong"})],
            Some("context_update") => vec![json!({"type": "context_updated"})],
            Some("admin_command") => match frame["command"].as_str() {
                Some("get_stats") => vec![json!({
                    "type": "admin_stats",
                    "stats": {"active_connections": self.log.connections(), "total_sessions": 1},
                })],
                Some("get_connections") => vec![json!({
                    "type": "connection_stats",
                    "connections": [{"session_id": behavior.session_id}],
                })],
                Some("broadcast") => vec![json!({"type": "broadcast_sent"})],
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }
}
