//! Cloneable control surface for a running channel.

use std::sync::Arc;

use serde_json::{Map, Value};
use tether_core::{ConnectionConfig, EventBus, EventKind, Listener, SendReceipt};
use tether_proto::OutboundPayload;
use tokio::sync::{mpsc, oneshot};

use crate::{
    driver::{ChannelStatus, Command},
    error::DriverStopped,
};

/// Handle to a channel driver task.
///
/// Every method is non-blocking: commands are queued to the driver and
/// processed in order. Fire-and-forget methods never fail; if the driver has
/// stopped the command is logged and dropped.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    name: String,
    commands: mpsc::UnboundedSender<Command>,
    bus: Arc<EventBus>,
}

impl ChannelHandle {
    pub(crate) fn new(
        name: String,
        commands: mpsc::UnboundedSender<Command>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self { name, commands, bus }
    }

    /// Channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bus this channel emits on.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Register a listener on this channel's bus.
    pub fn on(&self, kind: EventKind, listener: Listener) {
        self.bus.on(kind, listener);
    }

    /// Whether the driver task is still accepting commands.
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Start connecting. No-op unless disconnected.
    pub fn connect(&self) {
        self.submit(Command::Connect);
    }

    /// Close cleanly and stop reconnecting.
    pub fn disconnect(&self) {
        self.submit(Command::Disconnect);
    }

    /// Replace the connection configuration.
    pub fn reconfigure(&self, config: ConnectionConfig) {
        self.submit(Command::Reconfigure(config));
    }

    /// Send a payload, queueing it if the channel is not open.
    pub fn send(&self, payload: OutboundPayload) {
        self.submit(Command::Send { payload, receipt: None });
    }

    /// Send a payload and wait for the driver to report what happened to it.
    pub async fn send_with_receipt(
        &self,
        payload: OutboundPayload,
    ) -> Result<SendReceipt, DriverStopped> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Send { payload, receipt: Some(tx) })
            .map_err(|_| self.stopped())?;
        rx.await.map_err(|_| self.stopped())
    }

    /// Snapshot of the connection.
    pub async fn status(&self) -> Result<ChannelStatus, DriverStopped> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(Command::Status(tx)).map_err(|_| self.stopped())?;
        rx.await.map_err(|_| self.stopped())
    }

    /// Tell the backend whether the user is typing.
    pub fn send_typing(&self, is_typing: bool, user_id: Option<String>) {
        self.send(OutboundPayload::Typing { is_typing, user_id });
    }

    /// Push session context to the backend.
    pub fn update_context(
        &self,
        session_id: Option<String>,
        preferences: Option<Value>,
        topics: Option<Vec<String>>,
        personality: Option<Value>,
    ) {
        self.send(OutboundPayload::ContextUpdate {
            session_id,
            preferences,
            topics,
            personality,
        });
    }

    /// Admin: request server statistics (`admin_stats`).
    pub fn get_stats(&self) {
        self.send(OutboundPayload::admin("get_stats"));
    }

    /// Admin: request the connection list (`connection_stats`).
    pub fn get_connections(&self) {
        self.send(OutboundPayload::admin("get_connections"));
    }

    /// Admin: broadcast `message` to every connected client (`broadcast_sent`).
    pub fn broadcast(&self, message: impl Into<String>) {
        let mut extra = Map::new();
        extra.insert("message".to_string(), Value::String(message.into()));
        self.send(OutboundPayload::AdminCommand { command: "broadcast".to_string(), extra });
    }

    fn submit(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::warn!(channel = %self.name, "driver stopped, command dropped");
        }
    }

    fn stopped(&self) -> DriverStopped {
        DriverStopped { channel: self.name.clone() }
    }
}
