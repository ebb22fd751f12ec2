//! Channel driver: runs one [`Connection`] against real sockets.
//!
//! The driver task is the only owner of the connection. It multiplexes three
//! inputs with `select!`:
//!
//! - commands from [`ChannelHandle`]s
//! - epoch-tagged reports from the current socket task
//! - the connection's next deadline (reconnect, connect timeout, heartbeat)
//!
//! and executes every [`ConnectionAction`] the connection returns: dials
//! spawn a socket task, aborts cancel it, emits go to the [`EventBus`].

use std::sync::Arc;

use tether_core::{
    Channel, Connection, ConnectionAction, ConnectionConfig, ConnectionState, Environment, EventBus,
    SendReceipt,
};
use tether_proto::OutboundPayload;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    dialer::Dialer,
    handle::ChannelHandle,
    sink::WsSink,
    socket::{SocketEvent, run_socket},
};

/// Requests from handles to the driver task.
#[derive(Debug)]
pub(crate) enum Command {
    Connect,
    Disconnect,
    Send { payload: OutboundPayload, receipt: Option<oneshot::Sender<SendReceipt>> },
    Reconfigure(ConnectionConfig),
    Status(oneshot::Sender<ChannelStatus>),
}

/// Point-in-time view of a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStatus {
    /// Connection state.
    pub state: ConnectionState,
    /// Reconnect attempts since the last open.
    pub attempts: u32,
    /// Envelopes waiting in the outbound queue.
    pub queued: usize,
    /// Current socket epoch.
    pub epoch: u64,
    /// Whether unintentional closes trigger reconnection.
    pub reconnect_enabled: bool,
}

/// Owns a [`Connection`] and drives it from a tokio task.
pub struct ChannelDriver<E: Environment, D: Dialer> {
    env: E,
    dialer: D,
    connection: Connection<E, WsSink>,
    bus: Arc<EventBus>,
    commands: mpsc::UnboundedReceiver<Command>,
    socket_tx: mpsc::UnboundedSender<SocketEvent>,
    socket_rx: mpsc::UnboundedReceiver<SocketEvent>,
    /// Socket task for the current epoch, if any.
    socket: Option<(u64, JoinHandle<()>)>,
}

impl<E: Environment, D: Dialer> ChannelDriver<E, D> {
    /// Create a driver and the handle that controls it.
    ///
    /// The driver does nothing until [`Self::run`] is polled.
    pub fn new(
        env: E,
        dialer: D,
        channel: Channel,
        config: ConnectionConfig,
        bus: Arc<EventBus>,
    ) -> (Self, ChannelHandle) {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (socket_tx, socket_rx) = mpsc::unbounded_channel();
        let handle = ChannelHandle::new(channel.name.clone(), commands_tx, Arc::clone(&bus));
        let connection = Connection::new(env.clone(), channel, config);

        let driver =
            Self { env, dialer, connection, bus, commands, socket_tx, socket_rx, socket: None };
        (driver, handle)
    }

    /// Spawn the driver on the current tokio runtime and return its handle.
    pub fn spawn(
        env: E,
        dialer: D,
        channel: Channel,
        config: ConnectionConfig,
        bus: Arc<EventBus>,
    ) -> ChannelHandle {
        let (driver, handle) = Self::new(env, dialer, channel, config, bus);
        tokio::spawn(driver.run());
        handle
    }

    /// Run until every handle has been dropped.
    ///
    /// On exit the connection is closed cleanly.
    pub async fn run(mut self) {
        tracing::debug!(channel = %self.connection.channel().name, "driver started");

        loop {
            let deadline = self.connection.next_deadline();
            let env = self.env.clone();
            let timer = async move {
                match deadline {
                    Some(at) => env.sleep(at.saturating_duration_since(env.now())).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = self.socket_rx.recv() => self.handle_socket_event(event),
                () = timer => {
                    let actions = self.connection.tick();
                    self.execute(actions);
                },
            }
        }

        let actions = self.connection.disconnect();
        self.execute(actions);
        // Detached, not aborted: the socket task finishes the close handshake.
        self.socket = None;
        tracing::debug!(channel = %self.connection.channel().name, "driver stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect => {
                let actions = self.connection.connect();
                self.execute(actions);
            },
            Command::Disconnect => {
                let actions = self.connection.disconnect();
                self.execute(actions);
            },
            Command::Send { payload, receipt } => {
                let sent = self.connection.send(payload);
                if let Some(reply) = receipt {
                    let _ = reply.send(sent);
                }
            },
            Command::Reconfigure(config) => self.connection.reconfigure(config),
            Command::Status(reply) => {
                let _ = reply.send(self.status());
            },
        }
    }

    fn handle_socket_event(&mut self, event: SocketEvent) {
        let actions = match event {
            SocketEvent::Opened { epoch, sink } => self.connection.handle_open(epoch, sink),
            SocketEvent::Frame { epoch, text } => self.connection.handle_frame(epoch, &text),
            SocketEvent::Closed { epoch, code, reason } => {
                self.connection.handle_closed(epoch, code, &reason)
            },
            SocketEvent::DialFailed { epoch, reason } => {
                self.connection.handle_dial_failed(epoch, &reason)
            },
        };
        self.execute(actions);
    }

    fn execute(&mut self, actions: Vec<ConnectionAction>) {
        for action in actions {
            match action {
                ConnectionAction::Dial { epoch, endpoint } => {
                    self.abort_socket();
                    let task = tokio::spawn(run_socket(
                        self.dialer.clone(),
                        endpoint,
                        epoch,
                        self.socket_tx.clone(),
                    ));
                    self.socket = Some((epoch, task));
                },
                ConnectionAction::AbortDial { epoch } => {
                    if self.socket.as_ref().is_some_and(|(current, _)| *current == epoch) {
                        self.abort_socket();
                    }
                },
                ConnectionAction::Emit(event) => {
                    let delivered = self.bus.emit(&event);
                    tracing::trace!(
                        channel = %self.connection.channel().name,
                        kind = %event.kind(),
                        delivered,
                        "event emitted"
                    );
                },
            }
        }
    }

    fn abort_socket(&mut self) {
        if let Some((epoch, task)) = self.socket.take() {
            tracing::debug!(channel = %self.connection.channel().name, epoch, "aborting socket task");
            task.abort();
        }
    }

    fn status(&self) -> ChannelStatus {
        ChannelStatus {
            state: self.connection.state(),
            attempts: self.connection.attempts(),
            queued: self.connection.queue().len(),
            epoch: self.connection.epoch(),
            reconnect_enabled: self.connection.reconnect_enabled(),
        }
    }
}

impl<E: Environment, D: Dialer> std::fmt::Debug for ChannelDriver<E, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelDriver")
            .field("connection", &self.connection)
            .field("socket_epoch", &self.socket.as_ref().map(|(epoch, _)| *epoch))
            .finish_non_exhaustive()
    }
}
