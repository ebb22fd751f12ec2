//! Connection state machine for one Tether channel.
//!
//! This module implements the resilience layer: connection lifecycle,
//! reconnection with exponential backoff, heartbeat liveness detection and
//! outbound queueing during outages.
//!
//! # Architecture: Action-Based State Machine
//!
//! - Time and randomness come from the [`Environment`]
//! - The open socket's write half is a [`FrameSink`] owned by the connection
//!   while (and only while) it is open
//! - Everything else is returned as [`ConnectionAction`]s for the driver to
//!   execute (dial, abort a dial, emit an event)
//!
//! No method ever returns an error. Failures are reported as events or
//! absorbed by queueing.
//!
//! # State Machine
//!
//! ```text
//!                 connect()                 opened
//! ┌──────────────┐ ───────> ┌────────────┐ ───────> ┌──────┐
//! │ Disconnected │          │ Connecting │          │ Open │
//! └──────────────┘ <─────── └────────────┘          └──────┘
//!     ^    ^      failure/timeout                     │  │
//!     │    │                                          │  │ disconnect()
//!     │    └──────────── remote close / heartbeat ────┘  ↓
//!     │                                             ┌─────────┐
//!     └──────────────── close completes ─────────── │ Closing │
//!                                                   └─────────┘
//! ```
//!
//! # Socket epochs
//!
//! Every dial gets a fresh epoch. The driver tags socket events with the
//! epoch they belong to and the connection ignores events from any other
//! epoch, so a late close or frame from an abandoned socket can never
//! disturb the current one.

use std::time::{Duration, Instant};

use tether_proto::{CloseCode, Envelope, InboundFrame, OutboundPayload};

use crate::{
    backoff::ReconnectPolicy,
    channel::Channel,
    env::Environment,
    event::{ChannelEvent, EventKind},
    heartbeat::{Heartbeat, HeartbeatPoll},
    queue::{DEFAULT_CAPACITY, OutboundQueue},
    transport::FrameSink,
};

/// Actions returned by the connection state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionAction {
    /// Open a socket to `endpoint`. Report the outcome with `epoch`.
    Dial {
        /// Epoch of the new socket.
        epoch: u64,
        /// WebSocket URL.
        endpoint: String,
    },

    /// Abandon the dial started for `epoch`.
    AbortDial {
        /// Epoch of the abandoned dial.
        epoch: u64,
    },

    /// Deliver this event to listeners.
    Emit(ChannelEvent),
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket.
    Disconnected,
    /// Dial in flight.
    Connecting,
    /// Socket open, heartbeat running.
    Open,
    /// Intentional close requested, waiting for the socket to finish.
    Closing,
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Time between liveness pings while open.
    pub heartbeat_interval: Duration,
    /// Time allowed for a ping to be acknowledged.
    pub heartbeat_timeout: Duration,
    /// Time allowed for a dial to complete.
    pub connect_timeout: Duration,
    /// Reconnect backoff.
    pub reconnect: ReconnectPolicy,
    /// Outbound queue capacity.
    pub queue_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            heartbeat_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(30),
            reconnect: ReconnectPolicy::default(),
            queue_capacity: DEFAULT_CAPACITY,
        }
    }
}

/// What happened to a sent payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the open socket.
    Sent,
    /// Queued for the next open.
    Queued,
    /// Queued; the queue was full and the oldest envelope was dropped.
    QueuedWithEviction {
        /// Id of the evicted envelope.
        evicted: String,
    },
    /// The payload could not be encoded and was discarded.
    Dropped,
}

/// Result of [`Connection::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// Generated envelope id.
    pub id: String,
    /// Disposition of the envelope.
    pub delivery: Delivery,
}

/// Connection state machine
///
/// Manages lifecycle, reconnection, heartbeat and queueing for a single
/// logical channel.
pub struct Connection<E: Environment, S: FrameSink> {
    env: E,
    channel: Channel,
    config: ConnectionConfig,
    state: ConnectionState,
    /// Epoch of the current (or most recent) socket.
    epoch: u64,
    /// Write half of the open socket. `Some` only while `Open`.
    sink: Option<S>,
    /// Reconnect attempts since the last successful open.
    attempts: u32,
    /// Cleared by `disconnect()`, restored by `connect()`/`reconfigure()`.
    reconnect_enabled: bool,
    /// Set once exhaustion has been reported, until re-armed.
    exhaustion_reported: bool,
    /// `connect()` arrived while closing; dial once the close completes.
    pending_connect: bool,
    reconnect_at: Option<Instant>,
    dial_deadline: Option<Instant>,
    heartbeat: Heartbeat,
    queue: OutboundQueue,
}

impl<E: Environment, S: FrameSink> Connection<E, S> {
    /// Create a disconnected connection for `channel`.
    pub fn new(env: E, channel: Channel, config: ConnectionConfig) -> Self {
        let heartbeat = Heartbeat::new(config.heartbeat_interval, config.heartbeat_timeout);
        let queue = OutboundQueue::new(config.queue_capacity);
        Self {
            env,
            channel,
            config,
            state: ConnectionState::Disconnected,
            epoch: 0,
            sink: None,
            attempts: 0,
            reconnect_enabled: true,
            exhaustion_reported: false,
            pending_connect: false,
            reconnect_at: None,
            dial_deadline: None,
            heartbeat,
            queue,
        }
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Epoch of the current socket.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Reconnect attempts since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether an unintentional close will trigger reconnection.
    pub fn reconnect_enabled(&self) -> bool {
        self.reconnect_enabled
    }

    /// The channel this connection serves.
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Active configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Outbound queue.
    pub fn queue(&self) -> &OutboundQueue {
        &self.queue
    }

    /// When the next scheduled reconnect fires, if one is pending.
    pub fn reconnect_at(&self) -> Option<Instant> {
        self.reconnect_at
    }

    /// Earliest instant at which [`Self::tick`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            ConnectionState::Disconnected => self.reconnect_at,
            ConnectionState::Connecting => self.dial_deadline,
            ConnectionState::Open => self.heartbeat.next_deadline(),
            ConnectionState::Closing => None,
        }
    }

    /// Start connecting.
    ///
    /// No-op while connecting or open. While closing, the dial is deferred
    /// until the close completes. An explicit connect re-enables reconnection
    /// and re-arms the exhaustion report; it does not reset the attempt
    /// counter, only a successful open does.
    pub fn connect(&mut self) -> Vec<ConnectionAction> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Open => {
                tracing::debug!(channel = %self.channel.name, state = ?self.state, "connect ignored");
                Vec::new()
            },
            ConnectionState::Closing => {
                tracing::debug!(channel = %self.channel.name, epoch = self.epoch, "connect deferred until close completes");
                self.reconnect_enabled = true;
                self.exhaustion_reported = false;
                self.pending_connect = true;
                Vec::new()
            },
            ConnectionState::Disconnected => {
                self.reconnect_enabled = true;
                self.exhaustion_reported = false;
                self.begin_dial()
            },
        }
    }

    /// Request a clean close and disable reconnection.
    pub fn disconnect(&mut self) -> Vec<ConnectionAction> {
        self.reconnect_enabled = false;
        self.pending_connect = false;
        self.attempts = self.config.reconnect.max_attempts;
        self.reconnect_at = None;
        self.dial_deadline = None;
        self.heartbeat.stop();

        match self.state {
            ConnectionState::Open => {
                tracing::info!(channel = %self.channel.name, epoch = self.epoch, "closing");
                self.state = ConnectionState::Closing;
                if let Some(mut sink) = self.sink.take() {
                    sink.close(CloseCode::NORMAL, "client disconnect");
                }
                Vec::new()
            },
            ConnectionState::Connecting => {
                tracing::info!(channel = %self.channel.name, epoch = self.epoch, "dial abandoned");
                self.enter_disconnected();
                vec![
                    ConnectionAction::AbortDial { epoch: self.epoch },
                    ConnectionAction::Emit(ChannelEvent::Disconnected {
                        code: CloseCode::NORMAL,
                        reason: "client disconnect".to_string(),
                    }),
                ]
            },
            ConnectionState::Closing | ConnectionState::Disconnected => Vec::new(),
        }
    }

    /// Replace the configuration.
    ///
    /// Resets the attempt counter and re-enables reconnection. Shrinking the
    /// queue evicts the oldest envelopes.
    pub fn reconfigure(&mut self, config: ConnectionConfig) {
        self.heartbeat.set_timings(config.heartbeat_interval, config.heartbeat_timeout);
        let evicted = self.queue.set_capacity(config.queue_capacity);
        if evicted > 0 {
            tracing::warn!(channel = %self.channel.name, evicted, "queue shrunk, envelopes dropped");
        }

        self.config = config;
        self.attempts = 0;
        self.reconnect_enabled = true;
        self.exhaustion_reported = false;
    }

    /// Stamp and send a payload.
    ///
    /// Transmits immediately when open, otherwise queues. A failed transmit
    /// also queues. Never blocks, never fails.
    pub fn send(&mut self, payload: OutboundPayload) -> SendReceipt {
        let envelope = self.stamp(payload);
        let id = envelope.id.clone();

        if self.state == ConnectionState::Open {
            if let Some(sink) = self.sink.as_mut() {
                let text = match envelope.encode() {
                    Ok(text) => text,
                    Err(error) => {
                        tracing::warn!(channel = %self.channel.name, %id, %error, "dropping unencodable payload");
                        return SendReceipt { id, delivery: Delivery::Dropped };
                    },
                };

                match sink.transmit(text) {
                    Ok(()) => return SendReceipt { id, delivery: Delivery::Sent },
                    Err(error) => {
                        tracing::warn!(channel = %self.channel.name, %id, %error, "transmit failed, queueing");
                    },
                }
            }
        }

        let delivery = self.enqueue(envelope);
        SendReceipt { id, delivery }
    }

    /// The dial for `epoch` completed.
    pub fn handle_open(&mut self, epoch: u64, mut sink: S) -> Vec<ConnectionAction> {
        if epoch != self.epoch || self.state != ConnectionState::Connecting {
            tracing::debug!(channel = %self.channel.name, epoch, "closing socket from abandoned dial");
            sink.close(CloseCode::NORMAL, "superseded");
            return Vec::new();
        }

        let now = self.env.now();
        self.state = ConnectionState::Open;
        self.attempts = 0;
        self.exhaustion_reported = false;
        self.dial_deadline = None;
        self.heartbeat.start(now);
        self.sink = Some(sink);

        let flushed = self.flush_queue();
        tracing::info!(
            channel = %self.channel.name,
            epoch,
            flushed,
            queued = self.queue.len(),
            "connected"
        );

        vec![ConnectionAction::Emit(ChannelEvent::Connected)]
    }

    /// The dial for `epoch` failed.
    pub fn handle_dial_failed(&mut self, epoch: u64, reason: &str) -> Vec<ConnectionAction> {
        if epoch != self.epoch || self.state != ConnectionState::Connecting {
            return Vec::new();
        }
        self.fail_dial(reason)
    }

    /// The socket for `epoch` closed.
    pub fn handle_closed(
        &mut self,
        epoch: u64,
        code: CloseCode,
        reason: &str,
    ) -> Vec<ConnectionAction> {
        if epoch != self.epoch || self.state == ConnectionState::Disconnected {
            tracing::debug!(channel = %self.channel.name, epoch, %code, "ignoring stale close");
            return Vec::new();
        }

        let was_closing = self.state == ConnectionState::Closing;
        self.enter_disconnected();
        tracing::info!(channel = %self.channel.name, epoch, %code, reason, "disconnected");

        let mut actions = vec![ConnectionAction::Emit(ChannelEvent::Disconnected {
            code,
            reason: reason.to_string(),
        })];

        if was_closing && self.pending_connect {
            self.pending_connect = false;
            actions.extend(self.begin_dial());
        } else if !was_closing && !code.is_intentional() && self.reconnect_enabled {
            actions.extend(self.schedule_reconnect());
        }
        actions
    }

    /// A text frame arrived on the socket for `epoch`.
    ///
    /// Malformed frames are logged and dropped.
    pub fn handle_frame(&mut self, epoch: u64, text: &str) -> Vec<ConnectionAction> {
        if epoch != self.epoch
            || !matches!(self.state, ConnectionState::Open | ConnectionState::Closing)
        {
            tracing::debug!(channel = %self.channel.name, epoch, "dropping frame from inactive socket");
            return Vec::new();
        }

        let frame = match InboundFrame::parse(text) {
            Ok(frame) => frame,
            Err(error) => {
                tracing::warn!(channel = %self.channel.name, %error, "dropping malformed frame");
                return Vec::new();
            },
        };

        let mut kind = self.channel.classifier.classify(frame.kind());
        if self.heartbeat.awaiting_ack() && frame.rejects_kind(OutboundPayload::Ping.kind()) {
            // Servers without a ping handler reject the ping instead of
            // answering pong. The rejection still acknowledges it.
            kind = EventKind::Pong;
        }
        match kind {
            EventKind::Pong => {
                if !self.heartbeat.acknowledge() {
                    tracing::debug!(channel = %self.channel.name, "unsolicited pong");
                }
            },
            EventKind::Unknown => {
                tracing::debug!(channel = %self.channel.name, kind = frame.kind(), "unrecognised frame");
            },
            _ => {},
        }

        vec![ConnectionAction::Emit(ChannelEvent::Inbound { kind, frame })]
    }

    /// Fire due deadlines: reconnect, connect timeout, heartbeat.
    pub fn tick(&mut self) -> Vec<ConnectionAction> {
        let now = self.env.now();

        match self.state {
            ConnectionState::Disconnected => {
                if self.reconnect_at.is_some_and(|at| now >= at) {
                    tracing::info!(channel = %self.channel.name, attempt = self.attempts, "reconnecting");
                    return self.begin_dial();
                }
                Vec::new()
            },
            ConnectionState::Connecting => {
                if self.dial_deadline.is_some_and(|deadline| now >= deadline) {
                    let epoch = self.epoch;
                    let mut actions = vec![ConnectionAction::AbortDial { epoch }];
                    actions.extend(self.fail_dial("connect timeout"));
                    return actions;
                }
                Vec::new()
            },
            ConnectionState::Open => match self.heartbeat.poll(now) {
                HeartbeatPoll::Idle => Vec::new(),
                HeartbeatPoll::Ping => {
                    self.send_ping();
                    Vec::new()
                },
                HeartbeatPoll::Expired => {
                    tracing::warn!(channel = %self.channel.name, epoch = self.epoch, "heartbeat timeout");
                    self.force_close(CloseCode::HEARTBEAT_TIMEOUT, "heartbeat timeout")
                },
            },
            ConnectionState::Closing => Vec::new(),
        }
    }

    fn begin_dial(&mut self) -> Vec<ConnectionAction> {
        let now = self.env.now();
        self.epoch += 1;
        self.state = ConnectionState::Connecting;
        self.reconnect_at = None;
        self.dial_deadline = Some(now + self.config.connect_timeout);

        tracing::debug!(channel = %self.channel.name, epoch = self.epoch, endpoint = %self.channel.endpoint, "dialing");
        vec![ConnectionAction::Dial { epoch: self.epoch, endpoint: self.channel.endpoint.clone() }]
    }

    fn fail_dial(&mut self, reason: &str) -> Vec<ConnectionAction> {
        tracing::warn!(channel = %self.channel.name, epoch = self.epoch, reason, "dial failed");
        self.enter_disconnected();

        let mut actions = vec![
            ConnectionAction::Emit(ChannelEvent::TransportError { message: reason.to_string() }),
            ConnectionAction::Emit(ChannelEvent::Disconnected {
                code: CloseCode::ABNORMAL,
                reason: reason.to_string(),
            }),
        ];
        if self.reconnect_enabled {
            actions.extend(self.schedule_reconnect());
        }
        actions
    }

    fn force_close(&mut self, code: CloseCode, reason: &str) -> Vec<ConnectionAction> {
        if let Some(mut sink) = self.sink.take() {
            sink.close(code, reason);
        }
        self.enter_disconnected();

        let mut actions = vec![ConnectionAction::Emit(ChannelEvent::Disconnected {
            code,
            reason: reason.to_string(),
        })];
        if self.reconnect_enabled {
            actions.extend(self.schedule_reconnect());
        }
        actions
    }

    fn schedule_reconnect(&mut self) -> Vec<ConnectionAction> {
        let next = self.attempts + 1;
        if !self.config.reconnect.allows(next) {
            if self.exhaustion_reported {
                return Vec::new();
            }
            self.exhaustion_reported = true;
            tracing::warn!(channel = %self.channel.name, attempts = self.attempts, "reconnect attempts exhausted");
            return vec![ConnectionAction::Emit(ChannelEvent::ReconnectExhausted {
                attempts: self.attempts,
            })];
        }

        self.attempts = next;
        let delay = self.config.reconnect.delay_for(next);
        self.reconnect_at = Some(self.env.now() + delay);
        tracing::info!(
            channel = %self.channel.name,
            attempt = next,
            delay_ms = delay.as_millis() as u64,
            "reconnect scheduled"
        );

        vec![ConnectionAction::Emit(ChannelEvent::Reconnecting { attempt: next, delay })]
    }

    /// Leave whatever state we were in for `Disconnected`, releasing the
    /// socket and every deadline tied to it.
    fn enter_disconnected(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.sink = None;
        self.dial_deadline = None;
        self.heartbeat.stop();
    }

    fn send_ping(&mut self) {
        let envelope = self.stamp(OutboundPayload::Ping);
        let Some(sink) = self.sink.as_mut() else {
            return;
        };

        let result = envelope
            .encode()
            .map_err(|e| e.to_string())
            .and_then(|text| sink.transmit(text).map_err(|e| e.to_string()));
        if let Err(error) = result {
            // The armed deadline will force the close.
            tracing::warn!(channel = %self.channel.name, %error, "heartbeat ping failed");
        }
    }

    /// Drain the queue into the open socket, oldest first.
    ///
    /// Stops at the first failure, putting that envelope back at the front.
    fn flush_queue(&mut self) -> usize {
        let Some(sink) = self.sink.as_mut() else {
            return 0;
        };

        let mut flushed = 0;
        while let Some(item) = self.queue.pop_front() {
            let text = match item.envelope.encode() {
                Ok(text) => text,
                Err(error) => {
                    tracing::warn!(channel = %self.channel.name, id = %item.envelope.id, %error, "dropping unencodable envelope");
                    continue;
                },
            };

            if let Err(error) = sink.transmit(text) {
                tracing::warn!(channel = %self.channel.name, id = %item.envelope.id, %error, "flush interrupted");
                self.queue.push_front(item);
                break;
            }
            flushed += 1;
        }
        flushed
    }

    fn enqueue(&mut self, envelope: Envelope) -> Delivery {
        match self.queue.push_back(envelope) {
            Some(evicted) => {
                tracing::warn!(
                    channel = %self.channel.name,
                    evicted = %evicted.envelope.id,
                    capacity = self.queue.capacity(),
                    "outbound queue full, dropped oldest"
                );
                Delivery::QueuedWithEviction { evicted: evicted.envelope.id }
            },
            None => Delivery::Queued,
        }
    }

    fn stamp(&self, payload: OutboundPayload) -> Envelope {
        let timestamp = self.env.wall_clock();
        let mut suffix = [0u8; 4];
        self.env.random_bytes(&mut suffix);
        let id = format!("msg_{}_{}", timestamp.timestamp_millis(), hex::encode(suffix));
        Envelope::new(id, timestamp, payload)
    }
}

impl<E: Environment, S: FrameSink> std::fmt::Debug for Connection<E, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("channel", &self.channel.name)
            .field("state", &self.state)
            .field("epoch", &self.epoch)
            .field("attempts", &self.attempts)
            .field("reconnect_enabled", &self.reconnect_enabled)
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}
