//! Channel events.
//!
//! Everything a connection reports to the outside world is a
//! [`ChannelEvent`]. Listeners subscribe by [`EventKind`]; each event maps to
//! exactly one kind.

use std::{fmt, time::Duration};

use tether_proto::{CloseCode, InboundFrame};

/// Subscription key on the [`crate::EventBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// Socket opened.
    Connected,
    /// Socket closed (any reason).
    Disconnected,
    /// Assistant reply (`response` frame).
    Message,
    /// Typing indicator.
    Typing,
    /// Server `error` frame or local transport failure.
    Error,
    /// Context update acknowledged.
    ContextUpdated,
    /// Broadcast from an administrator.
    AdminBroadcast,
    /// Heartbeat acknowledgment.
    Pong,
    /// Admin statistics reply.
    AdminStats,
    /// Admin connection listing reply.
    ConnectionStats,
    /// Admin broadcast confirmation.
    BroadcastSent,
    /// Frame with an unrecognised `type`.
    Unknown,
    /// Reconnect attempt scheduled.
    Reconnecting,
    /// Reconnect attempts exhausted. Terminal until `connect()`.
    MaxReconnectAttempts,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 14] = [
        Self::Connected,
        Self::Disconnected,
        Self::Message,
        Self::Typing,
        Self::Error,
        Self::ContextUpdated,
        Self::AdminBroadcast,
        Self::Pong,
        Self::AdminStats,
        Self::ConnectionStats,
        Self::BroadcastSent,
        Self::Unknown,
        Self::Reconnecting,
        Self::MaxReconnectAttempts,
    ];

    /// Stable name, matching the wire vocabulary where one exists.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Message => "message",
            Self::Typing => "typing",
            Self::Error => "error",
            Self::ContextUpdated => "context_updated",
            Self::AdminBroadcast => "admin_broadcast",
            Self::Pong => "pong",
            Self::AdminStats => "admin_stats",
            Self::ConnectionStats => "connection_stats",
            Self::BroadcastSent => "broadcast_sent",
            Self::Unknown => "unknown",
            Self::Reconnecting => "reconnecting",
            Self::MaxReconnectAttempts => "max_reconnect_attempts",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something a connection wants its listeners to know.
///
/// Listeners receive events by reference and must treat them as immutable
/// snapshots.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// The socket is open and the outbound queue has been flushed.
    Connected,

    /// The socket closed.
    Disconnected {
        /// Close code reported by the socket (or synthesised locally).
        code: CloseCode,
        /// Close reason.
        reason: String,
    },

    /// A classified server frame.
    Inbound {
        /// Kind assigned by the channel's classifier.
        kind: EventKind,
        /// The frame.
        frame: InboundFrame,
    },

    /// A local transport failure (dial error, connect timeout).
    TransportError {
        /// Failure description.
        message: String,
    },

    /// A reconnect attempt has been scheduled.
    Reconnecting {
        /// 1-based attempt number.
        attempt: u32,
        /// Delay before the attempt.
        delay: Duration,
    },

    /// All reconnect attempts failed. Emitted once per exhaustion.
    ReconnectExhausted {
        /// Attempts made.
        attempts: u32,
    },
}

impl ChannelEvent {
    /// Subscription kind this event is delivered under.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Connected => EventKind::Connected,
            Self::Disconnected { .. } => EventKind::Disconnected,
            Self::Inbound { kind, .. } => *kind,
            Self::TransportError { .. } => EventKind::Error,
            Self::Reconnecting { .. } => EventKind::Reconnecting,
            Self::ReconnectExhausted { .. } => EventKind::MaxReconnectAttempts,
        }
    }

    /// Inbound frame carried by this event, if any.
    pub fn frame(&self) -> Option<&InboundFrame> {
        match self {
            Self::Inbound { frame, .. } => Some(frame),
            _ => None,
        }
    }
}
