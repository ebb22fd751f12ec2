//! Tether transport core
//!
//! Pure state machine logic for a resilient chat connection, decoupled from
//! sockets, timers and randomness.
//!
//! # Architecture
//!
//! The [`connection::Connection`] owns everything that makes the link
//! resilient: the lifecycle state machine, the reconnect policy, the
//! heartbeat deadlines and the bounded outbound queue. It never performs
//! I/O on its own. Time and randomness come from an [`env::Environment`],
//! outbound text goes through a [`transport::FrameSink`] handed over when the
//! socket opens, and everything else it wants done (dial a socket, abort a
//! dial, notify listeners) is returned as a [`connection::ConnectionAction`].
//!
//! A runtime (see `tether-client`) interprets those actions against a real
//! WebSocket; tests interpret them directly with a manual clock.
//!
//! # Components
//!
//! - [`connection`]: Connection state machine (lifecycle, reconnect, heartbeat)
//! - [`bus`]: Synchronous publish/subscribe for channel events
//! - [`event`]: Event kinds and payloads
//! - [`classify`]: Inbound frame classification per channel
//! - [`channel`]: Named endpoints (chat, admin)
//! - [`queue`]: Bounded outbound queue
//! - [`backoff`]: Exponential reconnect policy
//! - [`heartbeat`]: Liveness ping deadlines
//! - [`mod@env`]: Environment abstraction (time, RNG)
//! - [`transport`]: Outbound frame sink abstraction
//! - [`error`]: Error types

pub mod backoff;
pub mod bus;
pub mod channel;
pub mod classify;
pub mod connection;
pub mod env;
pub mod error;
pub mod event;
pub mod heartbeat;
pub mod queue;
pub mod transport;

#[cfg(test)]
mod testing;

pub use backoff::ReconnectPolicy;
pub use bus::{EventBus, Listener, listener};
pub use channel::Channel;
pub use classify::{AdminClassifier, ChatClassifier, Classifier};
pub use connection::{
    Connection, ConnectionAction, ConnectionConfig, ConnectionState, Delivery, SendReceipt,
};
pub use env::Environment;
pub use error::{ListenerError, TransmitError};
pub use event::{ChannelEvent, EventKind};
pub use queue::{OutboundQueue, QueuedEnvelope};
pub use transport::FrameSink;
