//! Error types for the transport core.

use thiserror::Error;

/// Failure to hand a frame to the underlying socket.
///
/// Never surfaced to `send` callers: the connection degrades to queueing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransmitError {
    /// The socket's writer is gone.
    #[error("socket closed")]
    Closed,

    /// The socket refused the frame.
    #[error("transmit failed: {0}")]
    Failed(String),
}

/// Failure reported by an event listener.
///
/// Isolated by the bus: logged, never propagated to the emitter or to other
/// listeners.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("listener failed: {message}")]
pub struct ListenerError {
    /// Human-readable failure description.
    pub message: String,
}

impl ListenerError {
    /// Create a listener error.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
