//! Error types for the runtime and HTTP fallback.

use thiserror::Error;

/// Opening a WebSocket failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DialError {
    /// The endpoint could not be turned into a request.
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint {
        /// Endpoint as configured.
        endpoint: String,
        /// What was wrong with it.
        reason: String,
    },

    /// TCP connect or WebSocket upgrade failed.
    #[error("websocket handshake failed: {0}")]
    Handshake(String),
}

/// An HTTP fallback request failed.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Transport-level failure or undecodable body.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {detail}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// `detail` field of the error body, or the raw body.
        detail: String,
    },
}

/// The channel driver task is no longer running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("driver for channel {channel} has stopped")]
pub struct DriverStopped {
    /// Channel name.
    pub channel: String,
}
