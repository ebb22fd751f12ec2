//! Error types for the application layer.

use thiserror::Error;

/// Longest accepted chat message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// A user message was rejected before anything was sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Nothing left after trimming whitespace.
    #[error("message is empty")]
    Empty,

    /// Over [`MAX_MESSAGE_CHARS`].
    #[error("message is {len} characters, the limit is {max}")]
    TooLong {
        /// Length after trimming.
        len: usize,
        /// Limit.
        max: usize,
    },
}

/// Reading or writing persisted state failed.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("storage i/o: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be encoded.
    #[error("storage encoding: {0}")]
    Json(#[from] serde_json::Error),

    /// Key contains characters that cannot be stored.
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
}
