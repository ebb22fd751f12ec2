//! Terminal client errors.

use tether_app::StorageError;
use thiserror::Error;

/// Anything that stops the terminal client.
#[derive(Debug, Error)]
pub enum CliError {
    /// Settings or conversations could not be opened.
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    /// Reading input or writing output failed.
    #[error("terminal i/o: {0}")]
    Io(#[from] std::io::Error),
}
