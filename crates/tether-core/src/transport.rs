//! Outbound frame sink.
//!
//! The connection transmits synchronously, the way a browser socket's
//! `send` does: the frame is handed to a writer and the call returns
//! immediately. Production sinks forward into a channel drained by a socket
//! writer task; test sinks record frames and can be told to fail.
//!
//! A sink is handed to the connection when the socket opens and dropped
//! when the connection leaves the open state, so a connection can never
//! hold more than one live socket.

use tether_proto::CloseCode;

use crate::error::TransmitError;

/// Write half of one open socket.
pub trait FrameSink: Send {
    /// Queue one text frame for transmission.
    ///
    /// Returns an error if the socket can no longer accept frames.
    fn transmit(&mut self, frame: String) -> Result<(), TransmitError>;

    /// Ask the socket to close with `code`.
    ///
    /// Fire-and-forget. The runtime reports the completed close separately.
    fn close(&mut self, code: CloseCode, reason: &str);
}
