//! [`FrameSink`] over a socket writer task.

use tether_core::{FrameSink, TransmitError};
use tether_proto::CloseCode;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{
    Message,
    protocol::{CloseFrame, frame::coding::CloseCode as WsCloseCode},
};

/// Write half of an open socket.
///
/// Frames are handed to the socket task over an unbounded channel, so
/// transmission never blocks the connection. Dropping the sink tells the
/// socket task to finish the close handshake and exit.
#[derive(Debug)]
pub struct WsSink {
    outgoing: mpsc::UnboundedSender<Message>,
}

impl WsSink {
    pub(crate) fn new(outgoing: mpsc::UnboundedSender<Message>) -> Self {
        Self { outgoing }
    }
}

impl FrameSink for WsSink {
    fn transmit(&mut self, frame: String) -> Result<(), TransmitError> {
        self.outgoing.send(Message::text(frame)).map_err(|_| TransmitError::Closed)
    }

    fn close(&mut self, code: CloseCode, reason: &str) {
        let frame = CloseFrame { code: WsCloseCode::from(code.as_u16()), reason: reason.to_string().into() };
        if self.outgoing.send(Message::Close(Some(frame))).is_err() {
            tracing::debug!(%code, "socket already gone, close frame not sent");
        }
    }
}
