//! Per-dial socket task.
//!
//! One task per epoch: dial, hand a [`WsSink`] back to the driver, then pump
//! frames in both directions until the socket closes. Everything the task
//! observes is reported to the driver tagged with its epoch.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tether_proto::CloseCode;
use tokio::{sync::mpsc, time::Instant};
use tokio_tungstenite::tungstenite::Message;

use crate::{dialer::Dialer, sink::WsSink};

/// How long to wait for the peer to answer our close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// What a socket task reports back to its driver.
#[derive(Debug)]
pub(crate) enum SocketEvent {
    Opened { epoch: u64, sink: WsSink },
    Frame { epoch: u64, text: String },
    Closed { epoch: u64, code: CloseCode, reason: String },
    DialFailed { epoch: u64, reason: String },
}

pub(crate) async fn run_socket<D: Dialer>(
    dialer: D,
    endpoint: String,
    epoch: u64,
    events: mpsc::UnboundedSender<SocketEvent>,
) {
    let stream = match dialer.dial(&endpoint).await {
        Ok(stream) => stream,
        Err(error) => {
            let _ = events.send(SocketEvent::DialFailed { epoch, reason: error.to_string() });
            return;
        },
    };

    let (mut writer, mut reader) = stream.split();
    let (outgoing_tx, mut outgoing) = mpsc::unbounded_channel();
    if events.send(SocketEvent::Opened { epoch, sink: WsSink::new(outgoing_tx) }).is_err() {
        return;
    }

    // Set once the sink is dropped; bounds the wait for the peer's close.
    let mut close_deadline: Option<Instant> = None;

    let (code, reason) = loop {
        tokio::select! {
            message = outgoing.recv(), if close_deadline.is_none() => match message {
                Some(message) => {
                    if let Err(error) = writer.send(message).await {
                        break (CloseCode::ABNORMAL, error.to_string());
                    }
                },
                None => {
                    let _ = writer.close().await;
                    close_deadline = Some(Instant::now() + CLOSE_GRACE);
                },
            },
            incoming = reader.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(SocketEvent::Frame { epoch, text: text.as_str().to_owned() });
                },
                Some(Ok(Message::Close(frame))) => {
                    // Flushes the automatic close reply.
                    let _ = writer.flush().await;
                    break match frame {
                        Some(frame) => (CloseCode::from(u16::from(frame.code)), frame.reason.as_str().to_owned()),
                        None => (CloseCode::NO_STATUS, String::new()),
                    };
                },
                Some(Ok(_)) => {},
                Some(Err(error)) => break (CloseCode::ABNORMAL, error.to_string()),
                None => break (CloseCode::ABNORMAL, "stream ended without close frame".to_string()),
            },
            () = tokio::time::sleep_until(close_deadline.unwrap_or_else(Instant::now)), if close_deadline.is_some() => {
                break (CloseCode::NORMAL, "close handshake timed out".to_string());
            },
        }
    };

    tracing::debug!(epoch, %code, %reason, "socket closed");
    let _ = events.send(SocketEvent::Closed { epoch, code, reason });
}
