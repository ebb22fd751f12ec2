//! Opening WebSocket streams.
//!
//! The driver is generic over a [`Dialer`] so the same socket loop runs over
//! real TCP in production and over a simulated network in tests.

use std::future::Future;

use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::error::DialError;

/// Opens a WebSocket to an endpoint URL.
pub trait Dialer: Clone + Send + Sync + 'static {
    /// Underlying byte stream.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Connect and complete the WebSocket upgrade.
    fn dial(
        &self,
        endpoint: &str,
    ) -> impl Future<Output = Result<WebSocketStream<Self::Stream>, DialError>> + Send;
}

/// Dials over TCP using the `ws://` URL scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

impl Dialer for TcpDialer {
    type Stream = MaybeTlsStream<TcpStream>;

    fn dial(
        &self,
        endpoint: &str,
    ) -> impl Future<Output = Result<WebSocketStream<Self::Stream>, DialError>> + Send {
        let endpoint = endpoint.to_string();
        async move {
            let (stream, response) = connect_async(endpoint.as_str())
                .await
                .map_err(|e| DialError::Handshake(e.to_string()))?;
            tracing::debug!(%endpoint, status = %response.status(), "websocket upgraded");
            Ok(stream)
        }
    }
}
