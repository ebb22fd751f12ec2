//! Dialer over turmoil's simulated network.

use std::future::Future;

use tether_client::{DialError, Dialer};
use tokio_tungstenite::{WebSocketStream, client_async};
use turmoil::net::TcpStream;

/// Opens WebSockets to turmoil hosts.
///
/// Endpoints are ordinary `ws://host:port/path` URLs where `host` is a
/// turmoil host name.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimDialer;

impl Dialer for SimDialer {
    type Stream = TcpStream;

    fn dial(
        &self,
        endpoint: &str,
    ) -> impl Future<Output = Result<WebSocketStream<Self::Stream>, DialError>> + Send {
        let endpoint = endpoint.to_string();
        async move {
            let authority = authority(&endpoint)?;
            let stream = TcpStream::connect(authority.as_str())
                .await
                .map_err(|e| DialError::Handshake(e.to_string()))?;
            let (socket, _response) = client_async(endpoint.as_str(), stream)
                .await
                .map_err(|e| DialError::Handshake(e.to_string()))?;
            Ok(socket)
        }
    }
}

/// `host:port` of a `ws://` URL.
fn authority(endpoint: &str) -> Result<String, DialError> {
    let invalid = |reason: &str| DialError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: reason.to_string(),
    };

    let rest = endpoint.strip_prefix("ws://").ok_or_else(|| invalid("expected ws:// scheme"))?;
    let authority = rest.split('/').next().unwrap_or_default();
    if authority.is_empty() {
        return Err(invalid("missing host"));
    }
    if authority.contains(':') {
        Ok(authority.to_string())
    } else {
        Ok(format!("{authority}:80"))
    }
}
