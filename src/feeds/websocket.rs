//! Shared WebSocket connection helpers
//!
//! Provides the TLS-enabled WebSocket connect used by streaming feeds.

use tokio_tungstenite::{
    connect_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream,
};

use crate::feeds::errors::FeedError;

/// Type alias for the WebSocket stream with TLS
pub type TlsWebSocketStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Connect to a WebSocket endpoint with TLS (TLSv1.2 minimum)
///
/// Plain `ws://` URLs are accepted too; the connector is only used for
/// `wss://`.
pub async fn connect_tls(url: &str) -> Result<TlsWebSocketStream, FeedError> {
    let tls = native_tls::TlsConnector::builder()
        .min_protocol_version(Some(native_tls::Protocol::Tlsv12))
        .build()
        .map_err(|e| FeedError::Tls(e.to_string()))?;

    let (ws_stream, _response) =
        connect_async_tls_with_config(url, None, false, Some(Connector::NativeTls(tls)))
            .await
            .map_err(FeedError::from)?;

    Ok(ws_stream)
}
