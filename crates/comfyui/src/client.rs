//! WebSocket side of the ComfyUI upstream: address derivation and connect.
//!
//! ComfyUI pushes progress events on `/ws`, addressed by the `clientId`
//! query parameter. The socket address is derived from the HTTP base URL
//! by swapping schemes: `https` becomes `wss`, `http` becomes `ws`.

use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// A live WebSocket connection to a ComfyUI instance.
pub type UpstreamSocket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Errors from the WebSocket client.
#[derive(Debug, thiserror::Error)]
pub enum ComfyWsError {
    /// The base URL is empty or not an http(s) URL.
    #[error("invalid base URL: {0:?}")]
    InvalidBaseUrl(String),

    /// Failed to establish the WebSocket connection.
    #[error("failed to connect to {url}: {message}")]
    Connection { url: String, message: String },
}

/// Derive the upstream WebSocket URL from an HTTP base URL.
///
/// `http://host:8188` becomes `ws://host:8188/ws?clientId={id}` and
/// `https` maps to `wss`. Anything without an http(s) scheme is rejected.
pub fn ws_url(base_url: &str, client_id: &str) -> Result<String, ComfyWsError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let (scheme, rest) = if let Some(rest) = trimmed.strip_prefix("https://") {
        ("wss", rest)
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        ("ws", rest)
    } else {
        return Err(ComfyWsError::InvalidBaseUrl(base_url.to_string()));
    };
    if rest.is_empty() {
        return Err(ComfyWsError::InvalidBaseUrl(base_url.to_string()));
    }
    Ok(format!("{scheme}://{rest}/ws?clientId={client_id}"))
}

/// Connect to the upstream WebSocket endpoint for the given session.
pub async fn connect(base_url: &str, client_id: &str) -> Result<UpstreamSocket, ComfyWsError> {
    let url = ws_url(base_url, client_id)?;

    let (ws_stream, _response) =
        connect_async(&url)
            .await
            .map_err(|e| ComfyWsError::Connection {
                url: url.clone(),
                message: e.to_string(),
            })?;

    tracing::info!(client_id = %client_id, url = %url, "Connected to upstream WebSocket");
    Ok(ws_stream)
}
