//! The bidirectional event relay.
//!
//! One relay session joins an already-accepted downstream WebSocket to a
//! freshly opened upstream connection and pumps frames both ways,
//! verbatim. The two pump directions run as branches of a single
//! `tokio::select!`: whichever ends first -- clean close, error, or
//! disconnect -- cancels the other, and the upstream socket is closed on
//! every exit path. A fault that is not a clean disconnect is reported
//! downstream once, as a `proxy_error` text frame, before the session
//! ends.
//!
//! Sessions are fully isolated: nothing here touches the repeat runner
//! or any other connection.

use axum::extract::ws::{Message as ClientMessage, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;

use pylon_comfyui::UpstreamSocket;

/// Why a pump direction ended.
enum PumpEnd {
    /// Clean close, or the peer simply went away.
    Closed,
    /// A fault worth reporting to the downstream peer.
    Failed(String),
}

/// Run one relay session to completion.
pub async fn run(mut downstream: WebSocket, base_url: String, client_id: String) {
    let upstream = match pylon_comfyui::connect(&base_url, &client_id).await {
        Ok(socket) => socket,
        Err(e) => {
            tracing::warn!(client_id = %client_id, error = %e, "Relay could not reach upstream");
            let _ = downstream
                .send(ClientMessage::Text(proxy_error_frame(&e.to_string()).into()))
                .await;
            let _ = downstream.send(ClientMessage::Close(None)).await;
            return;
        }
    };

    tracing::info!(client_id = %client_id, "Relay session opened");

    let (mut down_tx, mut down_rx) = downstream.split();
    let (mut up_tx, mut up_rx) = upstream.split();

    // First pump to finish wins; the other is dropped mid-await.
    let end = tokio::select! {
        end = pump_downstream(&mut down_rx, &mut up_tx) => end,
        end = pump_upstream(&mut up_rx, &mut down_tx) => end,
    };

    if let PumpEnd::Failed(message) = end {
        tracing::warn!(client_id = %client_id, error = %message, "Relay session failed");
        let _ = down_tx
            .send(ClientMessage::Text(proxy_error_frame(&message).into()))
            .await;
    }

    // Tear down both sides no matter which pump ended first.
    let _ = up_tx.close().await;
    let _ = down_tx.send(ClientMessage::Close(None)).await;

    tracing::info!(client_id = %client_id, "Relay session closed");
}

/// downstream -> upstream: forward caller frames verbatim.
async fn pump_downstream(
    down_rx: &mut SplitStream<WebSocket>,
    up_tx: &mut SplitSink<UpstreamSocket, UpstreamMessage>,
) -> PumpEnd {
    while let Some(frame) = down_rx.next().await {
        match frame {
            Ok(ClientMessage::Text(text)) => {
                if let Err(e) = up_tx.send(UpstreamMessage::Text(text.as_str().to_owned())).await {
                    return PumpEnd::Failed(format!("upstream send failed: {e}"));
                }
            }
            Ok(ClientMessage::Binary(bytes)) => {
                if let Err(e) = up_tx.send(UpstreamMessage::Binary(bytes.to_vec())).await {
                    return PumpEnd::Failed(format!("upstream send failed: {e}"));
                }
            }
            Ok(ClientMessage::Close(_)) => return PumpEnd::Closed,
            // Ping/pong is answered by the WebSocket stack on both sides.
            Ok(_) => {}
            Err(e) => {
                // The downstream peer is gone; there is nobody left to
                // notify.
                tracing::debug!(error = %e, "Downstream receive error");
                return PumpEnd::Closed;
            }
        }
    }
    PumpEnd::Closed
}

/// upstream -> downstream: forward progress events verbatim.
async fn pump_upstream(
    up_rx: &mut SplitStream<UpstreamSocket>,
    down_tx: &mut SplitSink<WebSocket, ClientMessage>,
) -> PumpEnd {
    while let Some(frame) = up_rx.next().await {
        match frame {
            Ok(UpstreamMessage::Text(text)) => {
                if down_tx.send(ClientMessage::Text(text.into())).await.is_err() {
                    return PumpEnd::Closed;
                }
            }
            Ok(UpstreamMessage::Binary(bytes)) => {
                if down_tx
                    .send(ClientMessage::Binary(bytes.into()))
                    .await
                    .is_err()
                {
                    return PumpEnd::Closed;
                }
            }
            Ok(UpstreamMessage::Close(frame)) => {
                tracing::debug!(?frame, "Upstream closed");
                return PumpEnd::Closed;
            }
            Ok(_) => {}
            Err(e) => return PumpEnd::Failed(format!("upstream receive failed: {e}")),
        }
    }
    PumpEnd::Closed
}

/// The one structured error message a session may send downstream.
fn proxy_error_frame(message: &str) -> String {
    serde_json::json!({
        "type": "proxy_error",
        "message": message,
    })
    .to_string()
}
