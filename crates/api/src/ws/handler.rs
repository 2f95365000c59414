use axum::extract::ws::WebSocketUpgrade;
use axum::extract::Query;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::ws::relay;

/// Query string for `GET /api/v1/ws`.
#[derive(Debug, Deserialize)]
pub struct RelayQuery {
    /// Upstream HTTP base URL; the socket address is derived from it.
    pub base_url: String,
    /// Session id correlating this relay with a submitted job.
    pub client_id: String,
}

/// HTTP handler that upgrades the connection and hands it to the relay.
pub async fn ws_handler(ws: WebSocketUpgrade, Query(query): Query<RelayQuery>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| relay::run(socket, query.base_url, query.client_id))
}
