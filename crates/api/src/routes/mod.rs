pub mod health;
pub mod prompts;
pub mod proxy;
pub mod repeat;
pub mod settings;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                            event relay (WebSocket)
///
/// /settings                      get, replace (GET, POST)
///
/// /prompts                       list, create (GET, POST)
/// /prompts/{id}                  get, delete (GET, DELETE)
///
/// /queue                         single-shot submission (POST)
///
/// /object_info                   node metadata, cached (GET)
/// /object_info/{node_class}      per-class node metadata (GET)
/// /history                       job history pass-through (GET)
/// /view                          file streaming pass-through (GET)
///
/// /repeat/status                 runner snapshot (GET)
/// /repeat/start                  activate the recurring job (POST)
/// /repeat/stop                   deactivate the recurring job (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Event relay WebSocket.
        .route("/ws", get(ws::ws_handler))
        // Settings document.
        .nest("/settings", settings::router())
        // Workflow template library.
        .nest("/prompts", prompts::router())
        // Single-shot submission.
        .route("/queue", post(handlers::queue::queue_prompt))
        // Upstream pass-through endpoints.
        .merge(proxy::router())
        // Recurring-job runner.
        .nest("/repeat", repeat::router())
}
