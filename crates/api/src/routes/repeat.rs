//! Route definitions for the recurring-job runner, mounted at `/repeat`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::repeat;
use crate::state::AppState;

/// ```text
/// GET  /status -> status
/// POST /start  -> start
/// POST /stop   -> stop
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(repeat::status))
        .route("/start", post(repeat::start))
        .route("/stop", post(repeat::stop))
}
