//! Handlers for the recurring-job runner.
//!
//! Thin wrappers over [`RepeatRunner`](pylon_repeat::RepeatRunner): the
//! runner owns all state and concurrency; these endpoints just translate
//! HTTP to its three operations. Every response is a payload-redacted
//! snapshot.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use pylon_core::repeat::RepeatSnapshot;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /api/v1/repeat/start`.
#[derive(Debug, Deserialize)]
pub struct StartRepeatRequest {
    #[serde(default)]
    pub base_url: String,
    /// The workflow to resubmit each cycle.
    #[serde(default)]
    pub prompt: Option<serde_json::Value>,
}

/// POST /api/v1/repeat/start
///
/// Activate the recurring job. Idempotent while a loop is alive.
pub async fn start(
    State(state): State<AppState>,
    Json(input): Json<StartRepeatRequest>,
) -> AppResult<Json<DataResponse<RepeatSnapshot>>> {
    let snapshot = state.repeat.start(&input.base_url, input.prompt).await?;

    tracing::info!(base_url = %snapshot.base_url, "Repeat start requested");

    Ok(Json(DataResponse { data: snapshot }))
}

/// POST /api/v1/repeat/stop
///
/// Declare the loop should stop; it exits at its next decision point.
pub async fn stop(State(state): State<AppState>) -> AppResult<Json<DataResponse<RepeatSnapshot>>> {
    let snapshot = state.repeat.stop().await?;

    tracing::info!("Repeat stop requested");

    Ok(Json(DataResponse { data: snapshot }))
}

/// GET /api/v1/repeat/status
pub async fn status(State(state): State<AppState>) -> Json<DataResponse<RepeatSnapshot>> {
    Json(DataResponse {
        data: state.repeat.status().await,
    })
}
