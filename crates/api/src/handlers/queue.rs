//! Handler for single-shot workflow submission.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /api/v1/queue`.
#[derive(Debug, Deserialize)]
pub struct QueueRequest {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub prompt: Option<serde_json::Value>,
}

/// What the caller gets back after a successful submission.
#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub prompt_id: String,
    /// Session id minted for this submission; pass it to the relay to
    /// receive this job's progress events.
    pub client_id: String,
}

/// POST /api/v1/queue
///
/// Submit a workflow once, without involving the repeat runner.
pub async fn queue_prompt(
    State(state): State<AppState>,
    Json(input): Json<QueueRequest>,
) -> AppResult<Json<DataResponse<QueueResponse>>> {
    let prompt = input
        .prompt
        .filter(|p| !p.is_null())
        .ok_or_else(|| AppError::BadRequest("prompt is required".into()))?;

    let client_id = uuid::Uuid::new_v4().to_string();
    let prompt_id = state
        .comfy
        .submit_prompt(&input.base_url, &prompt, &client_id)
        .await?;

    tracing::info!(prompt_id = %prompt_id, "Workflow queued");

    Ok(Json(DataResponse {
        data: QueueResponse {
            prompt_id,
            client_id,
        },
    }))
}
