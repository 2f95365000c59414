//! Handlers for the workflow template library.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use pylon_core::types::Timestamp;
use pylon_store::UpsertTemplate;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /api/v1/prompts`.
#[derive(Debug, Deserialize)]
pub struct SaveTemplateRequest {
    /// Existing template id when editing; omitted when creating.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub prompt_json: Option<serde_json::Value>,
    /// Preserved across edits by the client.
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

/// GET /api/v1/prompts
pub async fn list_templates(
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let items = state.templates.list().await?;
    Ok(Json(DataResponse { data: items }))
}

/// GET /api/v1/prompts/{id}
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let template = state
        .templates
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("template {id}")))?;
    Ok(Json(DataResponse { data: template }))
}

/// POST /api/v1/prompts
///
/// Create a template, or replace one when `id` is given.
pub async fn save_template(
    State(state): State<AppState>,
    Json(input): Json<SaveTemplateRequest>,
) -> AppResult<impl IntoResponse> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::BadRequest("title is required".into()));
    }
    let Some(prompt_json) = input.prompt_json else {
        return Err(AppError::BadRequest("prompt_json is required".into()));
    };

    let template = state
        .templates
        .save(UpsertTemplate {
            id: input.id,
            title,
            prompt_json,
            created_at: input.created_at,
        })
        .await?;

    tracing::info!(id = %template.id, title = %template.title, "Template saved");

    Ok(Json(DataResponse { data: template }))
}

/// DELETE /api/v1/prompts/{id}
pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.templates.delete(&id).await?;

    tracing::info!(id = %id, "Template deleted");

    Ok(StatusCode::NO_CONTENT)
}
