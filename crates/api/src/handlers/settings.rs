//! Handlers for the settings document.

use axum::extract::State;
use axum::Json;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/settings
pub async fn get_settings(State(state): State<AppState>) -> Json<DataResponse<serde_json::Value>> {
    Json(DataResponse {
        data: state.settings.load().await,
    })
}

/// POST /api/v1/settings
///
/// Replace the settings document wholesale.
pub async fn update_settings(
    State(state): State<AppState>,
    Json(input): Json<serde_json::Value>,
) -> AppResult<Json<DataResponse<serde_json::Value>>> {
    if !input.is_object() {
        return Err(AppError::BadRequest("settings must be a JSON object".into()));
    }

    state.settings.save(&input).await?;

    tracing::info!("Settings updated");

    Ok(Json(DataResponse { data: input }))
}
