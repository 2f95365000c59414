use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use pylon_comfyui::ComfyApiError;
use pylon_repeat::RepeatError;
use pylon_store::StoreError;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain error enums and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses
/// of the shape `{ "error": ..., "code": ... }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A fault from the upstream ComfyUI instance.
    #[error(transparent)]
    Upstream(#[from] ComfyApiError),

    /// An error from the repeat runner.
    #[error(transparent)]
    Repeat(#[from] RepeatError),

    /// An error from the file-backed stores.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),

            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),

            // --- Upstream faults ---
            // A bad base URL is the caller's fault; everything else is a
            // gateway problem.
            AppError::Upstream(ComfyApiError::InvalidBaseUrl(_)) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                self.to_string(),
            ),
            AppError::Upstream(err) => {
                tracing::warn!(error = %err, "Upstream request failed");
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", err.to_string())
            }

            // --- Repeat runner errors ---
            AppError::Repeat(RepeatError::InvalidConfig(msg)) => {
                (StatusCode::BAD_REQUEST, "INVALID_CONFIG", (*msg).to_string())
            }
            AppError::Repeat(RepeatError::Persistence(err)) => {
                tracing::error!(error = %err, "Failed to persist repeat state");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "Failed to persist state".to_string(),
                )
            }

            // --- Store errors ---
            AppError::Store(err) => classify_store_error(err),

            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a store error into an HTTP status, error code, and message.
///
/// - Missing records map to 404.
/// - Malformed ids map to 400.
/// - Everything else is an I/O-level fault and maps to 500 with a
///   sanitized message.
fn classify_store_error(err: &StoreError) -> (StatusCode, &'static str, String) {
    match err {
        StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        StoreError::InvalidId { .. } => (StatusCode::BAD_REQUEST, "BAD_REQUEST", err.to_string()),
        other => {
            tracing::error!(error = %other, "Store error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                "An internal storage error occurred".to_string(),
            )
        }
    }
}
