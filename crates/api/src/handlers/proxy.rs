//! Pass-through handlers for upstream ComfyUI endpoints.
//!
//! These forward responses verbatim (no envelope): callers see exactly
//! what the upstream instance answered. Node metadata is cached per base
//! URL for the lifetime of the process.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Query string carrying just the upstream base URL.
#[derive(Debug, Deserialize)]
pub struct BaseUrlQuery {
    #[serde(default)]
    pub base_url: String,
}

/// Query string for `GET /api/v1/history`.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub base_url: String,
    pub prompt_id: String,
}

/// Query string for `GET /api/v1/view`.
#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    #[serde(default)]
    pub base_url: String,
    pub filename: String,
    #[serde(default)]
    pub subfolder: Option<String>,
    #[serde(default, rename = "type")]
    pub file_type: Option<String>,
}

/// GET /api/v1/object_info
///
/// Node metadata for every registered node class, cached per base URL.
pub async fn object_info(
    State(state): State<AppState>,
    Query(query): Query<BaseUrlQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let key = query.base_url.trim().trim_end_matches('/').to_string();

    if let Some(cached) = state.object_info_cache.read().await.get(&key) {
        return Ok(Json(cached.clone()));
    }

    let data = state.comfy.object_info(&query.base_url).await?;
    state
        .object_info_cache
        .write()
        .await
        .insert(key, data.clone());

    Ok(Json(data))
}

/// GET /api/v1/object_info/{node_class}
///
/// Node metadata for a single class. Uncached: callers use this for
/// freshly installed custom nodes.
pub async fn object_info_class(
    State(state): State<AppState>,
    Path(node_class): Path<String>,
    Query(query): Query<BaseUrlQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let data = state
        .comfy
        .object_info_class(&query.base_url, &node_class)
        .await?;
    Ok(Json(data))
}

/// GET /api/v1/history
///
/// Execution history for one job, forwarded verbatim.
pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let data = state
        .comfy
        .history(&query.base_url, &query.prompt_id)
        .await?;
    Ok(Json(data))
}

/// GET /api/v1/view
///
/// Stream a generated file from upstream, preserving its content type.
pub async fn view(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> AppResult<Response> {
    let upstream = state
        .comfy
        .view(
            &query.base_url,
            &query.filename,
            query.subfolder.as_deref(),
            query.file_type.as_deref(),
        )
        .await?;

    let content_type = upstream.headers().get(CONTENT_TYPE).cloned();

    let mut builder = Response::builder();
    if let Some(content_type) = content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    builder
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| AppError::Internal(format!("failed to build view response: {e}")))
}
