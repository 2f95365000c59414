//! Shared helpers for API integration tests.
//!
//! `build_test_app` mirrors the router construction in `main.rs` so the
//! tests exercise the same middleware stack (CORS, request ID, timeout,
//! tracing, panic recovery) that production uses, with a caller-supplied
//! [`JobClient`] so no real upstream is needed.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tokio::sync::RwLock;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use pylon_api::config::ServerConfig;
use pylon_api::routes;
use pylon_api::state::AppState;
use pylon_comfyui::{ComfyApi, ComfyApiError};
use pylon_repeat::{JobClient, RepeatConfig, RepeatRunner};
use pylon_store::{RepeatStateStore, SettingsStore, WorkflowTemplateStore};

/// Build a test `ServerConfig` rooted at the given data directory.
pub fn test_config(data_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        data_dir: data_dir.to_path_buf(),
    }
}

/// Repeat timing shrunk so loop-dependent tests settle in milliseconds.
pub fn fast_repeat_config() -> RepeatConfig {
    RepeatConfig {
        poll_interval: Duration::from_millis(10),
        error_backoff: Duration::from_millis(10),
    }
}

/// A [`JobClient`] whose every cycle submits fine and completes on the
/// first poll.
pub struct ImmediateJobClient;

#[async_trait::async_trait]
impl JobClient for ImmediateJobClient {
    async fn submit(
        &self,
        _base_url: &str,
        _client_id: &str,
        _prompt: &serde_json::Value,
    ) -> Result<String, ComfyApiError> {
        Ok("job-test".to_string())
    }

    async fn completed(&self, _base_url: &str, _prompt_id: &str) -> Result<bool, ComfyApiError> {
        Ok(true)
    }
}

/// Build the full application router with all middleware layers.
pub async fn build_test_app(data_dir: &Path, job_client: Arc<dyn JobClient>) -> Router {
    let config = test_config(data_dir);

    let repeat = RepeatRunner::new(
        RepeatStateStore::new(config.repeat_state_path()),
        job_client,
        fast_repeat_config(),
    )
    .await;

    let state = AppState {
        settings: Arc::new(SettingsStore::new(config.settings_path())),
        templates: Arc::new(WorkflowTemplateStore::new(config.prompts_dir())),
        config: Arc::new(config),
        comfy: Arc::new(ComfyApi::new()),
        repeat,
        object_info_cache: Arc::new(RwLock::new(HashMap::new())),
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

/// Collect a response body into parsed JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// Build a JSON request.
pub fn json_request(method: Method, uri: &str, body: serde_json::Value) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build a body-less request.
pub fn empty_request(method: Method, uri: &str) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}
