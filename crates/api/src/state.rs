use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use pylon_comfyui::ComfyApi;
use pylon_repeat::RepeatRunner;
use pylon_store::{SettingsStore, WorkflowTemplateStore};

use crate::config::ServerConfig;

/// Cache for upstream node metadata, keyed by normalized base URL.
///
/// ComfyUI's `/object_info` payload is large and changes only when the
/// instance restarts, so one fetch per base URL per process is enough.
pub type ObjectInfoCache = Arc<RwLock<HashMap<String, serde_json::Value>>>;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Upstream ComfyUI REST client.
    pub comfy: Arc<ComfyApi>,
    /// The recurring-job runner.
    pub repeat: RepeatRunner,
    /// Settings document store.
    pub settings: Arc<SettingsStore>,
    /// Workflow template store.
    pub templates: Arc<WorkflowTemplateStore>,
    /// Node metadata cache.
    pub object_info_cache: ObjectInfoCache,
}
