//! Durable store for the flat settings document.

use std::path::PathBuf;

use crate::fs::write_atomic;
use crate::StoreError;

/// Stores application settings as one JSON object on disk.
///
/// The document is schemaless on purpose: callers read and replace it
/// wholesale (the UI currently keeps `default_comfy_base_url` in it).
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Create a store backed by the given file path (conventionally
    /// `{data_dir}/settings.json`).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the settings document; missing or unreadable files yield an
    /// empty object with a logged warning.
    pub async fn load(&self) -> serde_json::Value {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return serde_json::json!({});
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to read settings, using empty document",
                );
                return serde_json::json!({});
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Settings file is corrupt, using empty document",
                );
                serde_json::json!({})
            }
        }
    }

    /// Replace the settings document.
    pub async fn save(&self, settings: &serde_json::Value) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(settings)?;
        write_atomic(&self.path, &json).await
    }
}
