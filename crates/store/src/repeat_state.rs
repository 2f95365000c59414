//! Durable store for the repeat runner's single state record.

use std::path::PathBuf;

use pylon_core::repeat::RepeatState;

use crate::fs::write_atomic;
use crate::StoreError;

/// Stores the [`RepeatState`] record as one pretty-printed JSON file.
///
/// Loading is infallible by design: a missing, unreadable, or corrupt
/// record yields the defaults with a logged warning, so the runner always
/// has a usable record at startup. Saving propagates failures to the
/// caller -- durability problems must be visible to whoever mutated the
/// state.
pub struct RepeatStateStore {
    path: PathBuf,
}

impl RepeatStateStore {
    /// Create a store backed by the given file path (conventionally
    /// `{data_dir}/repeat_state.json`).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the persisted record, falling back to defaults.
    pub async fn load(&self) -> RepeatState {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return RepeatState::default();
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to read repeat state, using defaults",
                );
                return RepeatState::default();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Repeat state file is corrupt, using defaults",
                );
                RepeatState::default()
            }
        }
    }

    /// Persist the record, replacing the previous one wholesale.
    pub async fn save(&self, state: &RepeatState) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(state)?;
        write_atomic(&self.path, &json).await
    }
}
