//! Shared filesystem helper: atomic replace-on-write.

use std::path::Path;

use crate::StoreError;

/// Write `contents` to `path` atomically: write a sibling temp file, then
/// rename it over the target. Creates the parent directory if needed.
pub(crate) async fn write_atomic(path: &Path, contents: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
    }

    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, contents)
        .await
        .map_err(|e| StoreError::Write {
            path: tmp.display().to_string(),
            source: e,
        })?;

    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| StoreError::Write {
            path: path.display().to_string(),
            source: e,
        })
}
