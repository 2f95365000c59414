//! Durable store for named workflow templates.
//!
//! Each template is one JSON file under a directory, named `{id}.json`.
//! Ids are UUIDs minted on first save; on update the caller passes the id
//! back and the file is replaced.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use pylon_core::types::Timestamp;

use crate::fs::write_atomic;
use crate::StoreError;

/// A stored workflow template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub id: String,
    pub title: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// The workflow body, kept opaque.
    pub prompt_json: serde_json::Value,
}

/// Listing entry: template metadata without the workflow body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub id: String,
    pub title: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for creating or replacing a template.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertTemplate {
    /// Existing id to update, or `None` to mint a new one.
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub prompt_json: serde_json::Value,
    /// Original creation time, preserved across updates by the caller.
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

/// CRUD over the template directory.
pub struct WorkflowTemplateStore {
    dir: PathBuf,
}

impl WorkflowTemplateStore {
    /// Create a store backed by the given directory (conventionally
    /// `{data_dir}/prompts`).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// List all templates, sorted by file name.
    ///
    /// Unparsable files are skipped with a debug log rather than failing
    /// the whole listing.
    pub async fn list(&self) -> Result<Vec<TemplateSummary>, StoreError> {
        let mut read_dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Read {
                    path: self.dir.display().to_string(),
                    source: e,
                })
            }
        };

        let mut paths = Vec::new();
        while let Some(entry) = read_dir.next_entry().await.map_err(|e| StoreError::Read {
            path: self.dir.display().to_string(),
            source: e,
        })? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut items = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable template");
                    continue;
                }
            };
            match serde_json::from_slice::<TemplateSummary>(&bytes) {
                Ok(summary) => items.push(summary),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Skipping unparsable template");
                }
            }
        }
        Ok(items)
    }

    /// Fetch a template by id. `Ok(None)` if it does not exist.
    pub async fn get(&self, id: &str) -> Result<Option<WorkflowTemplate>, StoreError> {
        let path = self.template_path(id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Read {
                    path: path.display().to_string(),
                    source: e,
                })
            }
        };
        let template = serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(Some(template))
    }

    /// Create or replace a template. Mints a UUID id when none is given.
    pub async fn save(&self, input: UpsertTemplate) -> Result<WorkflowTemplate, StoreError> {
        let id = match input.id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => uuid::Uuid::new_v4().to_string(),
        };
        let path = self.template_path(&id)?;

        let now = chrono::Utc::now();
        let template = WorkflowTemplate {
            id,
            title: input.title,
            created_at: input.created_at.unwrap_or(now),
            updated_at: now,
            prompt_json: input.prompt_json,
        };

        let json = serde_json::to_string_pretty(&template)?;
        write_atomic(&path, &json).await?;
        Ok(template)
    }

    /// Delete a template by id.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let path = self.template_path(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound {
                entity: "template",
                id: id.to_string(),
            }),
            Err(e) => Err(StoreError::Write {
                path: path.display().to_string(),
                source: e,
            }),
        }
    }

    // ---- private helpers ----

    /// Resolve the file path for an id, rejecting anything that could
    /// escape the template directory. Ids we mint are UUIDs; never trust
    /// path input regardless.
    fn template_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidId {
                entity: "template",
                id: id.to_string(),
            });
        }
        Ok(self.dir.join(format!("{id}.json")))
    }
}
