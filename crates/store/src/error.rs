/// Errors from the file-backed stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading a record from disk failed (other than it not existing).
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing, renaming, or deleting a record on disk failed.
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be serialized to JSON.
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    /// A record on disk could not be parsed.
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The requested record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The caller-supplied id is not a valid record id.
    #[error("invalid {entity} id: {id}")]
    InvalidId { entity: &'static str, id: String },
}
