//! Prompt Store error types.

use thiserror::Error;

/// Errors returned by [`crate::store::PromptStore`] operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not open or migrate the backing database file.
    #[error("failed to open store at '{path}': {source}")]
    ConnectionFailed {
        /// Filesystem path (or `sqlite::memory:`-style URL) the store was
        /// opened against.
        path: String,
        /// Underlying sqlx error.
        #[source]
        source: sqlx::Error,
    },

    /// A query or write failed against an already-open pool.
    #[error("store query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),

    /// The requested prompt id has no matching row.
    #[error("no prompt with id {0}")]
    NotFound(uuid::Uuid),

    /// A stored row could not be decoded back into its domain type (tags
    /// JSON, fingerprint length, embedding byte length).
    #[error("corrupt row: {0}")]
    Decode(String),
}

impl From<StoreError> for crate::error::EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => crate::error::EngineError::NotFound(id.to_string()),
            other => crate::error::EngineError::StoreConflict(other.to_string()),
        }
    }
}
