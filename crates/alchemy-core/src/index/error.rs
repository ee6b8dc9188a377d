//! Semantic Index error types.

use thiserror::Error;

/// Errors returned by semantic index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Could not connect to the vector database endpoint.
    #[error("failed to connect to vector index at '{url}': {message}")]
    ConnectionFailed {
        /// Endpoint URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// Collection creation or existence check failed.
    #[error("failed to prepare collection '{collection}': {message}")]
    CollectionUnavailable {
        /// Collection name.
        collection: String,
        /// Error message.
        message: String,
    },

    /// Upsert failed.
    #[error("failed to upsert into '{collection}': {message}")]
    UpsertFailed {
        /// Collection name.
        collection: String,
        /// Error message.
        message: String,
    },

    /// Query failed.
    #[error("failed to query '{collection}': {message}")]
    QueryFailed {
        /// Collection name.
        collection: String,
        /// Error message.
        message: String,
    },

    /// Delete failed.
    #[error("failed to delete from '{collection}': {message}")]
    DeleteFailed {
        /// Collection name.
        collection: String,
        /// Error message.
        message: String,
    },

    /// A vector's dimension did not match the collection's configured
    /// dimension. Mixing dimensions in one collection is forbidden;
    /// the active embedding model must be changed via an explicit rebuild.
    #[error("vector dimension mismatch: collection expects {expected}, got {actual}")]
    DimensionMismatch {
        /// Collection's configured dimension.
        expected: usize,
        /// Dimension of the vector that was rejected.
        actual: usize,
    },
}

impl From<IndexError> for crate::error::EngineError {
    fn from(err: IndexError) -> Self {
        crate::error::EngineError::InternalError(err.to_string())
    }
}
