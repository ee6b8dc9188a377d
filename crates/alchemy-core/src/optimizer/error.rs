//! Optimizer error types.

use thiserror::Error;

/// Errors returned by [`crate::optimizer::Optimizer::optimize`].
#[derive(Debug, Error)]
pub enum OptimizerError {
    /// The prompt store rejected a write or read mid-loop.
    #[error("store failure: {0}")]
    Store(#[from] crate::store::StoreError),

    /// The semantic index rejected an upsert mid-loop.
    #[error("index failure: {0}")]
    Index(#[from] crate::index::IndexError),

    /// Embedding a candidate failed.
    #[error("embedding failure: {0}")]
    Provider(#[from] crate::providers::ProviderError),
}

impl From<OptimizerError> for crate::error::EngineError {
    fn from(err: OptimizerError) -> Self {
        use crate::error::EngineError;
        match err {
            OptimizerError::Store(e) => EngineError::InternalError(e.to_string()),
            OptimizerError::Index(e) => EngineError::InternalError(e.to_string()),
            OptimizerError::Provider(e) => EngineError::ProviderError(e.to_string()),
        }
    }
}
