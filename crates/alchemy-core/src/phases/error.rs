//! Phase Engine error types.

use thiserror::Error;

use crate::model::Phase;

/// Errors returned by [`crate::phases::PhaseEngine::generate`].
#[derive(Debug, Error)]
pub enum PhaseError {
    /// Request shape was invalid (e.g. `count == 0`, empty `phases`, or a
    /// non-prefix phase selection).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A phase produced zero surviving candidates: every variant call for
    /// that phase failed.
    #[error("phase '{phase}' exhausted: {reason}")]
    PhaseExhausted {
        /// The phase that produced no surviving candidates.
        phase: Phase,
        /// Why every candidate call failed.
        reason: String,
    },

    /// The prompt store rejected a write or read mid-pipeline.
    #[error("store failure: {0}")]
    Store(#[from] crate::store::StoreError),

    /// The semantic index rejected an upsert mid-pipeline.
    #[error("index failure: {0}")]
    Index(#[from] crate::index::IndexError),

    /// The trailing optimizer run failed outright (store/index failure, not
    /// a Judge outage, which the optimizer already absorbs as a partial
    /// result).
    #[error("optimizer failure: {0}")]
    Optimizer(#[from] crate::optimizer::OptimizerError),
}

impl From<PhaseError> for crate::error::EngineError {
    fn from(err: PhaseError) -> Self {
        use crate::error::EngineError;
        match err {
            PhaseError::InvalidInput(msg) => EngineError::InvalidInput(msg),
            PhaseError::PhaseExhausted { phase, reason } => {
                EngineError::PhaseExhausted(format!("{phase}: {reason}"))
            }
            PhaseError::Store(e) => EngineError::InternalError(e.to_string()),
            PhaseError::Index(e) => EngineError::InternalError(e.to_string()),
            PhaseError::Optimizer(e) => EngineError::InternalError(e.to_string()),
        }
    }
}
