//! Crate-wide error kind.
//!
//! Every component has its own error enum (`ConfigError`, `store::StoreError`,
//! `index::IndexError`, `providers::ProviderError`, `phases::PhaseError`,
//! `judge::JudgeError`, `optimizer::OptimizerError`). They all convert into
//! [`EngineError`] at the boundary a transport sits behind.

use thiserror::Error;

/// System-wide error kind.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Request shape was invalid (e.g. `count == 0`).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Caller is not authorized for this operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Upstream provider rate-limited the request.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited {
        /// Suggested backoff before retrying.
        retry_after_ms: u64,
    },

    /// A call exceeded its deadline.
    #[error("timed out after {elapsed_ms}ms")]
    Timeout {
        /// Elapsed time before the deadline fired.
        elapsed_ms: u64,
    },

    /// Upstream provider returned an error response.
    #[error("provider error: {0}")]
    ProviderError(String),

    /// The request's deadline expired or the caller dropped it.
    #[error("canceled")]
    Canceled,

    /// A store write conflicted with a concurrent write to the same row.
    #[error("store conflict: {0}")]
    StoreConflict(String),

    /// A phase produced zero surviving candidates.
    #[error("phase exhausted: {0}")]
    PhaseExhausted(String),

    /// The judge could not be reached or failed to parse a score.
    #[error("judge unavailable: {0}")]
    JudgeUnavailable(String),

    /// An invariant was violated inside the engine.
    #[error("internal error: {0}")]
    InternalError(String),
}

impl EngineError {
    /// Returns `true` for error kinds that should abort the request rather
    /// than retry, degrade, or attribute.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidInput(_)
                | EngineError::Unauthorized(_)
                | EngineError::Canceled
                | EngineError::InternalError(_)
        )
    }

    /// Short machine-readable code for transport error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidInput(_) => "invalid_input",
            EngineError::Unauthorized(_) => "unauthorized",
            EngineError::NotFound(_) => "not_found",
            EngineError::RateLimited { .. } => "rate_limited",
            EngineError::Timeout { .. } => "timeout",
            EngineError::ProviderError(_) => "provider_error",
            EngineError::Canceled => "canceled",
            EngineError::StoreConflict(_) => "store_conflict",
            EngineError::PhaseExhausted(_) => "phase_exhausted",
            EngineError::JudgeUnavailable(_) => "judge_unavailable",
            EngineError::InternalError(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_kinds_match_propagation_policy() {
        assert!(EngineError::InvalidInput("x".into()).is_fatal());
        assert!(EngineError::Unauthorized("x".into()).is_fatal());
        assert!(EngineError::Canceled.is_fatal());
        assert!(EngineError::InternalError("x".into()).is_fatal());

        assert!(!EngineError::Timeout { elapsed_ms: 1 }.is_fatal());
        assert!(!EngineError::PhaseExhausted("x".into()).is_fatal());
        assert!(!EngineError::JudgeUnavailable("x".into()).is_fatal());
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(EngineError::NotFound("p".into()).code(), "not_found");
        assert_eq!(
            EngineError::RateLimited { retry_after_ms: 10 }.code(),
            "rate_limited"
        );
    }
}
