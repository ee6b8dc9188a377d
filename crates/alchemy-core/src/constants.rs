//! Cross-cutting, shared constants.
//!
//! Prefer deriving secondary constants from primary ones to avoid drift.
//!
//! # Dimension invariants
//!
//! The embedding dimension is a runtime value (it tracks whichever embedding
//! model is configured), not a compile-time one, but every stored [`crate::model::Embedding`]
//! must agree with [`Config::embeddings.standard_dimensions`](crate::config::EmbeddingsConfig)
//! at write time. Use [`validate_embedding_dim`] at module boundaries.

use crate::model::Phase;

/// Default embedding dimension (OpenAI `text-embedding-3-small`-class models).
pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

/// Canonical phase order. Requests may restrict to a prefix but never reorder.
pub const PHASE_ORDER: [Phase; 3] = [Phase::PrimaMateria, Phase::Solutio, Phase::Coagulatio];

/// Default ranker weights (`w_t, w_k, w_s, w_l, w_h`), summing to 1.0.
pub const DEFAULT_RANKER_WEIGHTS: [f64; 5] = [0.2, 0.2, 0.3, 0.1, 0.2];

/// Tolerance used when validating that ranker weights sum to ~1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Score scale used everywhere in the core; scores are normalized onto
/// this range at ingress.
pub const SCORE_MIN: f64 = 0.0;
/// See [`SCORE_MIN`].
pub const SCORE_MAX: f64 = 10.0;

/// Default per-provider timeout for chat calls.
pub const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 30;
/// Default per-provider timeout for embedding calls.
pub const DEFAULT_EMBED_TIMEOUT_SECS: u64 = 5;
/// Default per-provider timeout for local models.
pub const DEFAULT_LOCAL_TIMEOUT_SECS: u64 = 120;
/// Request-wide hard ceiling regardless of per-call timeouts.
pub const DEFAULT_REQUEST_CEILING_SECS: u64 = 600;
/// Default graceful-shutdown grace period.
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;

/// Availability cooldown applied to a provider after it is marked unavailable.
pub const PROVIDER_COOLDOWN_SECS: u64 = 60;
/// Maximum retry attempts for `Timeout`/`RateLimited` provider errors.
pub const MAX_PROVIDER_RETRIES: u32 = 3;

/// Default batch worker pool size.
pub const DEFAULT_BATCH_WORKERS: usize = 3;
/// Maximum configurable batch worker pool size.
pub const MAX_BATCH_WORKERS: usize = 20;

/// Excludes enhancer candidates whose origin chain depth exceeds this, to
/// prevent feedback loops.
pub const MAX_ENHANCEMENT_ORIGIN_DEPTH: u32 = 2;

/// Optimizer loop gives up after this many consecutive iterations that
/// each regress the score by more than this margin.
pub const OPTIMIZER_REGRESSION_EPSILON: f64 = 0.3;
/// Consecutive regressing iterations tolerated before the optimizer
/// returns the best-so-far result.
pub const OPTIMIZER_MAX_CONSECUTIVE_REGRESSIONS: u32 = 2;

/// Error returned when a runtime embedding dimension disagrees with the
/// dimension recorded for the active embedding model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DimValidationError {
    /// Embedding dimension cannot be zero.
    #[error("embedding dimension cannot be zero")]
    ZeroDimension,
    /// Runtime dimension does not match the expected dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension registered for the active embedding model.
        expected: usize,
        /// Dimension actually observed.
        actual: usize,
    },
}

/// Validates that a runtime embedding dimension matches the expected
/// dimension. Mixing dimensions in the same index is forbidden.
pub fn validate_embedding_dim(actual: usize, expected: usize) -> Result<(), DimValidationError> {
    if expected == 0 || actual == 0 {
        return Err(DimValidationError::ZeroDimension);
    }
    if actual != expected {
        return Err(DimValidationError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        let sum: f64 = DEFAULT_RANKER_WEIGHTS.iter().sum();
        assert!((sum - 1.0).abs() < WEIGHT_SUM_TOLERANCE);
    }

    #[test]
    fn phase_order_is_canonical() {
        assert_eq!(
            PHASE_ORDER,
            [Phase::PrimaMateria, Phase::Solutio, Phase::Coagulatio]
        );
    }

    #[test]
    fn validate_embedding_dim_match() {
        assert!(validate_embedding_dim(1536, 1536).is_ok());
    }

    #[test]
    fn validate_embedding_dim_mismatch() {
        assert_eq!(
            validate_embedding_dim(768, 1536),
            Err(DimValidationError::DimensionMismatch {
                expected: 1536,
                actual: 768
            })
        );
    }

    #[test]
    fn validate_embedding_dim_zero() {
        assert_eq!(
            validate_embedding_dim(0, 1536),
            Err(DimValidationError::ZeroDimension)
        );
    }
}
