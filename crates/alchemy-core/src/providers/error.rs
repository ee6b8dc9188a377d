//! Provider failure taxonomy.

use thiserror::Error;

/// Failure kinds a single provider call can produce.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No API key configured, or the endpoint is unreachable.
    #[error("provider '{0}' unavailable")]
    Unavailable(String),

    /// Upstream rate-limited the call; retry after the given backoff.
    #[error("provider '{provider}' rate limited, retry after {retry_after_ms}ms")]
    RateLimited {
        /// Provider name.
        provider: String,
        /// Suggested backoff before retrying.
        retry_after_ms: u64,
    },

    /// Call exceeded its configured timeout.
    #[error("provider '{provider}' timed out after {elapsed_ms}ms")]
    Timeout {
        /// Provider name.
        provider: String,
        /// Elapsed time before the deadline fired.
        elapsed_ms: u64,
    },

    /// Upstream returned a 4xx/5xx response carrying an error message.
    #[error("provider '{provider}' error: {message}")]
    Upstream {
        /// Provider name.
        provider: String,
        /// Upstream-provided message.
        message: String,
    },

    /// The response could not be parsed into the expected shape.
    #[error("provider '{provider}' returned a malformed response: {reason}")]
    MalformedResponse {
        /// Provider name.
        provider: String,
        /// What was wrong with the response.
        reason: String,
    },

    /// The caller's deadline expired or the request was dropped.
    #[error("provider call canceled")]
    Canceled,

    /// No provider in the requested or fallback chain supports the
    /// requested capability (e.g. embeddings).
    #[error("no provider available supporting capability '{capability}'")]
    NoCapableProvider {
        /// Capability that could not be satisfied (e.g. `"embed"`).
        capability: &'static str,
    },
}

impl ProviderError {
    /// `true` for kinds retried with backoff (`Timeout`, `RateLimited`);
    /// all others propagate immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout { .. } | ProviderError::RateLimited { .. }
        )
    }

    /// Suggested backoff before retrying, if the kind carries one.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms, .. } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

impl From<ProviderError> for crate::error::EngineError {
    fn from(err: ProviderError) -> Self {
        use crate::error::EngineError;
        match err {
            ProviderError::Unavailable(p) => EngineError::ProviderError(format!("{p} unavailable")),
            ProviderError::RateLimited { retry_after_ms, .. } => {
                EngineError::RateLimited { retry_after_ms }
            }
            ProviderError::Timeout { elapsed_ms, .. } => EngineError::Timeout { elapsed_ms },
            ProviderError::Upstream { message, .. } => EngineError::ProviderError(message),
            ProviderError::MalformedResponse { reason, .. } => EngineError::ProviderError(reason),
            ProviderError::Canceled => EngineError::Canceled,
            ProviderError::NoCapableProvider { capability } => {
                EngineError::ProviderError(format!("no provider supports '{capability}'"))
            }
        }
    }
}
