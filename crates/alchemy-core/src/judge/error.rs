//! Judge error types.

use thiserror::Error;

/// Errors returned when asking the Judge to score or compare prompts.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// The underlying provider call failed.
    #[error("judge provider call failed: {0}")]
    ProviderFailed(#[from] crate::providers::ProviderError),

    /// The judge's response could not be parsed into a score/reasoning pair.
    #[error("could not parse judge response: {0}")]
    UnparseableResponse(String),

    /// The judge returned a score outside any recognized scale (`0..1` or
    /// `0..10`).
    #[error("judge score {0} is outside the recognized 0..1 or 0..10 scale")]
    ScoreOutOfRange(f64),
}

impl From<JudgeError> for crate::error::EngineError {
    fn from(err: JudgeError) -> Self {
        crate::error::EngineError::JudgeUnavailable(err.to_string())
    }
}
