use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading or running the local candle-based embedder.
#[derive(Debug, Error)]
pub enum LocalEmbedError {
    /// `config.json` or `model.safetensors` was not found under the
    /// configured model directory.
    #[error("local embedding model not found at {path}")]
    ModelNotFound {
        /// Missing model directory.
        path: PathBuf,
    },

    /// The on-disk config or weights could not be loaded.
    #[error("failed to load local embedding model: {reason}")]
    ModelLoadFailed {
        /// Underlying error message.
        reason: String,
    },

    /// Tokenization of the input text failed.
    #[error("local embedding tokenization failed: {reason}")]
    TokenizationFailed {
        /// Underlying error message.
        reason: String,
    },

    /// The forward pass failed.
    #[error("local embedding inference failed: {reason}")]
    InferenceFailed {
        /// Underlying error message.
        reason: String,
    },
}

impl From<candle_core::Error> for LocalEmbedError {
    fn from(err: candle_core::Error) -> Self {
        LocalEmbedError::InferenceFailed {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for LocalEmbedError {
    fn from(err: std::io::Error) -> Self {
        LocalEmbedError::ModelLoadFailed {
            reason: err.to_string(),
        }
    }
}

impl From<LocalEmbedError> for crate::providers::ProviderError {
    fn from(err: LocalEmbedError) -> Self {
        crate::providers::ProviderError::Upstream {
            provider: "local".to_string(),
            message: err.to_string(),
        }
    }
}
