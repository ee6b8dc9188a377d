//! Configuration error types.

use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read from disk.
    #[error("failed to read config file {path}: {source}")]
    ReadFailed {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file's TOML could not be parsed.
    #[error("failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),

    /// A numeric environment variable failed to parse.
    #[error("failed to parse env var '{name}' value '{value}': {source}")]
    EnvParseFailed {
        /// Variable name.
        name: &'static str,
        /// Raw string value that failed to parse.
        value: String,
        /// Underlying parse error.
        #[source]
        source: std::num::ParseFloatError,
    },

    /// Ranking weights did not sum to ~1.0.
    #[error("ranking weights sum to {actual}, expected ~1.0")]
    WeightsDoNotSumToOne {
        /// Observed sum.
        actual: f64,
    },

    /// A configured timeout was zero or negative.
    #[error("{field} must be a positive duration, got {secs}s")]
    NonPositiveTimeout {
        /// Offending field's dotted path.
        field: &'static str,
        /// Offending value, in seconds.
        secs: u64,
    },

    /// A phase referenced a provider name not present in `providers`.
    #[error("phase '{phase}' references unknown provider '{provider}'")]
    UnknownPhaseProvider {
        /// Phase name.
        phase: String,
        /// Provider name the phase referenced.
        provider: String,
    },

    /// A required environment variable was not set.
    ///
    /// Not raised by any current validation path — every option here has a
    /// workable default — but `validate()` callers adding stricter
    /// deployment policies (e.g. "API key must come from the environment in
    /// production") should return this variant rather than inventing a new
    /// one.
    #[error("missing required environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: &'static str,
    },
}
