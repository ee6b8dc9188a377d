//! Structured configuration, loadable from a TOML file and layered with
//! environment overrides, mirroring recognized option tree.

pub mod error;


pub use error::ConfigError;

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::constants::{DEFAULT_EMBEDDING_DIM, DEFAULT_RANKER_WEIGHTS, WEIGHT_SUM_TOLERANCE};

/// Default base URL advertised for a locally-hosted Ollama instance.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
/// Default Qdrant gRPC endpoint.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// Top-level configuration document.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the primary store file, vector collection, and
    /// WAL/sidecar files owned by the store engine.
    pub data_dir: PathBuf,

    /// `tracing` filter directive, e.g. `"info"` or `"alchemy_core=debug"`.
    pub log_level: String,

    /// Qdrant endpoint backing the Semantic Index.
    pub qdrant_url: String,

    /// Per-provider connection and routing settings, keyed by canonical
    /// provider name (`"openai"`, `"anthropic"`, `"ollama"`, ...).
    pub providers: HashMap<String, ProviderConfig>,

    /// Per-phase provider routing, keyed by phase slug
    /// (`"prima-materia"`, `"solutio"`, `"coagulatio"`).
    pub phases: HashMap<String, PhaseConfig>,

    /// Defaults applied to a generate request when the caller omits them.
    pub generation: GenerationConfig,

    /// Embedding model selection and caching behavior.
    pub embeddings: EmbeddingsConfig,

    /// Ranker weight configuration.
    pub ranking: RankingConfig,

    /// History Enhancer behavior.
    pub learning: LearningConfig,

    /// Lifecycle/shutdown tuning.
    pub lifecycle: LifecycleConfig,
}

/// Connection and routing settings for one provider.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API key. Typically left unset here and supplied via the provider's
    /// own conventional environment variable (e.g. `OPENAI_API_KEY`), which
    /// `genai` reads directly; set explicitly only to override that.
    pub api_key: Option<String>,
    /// Default chat model for this provider.
    pub model: String,
    /// Override base URL (self-hosted gateways, Ollama, Azure, ...).
    pub base_url: Option<String>,
    /// Per-call timeout, in seconds.
    pub timeout_secs: u64,
    /// Maximum concurrent in-flight calls to this provider.
    pub max_concurrent: usize,
    /// Ordered fallback models tried if `model` is unavailable.
    pub fallback_models: Vec<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: String::new(),
            base_url: None,
            timeout_secs: crate::constants::DEFAULT_CHAT_TIMEOUT_SECS,
            max_concurrent: 4,
            fallback_models: Vec::new(),
        }
    }
}

/// Which provider a given phase routes chat calls to.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    /// Canonical provider name (must be a key of [`Config::providers`]).
    pub provider: String,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
        }
    }
}

/// Defaults applied to a generate request when the caller omits them.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Sampling temperature used when a request does not specify one.
    pub default_temperature: f64,
    /// Max tokens requested per call when unspecified.
    pub default_max_tokens: u32,
    /// Variant count per phase when unspecified.
    pub default_count: u32,
    /// Whether per-phase variant calls run concurrently.
    pub use_parallel: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_temperature: 0.7,
            default_max_tokens: 1024,
            default_count: 1,
            use_parallel: true,
        }
    }
}

/// Embedding model selection, caching, and routing priority.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    /// Name of the embedding model to request by default.
    pub standard_model: String,
    /// Expected dimension of vectors produced by `standard_model`.
    pub standard_dimensions: usize,
    /// Providers tried, in order, when a named provider lacks embed
    /// capability.
    pub provider_priority: Vec<String>,
    /// Whether to cache embeddings of previously-seen text.
    pub cache_embeddings: bool,
    /// Minimum cosine similarity considered a semantic match.
    pub similarity_threshold: f32,
    /// Whether to fall back to a local candle-based embedder (requires the
    /// `local-embeddings` feature) when no configured provider can embed,
    /// e.g. an Ollama-only deployment with no cloud provider reachable.
    pub local_fallback: bool,
    /// Directory holding the local embedder's GGUF model and tokenizer, read
    /// only when `local_fallback` is set.
    pub local_model_dir: PathBuf,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            standard_model: "text-embedding-3-small".to_string(),
            standard_dimensions: DEFAULT_EMBEDDING_DIM,
            provider_priority: vec!["openai".to_string()],
            cache_embeddings: true,
            similarity_threshold: 0.75,
            local_fallback: false,
            local_model_dir: PathBuf::new(),
        }
    }
}

/// Ranker weight configuration; `weights` fields must sum to ~1.0.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// The five weight terms of the ranker's linear scoring function.
    pub weights: RankingWeights,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            weights: RankingWeights::default(),
        }
    }
}

/// One weight per ranker component function.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RankingWeights {
    /// Weight on `f_temperature`.
    pub temperature: f64,
    /// Weight on `f_tokens`.
    pub token: f64,
    /// Weight on `f_semantic`.
    pub semantic: f64,
    /// Weight on `f_length`.
    pub length: f64,
    /// Weight on `f_historical`.
    pub historical: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_RANKER_WEIGHTS[0],
            token: DEFAULT_RANKER_WEIGHTS[1],
            semantic: DEFAULT_RANKER_WEIGHTS[2],
            length: DEFAULT_RANKER_WEIGHTS[3],
            historical: DEFAULT_RANKER_WEIGHTS[4],
        }
    }
}

impl RankingWeights {
    /// Sum of all five weights.
    pub fn sum(&self) -> f64 {
        self.temperature + self.token + self.semantic + self.length + self.historical
    }

    /// `true` if the weights sum to within [`WEIGHT_SUM_TOLERANCE`] of 1.0.
    pub fn is_normalized(&self) -> bool {
        (self.sum() - 1.0).abs() < WEIGHT_SUM_TOLERANCE
    }
}

/// History Enhancer behavior.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Whether the enhancer runs at all; when `false`,
    /// `enhanced_input == input`.
    pub enabled: bool,
    /// Minimum stored score for a past prompt to be eligible as guidance.
    pub min_relevance_score: f64,
    /// Maximum number of past prompts summarized into guidance.
    pub max_examples: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_relevance_score: 7.0,
            max_examples: 5,
        }
    }
}

/// Shutdown grace period and request-deadline tuning.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Request-wide hard ceiling regardless of per-call timeouts, seconds.
    pub request_ceiling_secs: u64,
    /// How long graceful shutdown waits for in-flight requests, seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            request_ceiling_secs: crate::constants::DEFAULT_REQUEST_CEILING_SECS,
            shutdown_grace_secs: crate::constants::DEFAULT_SHUTDOWN_GRACE_SECS,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut providers = HashMap::new();
        providers.insert(
            "openai".to_string(),
            ProviderConfig {
                model: "gpt-4o-mini".to_string(),
                ..Default::default()
            },
        );
        providers.insert(
            "ollama".to_string(),
            ProviderConfig {
                model: "llama3.1".to_string(),
                base_url: Some(DEFAULT_OLLAMA_URL.to_string()),
                timeout_secs: crate::constants::DEFAULT_LOCAL_TIMEOUT_SECS,
                ..Default::default()
            },
        );

        let mut phases = HashMap::new();
        for phase in crate::constants::PHASE_ORDER {
            phases.insert(phase.slug().to_string(), PhaseConfig::default());
        }

        Self {
            data_dir: PathBuf::from("./.data"),
            log_level: "info".to_string(),
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            providers,
            phases,
            generation: GenerationConfig::default(),
            embeddings: EmbeddingsConfig::default(),
            ranking: RankingConfig::default(),
            learning: LearningConfig::default(),
            lifecycle: LifecycleConfig::default(),
        }
    }
}

impl Config {
    const ENV_DATA_DIR: &'static str = "ALCHEMY_DATA_DIR";
    const ENV_LOG_LEVEL: &'static str = "ALCHEMY_LOG_LEVEL";
    const ENV_QDRANT_URL: &'static str = "ALCHEMY_QDRANT_URL";
    const ENV_RANKING_WEIGHTS_TEMPERATURE: &'static str = "ALCHEMY_RANKING_WEIGHTS_TEMPERATURE";
    const ENV_RANKING_WEIGHTS_TOKEN: &'static str = "ALCHEMY_RANKING_WEIGHTS_TOKEN";
    const ENV_RANKING_WEIGHTS_SEMANTIC: &'static str = "ALCHEMY_RANKING_WEIGHTS_SEMANTIC";
    const ENV_RANKING_WEIGHTS_LENGTH: &'static str = "ALCHEMY_RANKING_WEIGHTS_LENGTH";
    const ENV_RANKING_WEIGHTS_HISTORICAL: &'static str = "ALCHEMY_RANKING_WEIGHTS_HISTORICAL";
    const ENV_EMBEDDINGS_STANDARD_DIMENSIONS: &'static str = "ALCHEMY_EMBEDDINGS_STANDARD_DIMENSIONS";
    const ENV_EMBEDDINGS_LOCAL_FALLBACK: &'static str = "ALCHEMY_EMBEDDINGS_LOCAL_FALLBACK";
    const ENV_EMBEDDINGS_LOCAL_MODEL_DIR: &'static str = "ALCHEMY_EMBEDDINGS_LOCAL_MODEL_DIR";

    /// Loads configuration from a TOML file at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Loads configuration from `Default`, then layers environment
    /// variable overrides on top of the nested option tree.
    ///
    /// Per-provider API keys are intentionally left to each provider's own
    /// conventional environment variable (read directly by `genai`), rather
    /// than routed through `ALCHEMY_PROVIDERS_<NAME>_API_KEY`, to avoid
    /// duplicating well-known variable names like `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        Self::apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Loads from `path` if it exists, otherwise `Default`, then applies
    /// environment overrides either way.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        Self::apply_env_overrides(&mut config)?;
        Ok(config)
    }

    fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
        if let Ok(v) = env::var(Self::ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var(Self::ENV_LOG_LEVEL) {
            config.log_level = v;
        }
        if let Ok(v) = env::var(Self::ENV_QDRANT_URL) {
            config.qdrant_url = v;
        }
        Self::apply_weight_override(
            Self::ENV_RANKING_WEIGHTS_TEMPERATURE,
            &mut config.ranking.weights.temperature,
        )?;
        Self::apply_weight_override(
            Self::ENV_RANKING_WEIGHTS_TOKEN,
            &mut config.ranking.weights.token,
        )?;
        Self::apply_weight_override(
            Self::ENV_RANKING_WEIGHTS_SEMANTIC,
            &mut config.ranking.weights.semantic,
        )?;
        Self::apply_weight_override(
            Self::ENV_RANKING_WEIGHTS_LENGTH,
            &mut config.ranking.weights.length,
        )?;
        Self::apply_weight_override(
            Self::ENV_RANKING_WEIGHTS_HISTORICAL,
            &mut config.ranking.weights.historical,
        )?;
        if let Ok(v) = env::var(Self::ENV_EMBEDDINGS_STANDARD_DIMENSIONS) {
            config.embeddings.standard_dimensions =
                v.parse().unwrap_or(config.embeddings.standard_dimensions);
        }
        if let Ok(v) = env::var(Self::ENV_EMBEDDINGS_LOCAL_FALLBACK) {
            config.embeddings.local_fallback = matches!(v.as_str(), "1" | "true" | "TRUE");
        }
        if let Ok(v) = env::var(Self::ENV_EMBEDDINGS_LOCAL_MODEL_DIR) {
            config.embeddings.local_model_dir = PathBuf::from(v);
        }
        Ok(())
    }

    fn apply_weight_override(var_name: &'static str, slot: &mut f64) -> Result<(), ConfigError> {
        if let Ok(v) = env::var(var_name) {
            *slot = v
                .parse()
                .map_err(|source| ConfigError::EnvParseFailed {
                    name: var_name,
                    value: v,
                    source,
                })?;
        }
        Ok(())
    }

    /// Validates cross-field invariants: ranking weights sum to ~1.0,
    /// timeouts/concurrency are positive, and phase provider references
    /// resolve against the registered providers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.ranking.weights.is_normalized() {
            return Err(ConfigError::WeightsDoNotSumToOne {
                actual: self.ranking.weights.sum(),
            });
        }

        for (name, provider) in &self.providers {
            if provider.timeout_secs == 0 {
                return Err(ConfigError::NonPositiveTimeout {
                    field: "providers.timeout_secs",
                    secs: provider.timeout_secs,
                });
            }
            if provider.max_concurrent == 0 {
                return Err(ConfigError::NonPositiveTimeout {
                    field: "providers.max_concurrent",
                    secs: 0,
                });
            }
            let _ = name;
        }

        for (phase_slug, phase_config) in &self.phases {
            if !self.providers.contains_key(&phase_config.provider) {
                return Err(ConfigError::UnknownPhaseProvider {
                    phase: phase_slug.clone(),
                    provider: phase_config.provider.clone(),
                });
            }
        }

        Ok(())
    }

    /// Resolves which provider a phase routes to, falling back to the
    /// first registered provider if the phase has no explicit entry.
    pub fn provider_for_phase(&self, phase: crate::model::Phase) -> Option<&str> {
        self.phases
            .get(phase.slug())
            .map(|p| p.provider.as_str())
            .or_else(|| self.providers.keys().next().map(String::as_str))
    }
}
