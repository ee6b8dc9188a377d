//! Request/response shapes for Transport B (and reused as Transport A tool
//! argument/result shapes) that have no 1:1 counterpart in `alchemy_core`.

use uuid::Uuid;

use alchemy_core::model::{Persona, Prompt};
use alchemy_core::optimizer::OptimizeOutcome;
use alchemy_core::phases::GenerateOutcome;
use alchemy_core::providers::ProviderInfo;
use alchemy_core::store::ScoredPrompt;

/// `GET /health` response.
#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub providers: usize,
    pub database: &'static str,
}

/// `POST /api/v1/prompts/generate` response. Wraps [`GenerateOutcome`] with
/// the wall-clock time the request took, since the engine itself has no
/// notion of a request boundary.
#[derive(Debug, serde::Serialize)]
pub struct GenerateResponseBody {
    pub prompts: Vec<Prompt>,
    pub session_id: Uuid,
    pub processing_time_ms: u64,
    pub degraded: bool,
    pub temperature_clamped: bool,
}

impl GenerateResponseBody {
    pub fn new(outcome: GenerateOutcome, processing_time_ms: u64) -> Self {
        Self {
            prompts: outcome.prompts,
            session_id: outcome.session_id,
            processing_time_ms,
            degraded: outcome.degraded,
            temperature_clamped: outcome.temperature_clamped,
        }
    }
}

/// `POST /api/v1/prompts/optimize` request body. Distinct from
/// [`alchemy_core::optimizer::OptimizerRequest`]: the client supplies a
/// persona and seed text, and the server resolves the session, optimizer
/// provider, and optimizer model from configuration.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OptimizeRequestBody {
    /// Text of the prompt to optimize.
    pub seed_content: String,
    /// Target domain flavor.
    pub persona: Persona,
    /// Task description the Judge scores each iteration against.
    pub task: String,
    /// Score at or above which the loop stops early.
    pub target_score: f64,
    /// Hard cap on rewrite iterations; defaults to the engine's Ranker
    /// fallback cap when omitted.
    #[serde(default)]
    pub max_iterations: Option<u32>,
    /// Overrides the phase-routed optimizer provider.
    #[serde(default)]
    pub provider: Option<String>,
    /// Overrides the provider's default model for rewrite calls.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Default optimizer iteration cap when a request omits one.
pub const DEFAULT_OPTIMIZE_MAX_ITERATIONS: u32 = 5;

/// `POST /api/v1/prompts/optimize` response.
#[derive(Debug, serde::Serialize)]
pub struct OptimizeResponseBody {
    pub original: Prompt,
    pub optimized: Prompt,
    pub original_score: f64,
    pub final_score: f64,
    pub iterations: Vec<alchemy_core::optimizer::OptimizerIteration>,
    pub partial: bool,
}

impl From<OptimizeOutcome> for OptimizeResponseBody {
    fn from(outcome: OptimizeOutcome) -> Self {
        Self {
            original: outcome.original,
            optimized: outcome.optimized,
            original_score: outcome.original_score,
            final_score: outcome.final_score,
            iterations: outcome.iterations,
            partial: outcome.partial,
        }
    }
}

/// `GET /api/v1/prompts/search` query parameters, and the equivalent
/// `search_prompts` RPC tool's arguments.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SearchQuery {
    pub query: String,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub phase: Option<alchemy_core::model::Phase>,
    #[serde(default)]
    pub persona: Option<Persona>,
    #[serde(default)]
    pub min_score: Option<f64>,
    /// Embedding-backed retrieval in addition to the text match; when
    /// `false`, equivalent to a plain [`alchemy_core::store::PromptStore::search_text`] call.
    #[serde(default = "default_true")]
    pub semantic: bool,
}

fn default_true() -> bool {
    true
}

/// Default and maximum page size for search/batch pagination.
pub const DEFAULT_SEARCH_LIMIT: i64 = 20;
pub const MAX_SEARCH_LIMIT: i64 = 100;

/// `GET /api/v1/prompts/search` response.
#[derive(Debug, serde::Serialize)]
pub struct SearchResponseBody {
    pub results: Vec<ScoredPrompt>,
    pub page: i64,
    pub limit: i64,
}

/// `POST /api/v1/prompts/batch` request body.
#[derive(Debug, serde::Deserialize)]
pub struct BatchRequestBody {
    pub inputs: Vec<alchemy_core::phases::GenerateRequest>,
    #[serde(default)]
    pub workers: Option<usize>,
}

/// One entry of a `POST /api/v1/prompts/batch` response: either the
/// generate outcome or an error record, never both, keyed by the input's
/// position in the request so callers can correlate results without a
/// caller-assigned id.
#[derive(Debug, serde::Serialize)]
pub struct BatchResultEntry {
    pub index: usize,
    pub result: Option<GenerateResponseBody>,
    pub error: Option<crate::gateway::error::RpcError>,
}

/// `POST /api/v1/prompts/batch` response.
#[derive(Debug, serde::Serialize)]
pub struct BatchResponseBody {
    pub results: Vec<BatchResultEntry>,
}

/// `GET /api/v1/providers` response.
#[derive(Debug, serde::Serialize)]
pub struct ProvidersResponseBody {
    pub providers: Vec<ProviderInfo>,
}
