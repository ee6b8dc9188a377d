use chrono::{DateTime, Utc};

use crate::model::{Persona, Phase};

/// Filters shared by [`crate::store::PromptStore::search_text`] and
/// [`crate::store::PromptStore::hybrid`].
#[derive(Debug, Clone, Default)]
pub struct StoreFilters {
    /// Restrict to prompts produced by this provider.
    pub provider: Option<String>,
    /// Restrict to prompts from this phase.
    pub phase: Option<Phase>,
    /// Restrict to prompts of this persona.
    pub persona: Option<Persona>,
    /// Restrict to prompts carrying every one of these tags.
    pub tags: Vec<String>,
    /// Minimum score, inclusive.
    pub min_score: Option<f64>,
    /// Restrict to prompts created at or after this time.
    pub since: Option<DateTime<Utc>>,
    /// Restrict to prompts created at or before this time.
    pub until: Option<DateTime<Utc>>,
}

/// One increment to apply to a prompt's [`crate::model::MetricsRecord`] via
/// [`crate::store::PromptStore::update_metrics`].
#[derive(Debug, Clone, Copy)]
pub struct MetricsDelta {
    /// Latency of the use being recorded, in milliseconds.
    pub latency_ms: f64,
    /// Whether the use succeeded.
    pub success: bool,
}

/// A prompt returned by [`crate::store::PromptStore::hybrid`], carrying the
/// merged relevance score that produced its rank.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScoredPrompt {
    /// The matched prompt.
    pub prompt: crate::model::Prompt,
    /// Merged, normalized relevance score used to rank this result.
    pub relevance: f64,
}

/// Policy applied by [`crate::store::PromptStore::maintenance`] to prune
/// low-value prompts.
#[derive(Debug, Clone, Copy)]
pub struct MaintenancePolicy {
    /// Only prompts older than this are eligible for pruning.
    pub max_age: chrono::Duration,
    /// Only prompts scoring below this are eligible for pruning.
    pub max_score: f64,
}

impl Default for MaintenancePolicy {
    fn default() -> Self {
        Self {
            max_age: chrono::Duration::days(30),
            max_score: 3.0,
        }
    }
}
