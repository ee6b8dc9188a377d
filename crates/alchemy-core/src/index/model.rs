use uuid::Uuid;

use crate::model::{Persona, Phase};

/// Metadata carried alongside a vector, filterable at query time.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IndexPayload {
    /// Which phase produced the indexed prompt.
    pub phase: Phase,
    /// The prompt's persona.
    pub persona: Persona,
    /// Producer provider name.
    pub provider: String,
    /// Final ranked score at index time.
    pub score: f64,
    /// Session the indexed prompt belongs to.
    pub session_id: Uuid,
}

/// One match returned by [`crate::index::SemanticIndex::query`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IndexMatch {
    /// Prompt id.
    pub id: Uuid,
    /// Cosine similarity to the query vector, in `[-1, 1]`.
    pub similarity: f32,
    /// Metadata stored alongside the vector.
    pub payload: IndexPayload,
}

/// Filters applicable to a semantic query.
#[derive(Debug, Clone, Default)]
pub struct IndexFilters {
    /// Restrict to prompts produced by this provider.
    pub provider: Option<String>,
    /// Restrict to prompts from this phase.
    pub phase: Option<Phase>,
    /// Restrict to prompts of this persona.
    pub persona: Option<Persona>,
    /// Minimum score, inclusive.
    pub min_score: Option<f64>,
}
