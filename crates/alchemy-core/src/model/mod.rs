//! The domain model: prompts, embeddings, sessions, relationships, metrics.

mod embedding;
mod metrics;
mod prompt;
mod relationship;
mod session;


pub use embedding::Embedding;
pub use metrics::MetricsRecord;
pub use prompt::{Persona, Phase, Prompt, PromptBuilder};
pub use relationship::{Relationship, RelationshipKind};
pub use session::Session;

/// Per-phase/strategy selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One variant selected per phase via Judge/Ranker.
    Best,
    /// Each phase's variants seed the next phase; one selected winner per phase.
    Cascade,
    /// Every variant of every phase is returned, no selection.
    All,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Strategy::Best => "best",
            Strategy::Cascade => "cascade",
            Strategy::All => "all",
        };
        write!(f, "{s}")
    }
}
