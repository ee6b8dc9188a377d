//! Request/response shapes for [`crate::optimizer::Optimizer::optimize`].

use uuid::Uuid;

use crate::model::{Persona, Phase, Prompt};

/// Inputs to one optimizer run.
#[derive(Debug, Clone)]
pub struct OptimizerRequest {
    /// Session the seed and every iteration belong to.
    pub session_id: Uuid,
    /// The original raw user input the session started from.
    pub origin_input: String,
    /// Text of the prompt being optimized.
    pub seed_content: String,
    /// Phase the seed is recorded under; iterations inherit it.
    pub seed_phase: Phase,
    /// Target domain flavor.
    pub persona: Persona,
    /// Task description the Judge scores every iteration against.
    pub task: String,
    /// Provider used both to rewrite and, through the Judge, to score.
    pub optimizer_provider: String,
    /// Model name for the rewrite calls.
    pub optimizer_model: String,
    /// Hard cap on rewrite iterations. `0` returns the seed unscored-loop,
    /// i.e. scored once and returned unchanged.
    pub max_iterations: u32,
    /// Score at or above which the loop stops early.
    pub target_score: f64,
    /// Sampling temperature for rewrite calls.
    pub temperature: f64,
    /// Max tokens for rewrite calls.
    pub max_tokens: u32,
}

/// One rewrite step: the persisted prompt, its score, and why it got that
/// score (the Judge's reasoning, or a Ranker fallback note).
#[derive(Debug, Clone, serde::Serialize)]
pub struct OptimizerIteration {
    /// The rewritten prompt produced by this iteration. The seed is never
    /// listed here; it lives in [`OptimizeOutcome::original`].
    pub prompt: Prompt,
    /// Score on the `[0, 10]` scale.
    pub score: f64,
    /// Why it scored that way.
    pub reasoning: String,
}

/// Result of [`crate::optimizer::Optimizer::optimize`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct OptimizeOutcome {
    /// The persisted seed prompt.
    pub original: Prompt,
    /// The best-scoring prompt observed, including the seed.
    pub optimized: Prompt,
    /// The seed's score.
    pub original_score: f64,
    /// The optimized prompt's score.
    pub final_score: f64,
    /// Every rewrite step run, in order. Holds at most `max_iterations`
    /// entries and never includes the seed (see
    /// [`OptimizeOutcome::original`]).
    pub iterations: Vec<OptimizerIteration>,
    /// `true` if a rewrite call failed and the loop returned early with
    /// the best result seen so far rather than exhausting `max_iterations`
    /// or reaching `target_score`.
    pub partial: bool,
}
