//! Request/response shapes for [`crate::phases::PhaseEngine::generate`].

use uuid::Uuid;

use crate::model::{Persona, Phase, Prompt, Strategy};

/// One phase's lifecycle state. Not persisted; carried on [`PhaseTrace`]
/// for callers that want visibility into a degraded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseState {
    /// Not yet started.
    Pending,
    /// Variant calls issued, awaiting responses.
    Dispatched,
    /// Responses collected, not yet scored.
    Collecting,
    /// Candidates scored and ordered.
    Ranked,
    /// Phase completed with at least one surviving candidate.
    Done,
    /// Phase produced zero surviving candidates.
    Failed,
}

/// Per-phase execution trace: final state, how many of the `count` variant
/// calls survived, and whether the Judge or the Ranker fallback scored it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PhaseTrace {
    /// Which phase this trace describes.
    pub phase: Phase,
    /// Final state reached.
    pub state: PhaseState,
    /// Number of variant calls that returned successfully.
    pub surviving_candidates: usize,
    /// Number of variant calls requested.
    pub requested_candidates: usize,
    /// `true` if the Judge scored this phase; `false` if it fell back to
    /// the Ranker.
    pub judged: bool,
}

/// Inputs to [`crate::phases::PhaseEngine::generate`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GenerateRequest {
    /// Raw user input before any phase or enhancement.
    pub input: String,
    /// Variant count generated per phase.
    pub count: u32,
    /// Target domain flavor.
    pub persona: Persona,
    /// Ordered phase list to execute; must be a prefix of the canonical
    /// order.
    pub phases: Vec<Phase>,
    /// Selection/cascade policy.
    pub strategy: Strategy,
    /// Sampling temperature; falls back to `generation.default_temperature`.
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Max tokens per call; falls back to `generation.default_max_tokens`.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Overrides the per-phase provider routing from `phases.{phase}.provider`.
    #[serde(default)]
    pub provider_override: Option<String>,
    /// Task description the Judge scores candidates against. Falls back to
    /// `input` when omitted.
    #[serde(default)]
    pub task_description: Option<String>,
    /// If set, the Optimizer runs on the pipeline's final selected prompt
    /// once generation completes, and its iterations are appended to the
    /// session's prompt lineage.
    #[serde(default)]
    pub optimize: Option<GenerateOptimizeOptions>,
}

/// Optimizer trigger embedded in a generate request, distinct from the
/// standalone `/api/v1/prompts/optimize` entry point.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GenerateOptimizeOptions {
    /// Target score the optimizer loop aims for.
    pub target_score: f64,
    /// Maximum optimizer iterations.
    pub max_iterations: u32,
}

/// Result of one [`crate::phases::PhaseEngine::generate`] call.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub struct GenerateOutcome {
    /// The session every returned prompt belongs to.
    pub session_id: Uuid,
    /// Prompts selected per the request's strategy, in phase then rank
    /// order.
    pub prompts: Vec<Prompt>,
    /// `true` if a later phase failed outright but an earlier phase still
    /// produced output.
    pub degraded: bool,
    /// `true` if the requested temperature fell outside `0.0..=2.0` and was
    /// clamped to the nearest bound before use.
    pub temperature_clamped: bool,
    /// Per-phase execution trace, in phase order.
    pub trace: Vec<PhaseTrace>,
}

impl GenerateRequest {
    /// Validates request shape, independent of any runtime state
    /// (providers, store). `count == 0` and an empty or out-of-order
    /// `phases` list are rejected as `InvalidInput`.
    pub fn validate(&self) -> Result<(), String> {
        if self.count == 0 {
            return Err("count must be >= 1".to_string());
        }
        if self.phases.is_empty() {
            return Err("phases must not be empty".to_string());
        }
        let order = crate::constants::PHASE_ORDER;
        let mut expected = order.iter();
        for phase in &self.phases {
            match expected.find(|p| *p == phase) {
                Some(_) => continue,
                None => {
                    return Err(format!(
                        "phases must be a prefix of the canonical order {order:?}, got {:?}",
                        self.phases
                    ))
                }
            }
        }
        // Re-walk to additionally confirm no reordering/duplicates: the
        // requested list, filtered to canonical order, must equal itself.
        let canonical_subsequence: Vec<Phase> = order.into_iter().filter(|p| self.phases.contains(p)).collect();
        if canonical_subsequence != self.phases {
            return Err(format!(
                "phases must preserve canonical order {order:?}, got {:?}",
                self.phases
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> GenerateRequest {
        GenerateRequest {
            input: "idea".to_string(),
            count: 1,
            persona: Persona::Generic,
            phases: vec![Phase::PrimaMateria, Phase::Solutio, Phase::Coagulatio],
            strategy: Strategy::Best,
            temperature: None,
            max_tokens: None,
            provider_override: None,
            task_description: None,
            optimize: None,
        }
    }

    #[test]
    fn zero_count_is_rejected() {
        let mut req = base_request();
        req.count = 0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn empty_phases_is_rejected() {
        let mut req = base_request();
        req.phases = vec![];
        assert!(req.validate().is_err());
    }

    #[test]
    fn reordered_phases_are_rejected() {
        let mut req = base_request();
        req.phases = vec![Phase::Solutio, Phase::PrimaMateria];
        assert!(req.validate().is_err());
    }

    #[test]
    fn prefix_phases_are_accepted() {
        let mut req = base_request();
        req.phases = vec![Phase::PrimaMateria, Phase::Solutio];
        assert!(req.validate().is_ok());
    }
}
