//! LLM-evaluated quality scoring and pairwise comparison.
//!
//! Preferred evaluator ahead of the [`crate::ranker`]; on any failure here
//! callers fall back to the Ranker rather than failing the phase.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::JudgeError;

use tracing::instrument;

use crate::model::Persona;
use crate::providers::{ChatMessage, ChatRequest, Registry};

/// A judged quality score plus the judge's reasoning.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct JudgeVerdict {
    /// Score on the `[0, 10]` scale, already rescaled if the judge answered
    /// on a `[0, 1]` scale.
    pub score: f64,
    /// The judge's stated reasoning.
    pub reasoning: String,
}

/// Result of [`Judge::compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Winner {
    /// The first prompt (`prompt_a`) is better.
    A,
    /// The second prompt (`prompt_b`) is better.
    B,
    /// Neither is clearly better.
    Tie,
}

/// Result of a pairwise comparison.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Comparison {
    /// Which prompt the judge preferred.
    pub winner: Winner,
    /// Judge's confidence margin, `[0, 1]`.
    pub margin: f64,
}

#[derive(serde::Deserialize)]
struct RawVerdict {
    score: f64,
    reasoning: String,
}

#[derive(serde::Deserialize)]
struct RawComparison {
    winner: String,
    margin: f64,
}

/// An LLM-backed quality evaluator.
#[derive(Clone)]
pub struct Judge {
    registry: Registry,
    provider: String,
    model: String,
}

/// Outcome of [`Judge::score_or_fallback`]: a `[0, 10]` score plus whether
/// the Judge produced it or the Ranker fallback did.
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    /// Final score on the `[0, 10]` scale.
    pub score: f64,
    /// Judge's stated reasoning, or a fixed fallback note when the Ranker
    /// scored instead.
    pub reasoning: String,
    /// `true` if the Judge produced this score; `false` if it fell back to
    /// the Ranker.
    pub judged: bool,
}

impl Judge {
    /// Builds a judge that calls `provider`/`model` through `registry`.
    pub fn new(registry: Registry, provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            registry,
            provider: provider.into(),
            model: model.into(),
        }
    }

    /// Scores `prompt_text` against `task_description` for the given
    /// `persona`. Rescales a `[0, 1]` judge answer to `[0, 10]`, matching
    /// the store's ingress normalization rule.
    #[instrument(skip(self, prompt_text, task_description))]
    pub async fn score(
        &self,
        prompt_text: &str,
        task_description: &str,
        persona: Persona,
    ) -> Result<JudgeVerdict, JudgeError> {
        let request = self.build_score_request(prompt_text, task_description, persona);
        let response = self.registry.chat(&self.provider, request).await?;
        let raw: RawVerdict = Self::parse_json_response(&response.content)
            .map_err(|e| JudgeError::UnparseableResponse(e.to_string()))?;

        let score = Self::rescale_to_ten(raw.score)?;

        Ok(JudgeVerdict {
            score,
            reasoning: raw.reasoning,
        })
    }

    /// Compares two prompts and returns which the judge preferred.
    #[instrument(skip(self, prompt_a, prompt_b, task_description))]
    pub async fn compare(
        &self,
        prompt_a: &str,
        prompt_b: &str,
        task_description: &str,
        persona: Persona,
    ) -> Result<Comparison, JudgeError> {
        let request = self.build_compare_request(prompt_a, prompt_b, task_description, persona);
        let response = self.registry.chat(&self.provider, request).await?;
        let raw: RawComparison = Self::parse_json_response(&response.content)
            .map_err(|e| JudgeError::UnparseableResponse(e.to_string()))?;

        let winner = match raw.winner.to_lowercase().as_str() {
            "a" => Winner::A,
            "b" => Winner::B,
            _ => Winner::Tie,
        };

        Ok(Comparison {
            winner,
            margin: raw.margin.clamp(0.0, 1.0),
        })
    }

    fn build_score_request(&self, prompt_text: &str, task_description: &str, persona: Persona) -> ChatRequest {
        let system = format!(
            "You are a strict prompt-quality judge for the '{persona}' persona. \
             Respond with a single JSON object: {{\"score\": <0-10>, \"reasoning\": \"...\"}}. \
             No other text."
        );
        let user = format!(
            "Task: {task_description}\n\nCandidate prompt:\n{prompt_text}\n\n\
             Score how well the candidate prompt would accomplish the task."
        );
        ChatRequest {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            model: self.model.clone(),
            temperature: 0.0,
            max_tokens: 256,
            stop: vec![],
        }
    }

    fn build_compare_request(
        &self,
        prompt_a: &str,
        prompt_b: &str,
        task_description: &str,
        persona: Persona,
    ) -> ChatRequest {
        let system = format!(
            "You are a strict prompt-quality judge for the '{persona}' persona. \
             Respond with a single JSON object: {{\"winner\": \"a\"|\"b\"|\"tie\", \"margin\": <0-1>}}. \
             No other text."
        );
        let user = format!(
            "Task: {task_description}\n\nPrompt A:\n{prompt_a}\n\nPrompt B:\n{prompt_b}\n\n\
             Which prompt better accomplishes the task?"
        );
        ChatRequest {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            model: self.model.clone(),
            temperature: 0.0,
            max_tokens: 64,
            stop: vec![],
        }
    }

    fn parse_json_response<T: serde::de::DeserializeOwned>(content: &str) -> Result<T, serde_json::Error> {
        let trimmed = content.trim();
        let json_slice = trimmed
            .find('{')
            .zip(trimmed.rfind('}'))
            .map(|(start, end)| &trimmed[start..=end])
            .unwrap_or(trimmed);
        serde_json::from_str(json_slice)
    }

    /// Rescales a judge score to `[0, 10]`.
    ///
    /// Heuristic: judge answers `<= 1.0` are
    /// treated as the `0..1` scale and multiplied by 10, since a genuine
    /// `0..10` answer below 1.0 would represent an almost-unusably bad
    /// prompt and is rare enough that this ambiguity is an acceptable
    /// tradeoff. Anything else must already be on `0..10`.
    fn rescale_to_ten(raw: f64) -> Result<f64, JudgeError> {
        if !(0.0..=10.0).contains(&raw) {
            return Err(JudgeError::ScoreOutOfRange(raw));
        }
        let rescaled = if raw <= 1.0 { raw * 10.0 } else { raw };
        Ok(rescaled.clamp(crate::constants::SCORE_MIN, crate::constants::SCORE_MAX))
    }

    /// Scores `prompt_text` with the Judge when `judge` is present and its
    /// call succeeds; otherwise falls back to the deterministic Ranker,
    /// scoring `ranker_prompt` against `weights` and `context`. The phase
    /// and optimizer pipelines both use this so a Judge outage degrades to
    /// a ranked score rather than failing outright.
    pub async fn score_or_fallback(
        judge: Option<&Judge>,
        prompt_text: &str,
        task_description: &str,
        persona: Persona,
        ranker_prompt: &crate::model::Prompt,
        weights: &crate::config::RankingWeights,
        context: &crate::ranker::RankerContext,
    ) -> ScoreOutcome {
        if let Some(judge) = judge {
            match judge.score(prompt_text, task_description, persona).await {
                Ok(verdict) => {
                    return ScoreOutcome {
                        score: verdict.score,
                        reasoning: verdict.reasoning,
                        judged: true,
                    }
                }
                Err(err) => {
                    tracing::debug!(error = %err, "judge unavailable, falling back to ranker");
                }
            }
        }

        ScoreOutcome {
            score: crate::ranker::score(ranker_prompt, weights, context),
            reasoning: "ranker fallback: judge unavailable".to_string(),
            judged: false,
        }
    }
}
