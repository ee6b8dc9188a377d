//! Deterministic weighted scoring of candidate prompts.
//!
//! `score = w_t·f_temperature + w_k·f_tokens + w_s·f_semantic + w_l·f_length
//! + w_h·f_historical`, each `f_*` in `[0,1]`, stored as `10·score`.
//! Acts as the fallback path whenever the Judge is unavailable ([`crate::judge`]).

#[cfg(test)]
mod tests;

use crate::config::RankingWeights;
use crate::model::{Persona, Prompt};

/// Historical success-rate context the ranker needs but does not own:
/// an exponentially-weighted moving average of past success rates for a
/// `(provider, persona)` pair, and the average cosine similarity of a
/// candidate to successful past prompts.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankerContext {
    /// EWMA of past success rates for this candidate's `(provider, persona)`.
    pub historical_success_rate: f64,
    /// Average cosine similarity to the top-k stored prompts whose usage
    /// success rate exceeds a threshold.
    pub semantic_similarity: f64,
}

/// Target character length range used by `f_length`, per persona.
fn target_length_range(persona: Persona) -> (usize, usize) {
    match persona {
        Persona::Code => (200, 2000),
        Persona::Writing => (400, 4000),
        Persona::Analysis => (300, 3000),
        Persona::Generic => (100, 1500),
    }
}

/// Target token count used by `f_tokens`' saturation curve, per persona.
fn target_tokens(persona: Persona) -> f64 {
    match persona {
        Persona::Code => 800.0,
        Persona::Writing => 1200.0,
        Persona::Analysis => 900.0,
        Persona::Generic => 600.0,
    }
}

/// Bell curve peaking at `target`, width controlled so that being off by
/// 1.0 halves the score.
fn bell_curve(value: f64, target: f64) -> f64 {
    let distance = value - target;
    (-distance * distance / 0.5).exp()
}

/// Saturation curve with a knee near `target`: rises quickly, then
/// plateaus, so tokens well past the target do not keep scoring higher.
fn saturation_curve(value: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 0.0;
    }
    let ratio = value / target;
    (1.0 - (-ratio).exp()).clamp(0.0, 1.0)
}

/// `f_temperature`: bell curve peaking at the persona's target temperature.
pub fn f_temperature(temperature: f64, persona: Persona) -> f64 {
    bell_curve(temperature, persona.target_temperature())
}

/// `f_tokens`: saturation curve with knee near the persona's target length.
pub fn f_tokens(actual_tokens: Option<u32>, persona: Persona) -> f64 {
    let tokens = actual_tokens.unwrap_or(0) as f64;
    saturation_curve(tokens, target_tokens(persona))
}

/// `f_semantic`: average cosine similarity to qualifying stored prompts.
pub fn f_semantic(context: &RankerContext) -> f64 {
    context.semantic_similarity.clamp(0.0, 1.0)
}

/// `f_length`: 1.0 within `[min, max]`, else a linear penalty.
pub fn f_length(content_len: usize, persona: Persona) -> f64 {
    let (min, max) = target_length_range(persona);
    if content_len >= min && content_len <= max {
        return 1.0;
    }
    let distance = if content_len < min {
        (min - content_len) as f64
    } else {
        (content_len - max) as f64
    };
    let span = max.saturating_sub(min).max(1) as f64;
    (1.0 - distance / span).clamp(0.0, 1.0)
}

/// `f_historical`: EWMA of past success rates for `(provider, persona)`.
pub fn f_historical(context: &RankerContext) -> f64 {
    context.historical_success_rate.clamp(0.0, 1.0)
}

/// Scores a candidate prompt on the `[0, 10]` scale using `weights` and
/// `context`. Does not mutate `prompt`; callers assign the result to
/// `prompt.score`.
pub fn score(prompt: &Prompt, weights: &RankingWeights, context: &RankerContext) -> f64 {
    let unit_score = weights.temperature * f_temperature(prompt.temperature, prompt.persona)
        + weights.token * f_tokens(prompt.actual_tokens, prompt.persona)
        + weights.semantic * f_semantic(context)
        + weights.length * f_length(prompt.content.chars().count(), prompt.persona)
        + weights.historical * f_historical(context);

    (unit_score * 10.0).clamp(crate::constants::SCORE_MIN, crate::constants::SCORE_MAX)
}

/// Ranks candidates best-first. Ties break by lower `actual_tokens`, then
/// earlier `created_at`.
pub fn rank<'a>(candidates: &'a [Prompt], weights: &RankingWeights, contexts: &[RankerContext]) -> Vec<&'a Prompt> {
    let mut scored: Vec<(&Prompt, f64)> = candidates
        .iter()
        .zip(contexts.iter())
        .map(|(p, ctx)| (p, score(p, weights, ctx)))
        .collect();

    scored.sort_by(|(a, a_score), (b, b_score)| {
        b_score
            .partial_cmp(a_score)
            .unwrap()
            .then_with(|| a.actual_tokens.unwrap_or(u32::MAX).cmp(&b.actual_tokens.unwrap_or(u32::MAX)))
            .then_with(|| a.created_at.cmp(&b.created_at))
    });

    scored.into_iter().map(|(p, _)| p).collect()
}

/// Selects the single best candidate, or `None` if `candidates` is empty.
pub fn select_best<'a>(candidates: &'a [Prompt], weights: &RankingWeights, contexts: &[RankerContext]) -> Option<&'a Prompt> {
    rank(candidates, weights, contexts).into_iter().next()
}
