use super::*;
use crate::model::Phase;
use uuid::Uuid;

fn prompt_with(temperature: f64, actual_tokens: u32, content_len: usize, persona: Persona) -> Prompt {
    let session_id = Uuid::new_v4();
    Prompt::builder(
        "x".repeat(content_len),
        Phase::Solutio,
        session_id,
        "idea",
        persona,
    )
    .producer("openai", "gpt-4o-mini")
    .temperature(temperature)
    .actual_tokens(actual_tokens)
    .build()
}

#[test]
fn f_temperature_peaks_at_persona_target() {
    let at_target = f_temperature(Persona::Code.target_temperature(), Persona::Code);
    let off_target = f_temperature(1.9, Persona::Code);
    assert!(at_target > off_target);
    assert!((at_target - 1.0).abs() < 1e-9);
}

#[test]
fn f_length_is_one_within_range_and_decays_outside() {
    let (min, max) = (200, 2000);
    assert_eq!(f_length((min + max) / 2, Persona::Code), 1.0);
    assert!(f_length(0, Persona::Code) < 1.0);
    assert!(f_length(max * 10, Persona::Code) < 1.0);
}

#[test]
fn score_stays_within_bounds() {
    let weights = RankingWeights::default();
    let prompt = prompt_with(0.5, 800, 600, Persona::Code);
    let context = RankerContext {
        historical_success_rate: 0.9,
        semantic_similarity: 0.8,
    };
    let s = score(&prompt, &weights, &context);
    assert!((0.0..=10.0).contains(&s));
}

#[test]
fn rank_orders_best_first() {
    let weights = RankingWeights::default();
    let good = prompt_with(Persona::Code.target_temperature(), 800, 600, Persona::Code);
    let bad = prompt_with(1.9, 50000, 3, Persona::Code);
    let candidates = vec![bad.clone(), good.clone()];
    let context = RankerContext {
        historical_success_rate: 0.5,
        semantic_similarity: 0.5,
    };
    let contexts = vec![context, context];
    let ranked = rank(&candidates, &weights, &contexts);
    assert_eq!(ranked[0].id, good.id);
}

#[test]
fn select_best_returns_none_for_empty_candidates() {
    let weights = RankingWeights::default();
    assert!(select_best(&[], &weights, &[]).is_none());
}

#[test]
fn tie_break_prefers_fewer_tokens() {
    // Zero out the token weight so f_tokens cannot affect the score,
    // isolating the actual_tokens tie-break from the weighted sum.
    let weights = RankingWeights {
        temperature: 0.2,
        token: 0.0,
        semantic: 0.3,
        length: 0.1,
        historical: 0.4,
    };
    let a = prompt_with(Persona::Generic.target_temperature(), 100, 500, Persona::Generic);
    let b = prompt_with(Persona::Generic.target_temperature(), 200, 500, Persona::Generic);
    let context = RankerContext {
        historical_success_rate: 0.0,
        semantic_similarity: 0.0,
    };
    let candidates = vec![b.clone(), a.clone()];
    let contexts = vec![context, context];
    let ranked = rank(&candidates, &weights, &contexts);
    assert_eq!(ranked[0].id, a.id);
}
