use super::*;
use std::collections::HashMap;

#[test]
fn rescale_multiplies_zero_to_one_scale() {
    assert_eq!(Judge::rescale_to_ten(0.85).unwrap(), 8.5);
}

#[test]
fn rescale_leaves_zero_to_ten_scale_alone() {
    assert_eq!(Judge::rescale_to_ten(7.5).unwrap(), 7.5);
}

#[test]
fn rescale_rejects_out_of_range() {
    assert!(matches!(
        Judge::rescale_to_ten(11.0),
        Err(JudgeError::ScoreOutOfRange(_))
    ));
}

#[test]
fn parse_json_response_tolerates_surrounding_prose() {
    let content = "Sure, here you go:\n{\"score\": 7.0, \"reasoning\": \"solid\"}\nHope that helps!";
    let parsed: RawVerdict = Judge::parse_json_response(content).unwrap();
    assert_eq!(parsed.score, 7.0);
    assert_eq!(parsed.reasoning, "solid");
}

fn mock_judge() -> Judge {
    let mut providers = HashMap::new();
    providers.insert(
        "openai".to_string(),
        crate::config::ProviderConfig {
            model: "gpt-4o-mini".to_string(),
            ..Default::default()
        },
    );
    let registry = Registry::new_mock(providers, vec!["openai".to_string()]);
    Judge::new(registry, "openai", "gpt-4o-mini")
}

#[tokio::test]
async fn score_against_mock_provider_falls_back_to_unparseable_error() {
    // The mock registry echoes plain text, not JSON, so the judge should
    // surface a parse failure rather than panic.
    let judge = mock_judge();
    let result = judge.score("a candidate prompt", "a task", Persona::Code).await;
    assert!(matches!(result, Err(JudgeError::UnparseableResponse(_))));
}
