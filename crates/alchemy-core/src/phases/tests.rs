use std::collections::HashMap;

use super::*;
use crate::config::{Config, PhaseConfig, ProviderConfig};
use crate::index::mock::MockIndex;
use crate::judge::Judge;
use crate::model::{Persona, Phase, Strategy};
use crate::providers::Registry;
use crate::store::PromptStore;

async fn test_engine() -> PhaseEngine<MockIndex> {
    let mut providers = HashMap::new();
    providers.insert(
        "openai".to_string(),
        ProviderConfig {
            model: "gpt-4o-mini".to_string(),
            ..Default::default()
        },
    );
    let mut config = Config {
        providers,
        ..Default::default()
    };
    for phase in crate::constants::PHASE_ORDER {
        config.phases.insert(phase.slug().to_string(), PhaseConfig {
            provider: "openai".to_string(),
        });
    }

    let registry = Registry::new_mock(config.providers.clone(), vec!["openai".to_string()]);
    let store = PromptStore::connect_memory().await.unwrap();
    let index = MockIndex::new();
    PhaseEngine::new(registry, store, index, None, config)
}

fn base_request() -> GenerateRequest {
    GenerateRequest {
        input: "build a todo app".to_string(),
        count: 1,
        persona: Persona::Code,
        phases: vec![Phase::PrimaMateria, Phase::Solutio],
        strategy: Strategy::Best,
        temperature: None,
        max_tokens: None,
        provider_override: None,
        task_description: None,
        optimize: None,
    }
}

#[tokio::test]
async fn generate_validates_the_request_first() {
    let engine = test_engine().await;
    let mut request = base_request();
    request.phases = vec![];
    let result = engine.generate(request).await;
    assert!(matches!(result, Err(PhaseError::InvalidInput(_))));
}

#[tokio::test]
async fn best_strategy_returns_one_prompt_per_phase() {
    let engine = test_engine().await;
    let request = base_request();
    let outcome = engine.generate(request).await.unwrap();

    assert_eq!(outcome.prompts.len(), 2);
    assert_eq!(outcome.trace.len(), 2);
    assert!(!outcome.degraded);
    for trace in &outcome.trace {
        assert_eq!(trace.state, PhaseState::Done);
        assert_eq!(trace.surviving_candidates, 1);
        assert!(!trace.judged);
    }
    for prompt in &outcome.prompts {
        assert!(prompt.has_valid_score());
    }
}

#[tokio::test]
async fn best_strategy_feeds_every_phase_from_the_original_input() {
    let engine = test_engine().await;
    let request = base_request();
    let outcome = engine.generate(request).await.unwrap();

    for prompt in &outcome.prompts {
        assert!(prompt.content.contains("build a todo app"));
        assert!(prompt.parent_id.is_none());
    }
}

#[tokio::test]
async fn cascade_strategy_feeds_each_phase_from_the_previous_winner() {
    let engine = test_engine().await;
    let mut request = base_request();
    request.strategy = Strategy::Cascade;
    let outcome = engine.generate(request).await.unwrap();

    assert_eq!(outcome.prompts.len(), 2);
    assert!(outcome.prompts[0].parent_id.is_none());
    assert_eq!(outcome.prompts[1].parent_id, Some(outcome.prompts[0].id));
    assert!(outcome.prompts[1].content.contains(&outcome.prompts[0].content));
}

#[tokio::test]
async fn all_strategy_returns_count_times_phases_candidates() {
    let engine = test_engine().await;
    let mut request = base_request();
    request.strategy = Strategy::All;
    request.count = 2;
    let outcome = engine.generate(request).await.unwrap();

    assert_eq!(outcome.prompts.len(), 4);
}

#[tokio::test]
async fn run_phase_is_exhausted_when_the_provider_is_unknown() {
    let engine = test_engine().await;
    let session_id = uuid::Uuid::new_v4();
    let result = engine
        .run_phase(
            Phase::PrimaMateria,
            Persona::Code,
            "raw idea",
            None,
            1,
            0.7,
            512,
            "nonexistent",
            session_id,
            "raw idea",
            "raw idea",
        )
        .await;
    assert!(matches!(result, Err(PhaseError::PhaseExhausted { .. })));
}

#[tokio::test]
async fn out_of_range_temperature_is_clamped_not_rejected() {
    let engine = test_engine().await;
    let mut request = base_request();
    request.temperature = Some(5.0);
    let outcome = engine.generate(request).await.unwrap();

    assert!(outcome.temperature_clamped);
    for prompt in &outcome.prompts {
        assert_eq!(prompt.temperature, 2.0);
    }
}

#[tokio::test]
async fn in_range_temperature_is_not_flagged_as_clamped() {
    let engine = test_engine().await;
    let request = base_request();
    let outcome = engine.generate(request).await.unwrap();
    assert!(!outcome.temperature_clamped);
}

#[tokio::test]
async fn duplicate_fingerprint_candidates_are_returned_with_their_canonical_stored_id() {
    // A deduped variant's returned id must be the row actually persisted,
    // never the fresh `Uuid::new_v4()` it was built with, or `get` on it
    // returns `NotFound`.
    let mut providers = HashMap::new();
    providers.insert(
        "openai".to_string(),
        ProviderConfig {
            model: "gpt-4o-mini".to_string(),
            ..Default::default()
        },
    );
    let mut config = Config {
        providers: providers.clone(),
        ..Default::default()
    };
    for phase in crate::constants::PHASE_ORDER {
        config.phases.insert(phase.slug().to_string(), PhaseConfig {
            provider: "openai".to_string(),
        });
    }
    let registry = Registry::new_mock(providers, vec!["openai".to_string()]);
    let store = PromptStore::connect_memory().await.unwrap();
    let index = MockIndex::new();
    let engine = PhaseEngine::new(registry, store.clone(), index, None, config);

    let mut request = base_request();
    request.strategy = Strategy::All;
    request.count = 2;
    let outcome = engine.generate(request).await.unwrap();

    for prompt in &outcome.prompts {
        let stored = store.get(prompt.id).await.expect("returned id must be retrievable from the store");
        assert_eq!(stored.content, prompt.content);
    }
}

#[tokio::test]
async fn judge_present_but_unparseable_falls_back_to_ranker() {
    let mut providers = HashMap::new();
    providers.insert(
        "openai".to_string(),
        ProviderConfig {
            model: "gpt-4o-mini".to_string(),
            ..Default::default()
        },
    );
    let mut config = Config {
        providers: providers.clone(),
        ..Default::default()
    };
    for phase in crate::constants::PHASE_ORDER {
        config.phases.insert(phase.slug().to_string(), PhaseConfig {
            provider: "openai".to_string(),
        });
    }
    let registry = Registry::new_mock(providers, vec!["openai".to_string()]);
    let judge = Judge::new(registry.clone(), "openai", "gpt-4o-mini");
    let store = PromptStore::connect_memory().await.unwrap();
    let index = MockIndex::new();
    let engine = PhaseEngine::new(registry, store, index, Some(judge), config);

    let outcome = engine.generate(base_request()).await.unwrap();
    for trace in &outcome.trace {
        assert!(!trace.judged);
    }
}
