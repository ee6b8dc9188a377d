use std::collections::HashMap;

use super::*;
use crate::config::{Config, ProviderConfig};
use crate::index::mock::MockIndex;
use crate::model::{Persona, Phase};
use crate::providers::Registry;
use crate::store::PromptStore;

async fn test_optimizer(providers: HashMap<String, ProviderConfig>) -> Optimizer<MockIndex> {
    let config = Config {
        providers: providers.clone(),
        ..Default::default()
    };
    let registry = Registry::new_mock(providers, vec!["openai".to_string()]);
    let store = PromptStore::connect_memory().await.unwrap();
    let index = MockIndex::new();
    Optimizer::new(registry, store, index, None, config)
}

fn openai_providers() -> HashMap<String, ProviderConfig> {
    let mut providers = HashMap::new();
    providers.insert(
        "openai".to_string(),
        ProviderConfig {
            model: "gpt-4o-mini".to_string(),
            ..Default::default()
        },
    );
    providers
}

fn base_request(max_iterations: u32, target_score: f64) -> OptimizerRequest {
    OptimizerRequest {
        session_id: uuid::Uuid::new_v4(),
        origin_input: "build a todo app".to_string(),
        seed_content: "write a prompt for a todo app".to_string(),
        seed_phase: Phase::Coagulatio,
        persona: Persona::Code,
        task: "write a production-ready prompt".to_string(),
        optimizer_provider: "openai".to_string(),
        optimizer_model: "gpt-4o-mini".to_string(),
        max_iterations,
        target_score,
        temperature: 0.7,
        max_tokens: 512,
    }
}

#[tokio::test]
async fn zero_max_iterations_returns_the_seed_unchanged() {
    let optimizer = test_optimizer(openai_providers()).await;
    let outcome = optimizer.optimize(base_request(0, 10.0)).await.unwrap();

    assert_eq!(outcome.iterations.len(), 0);
    assert_eq!(outcome.optimized.id, outcome.original.id);
    assert_eq!(outcome.final_score, outcome.original_score);
    assert!(!outcome.partial);
}

#[tokio::test]
async fn runs_up_to_max_iterations_when_target_is_never_reached() {
    let optimizer = test_optimizer(openai_providers()).await;
    let outcome = optimizer.optimize(base_request(2, 10.0)).await.unwrap();

    assert!(outcome.iterations.len() <= 2);
    let best = std::iter::once(outcome.original_score)
        .chain(outcome.iterations.iter().map(|it| it.score))
        .fold(f64::MIN, f64::max);
    assert_eq!(outcome.final_score, best);
    assert!(outcome.optimized.has_valid_score());
}

#[tokio::test]
async fn unknown_optimizer_provider_returns_partial_with_seed_as_best() {
    let optimizer = test_optimizer(openai_providers()).await;
    let mut request = base_request(3, 10.0);
    request.optimizer_provider = "ghost".to_string();

    let outcome = optimizer.optimize(request).await.unwrap();

    assert!(outcome.partial);
    assert_eq!(outcome.iterations.len(), 0);
    assert_eq!(outcome.optimized.id, outcome.original.id);
}

#[tokio::test]
async fn seed_is_persisted_and_retrievable() {
    let optimizer = test_optimizer(openai_providers()).await;
    let outcome = optimizer.optimize(base_request(0, 10.0)).await.unwrap();

    let fetched = optimizer.store.get(outcome.original.id).await.unwrap();
    assert_eq!(fetched.content, outcome.original.content);
}
