use std::collections::HashMap;

use super::*;
use crate::config::ProviderConfig;
use crate::index::mock::MockIndex;
use crate::index::IndexPayload;
use crate::model::{Persona, Phase, Prompt};

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

async fn test_enhancer(config: Config) -> HistoryEnhancer<MockIndex> {
    let registry = Registry::new_mock(config.providers.clone(), vec!["openai".to_string()]);
    let store = PromptStore::connect_memory().await.unwrap();
    let index = MockIndex::new();
    HistoryEnhancer::new(registry, store, index, config)
}

#[tokio::test]
async fn disabled_learning_passes_through_unchanged() {
    let config = Config {
        providers: openai_providers(),
        learning: crate::config::LearningConfig {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    };
    let enhancer = test_enhancer(config).await;

    let outcome = enhancer.enhance("raw idea", Persona::Code, 0).await;
    assert!(!outcome.applied);
    assert_eq!(outcome.enhanced_input, "raw idea");
    assert_eq!(outcome.used_examples, 0);
}

#[tokio::test]
async fn origin_chain_depth_at_limit_passes_through_unchanged() {
    let config = Config {
        providers: openai_providers(),
        ..Default::default()
    };
    let enhancer = test_enhancer(config).await;

    let outcome = enhancer
        .enhance("raw idea", Persona::Code, MAX_ENHANCEMENT_ORIGIN_DEPTH)
        .await;
    assert!(!outcome.applied);
    assert_eq!(outcome.enhanced_input, "raw idea");
}

#[tokio::test]
async fn empty_index_passes_through_unchanged() {
    let config = Config {
        providers: openai_providers(),
        ..Default::default()
    };
    let enhancer = test_enhancer(config).await;

    let outcome = enhancer.enhance("raw idea", Persona::Code, 0).await;
    assert!(!outcome.applied);
    assert_eq!(outcome.enhanced_input, "raw idea");
}

#[tokio::test]
async fn matching_history_prepends_learned_guidance() {
    let config = Config {
        providers: openai_providers(),
        ..Default::default()
    };
    let registry = Registry::new_mock(config.providers.clone(), vec!["openai".to_string()]);
    let store = PromptStore::connect_memory().await.unwrap();
    let index = MockIndex::new();

    let session_id = uuid::Uuid::new_v4();
    let past = Prompt::builder(
        "a well-scored past prompt about todo apps",
        Phase::Coagulatio,
        session_id,
        "build a todo app",
        Persona::Code,
    )
    .producer("openai", "gpt-4o-mini")
    .temperature(0.7)
    .max_tokens(512)
    .embedding(registry.embed(Some("openai"), "a well-scored past prompt about todo apps").await.unwrap())
    .build();
    store.insert(&past).await.unwrap();
    index
        .upsert(
            past.id,
            past.embedding.vector.clone(),
            IndexPayload {
                phase: Phase::Coagulatio,
                persona: Persona::Code,
                provider: "openai".to_string(),
                score: 8.5,
                session_id,
            },
        )
        .await
        .unwrap();

    let enhancer = HistoryEnhancer::new(registry, store, index, config);
    let outcome = enhancer.enhance("build a similar todo app", Persona::Code, 0).await;

    assert!(outcome.applied);
    assert_eq!(outcome.used_examples, 1);
    assert!(outcome.enhanced_input.contains("Learned guidance"));
    assert!(outcome.enhanced_input.contains("build a similar todo app"));
}

#[tokio::test]
async fn candidate_with_too_deep_an_origin_chain_is_excluded() {
    // Spec §9: exclude candidates whose origin chain depth exceeds
    // MAX_ENHANCEMENT_ORIGIN_DEPTH, so enhancement cannot feed on itself.
    let config = Config {
        providers: openai_providers(),
        ..Default::default()
    };
    let registry = Registry::new_mock(config.providers.clone(), vec!["openai".to_string()]);
    let store = PromptStore::connect_memory().await.unwrap();
    let index = MockIndex::new();
    let session_id = uuid::Uuid::new_v4();

    let mut parent_id = None;
    let mut last = None;
    for i in 0..=MAX_ENHANCEMENT_ORIGIN_DEPTH + 1 {
        let mut builder = Prompt::builder(
            format!("todo app rewrite {i}"),
            Phase::Coagulatio,
            session_id,
            "build a todo app",
            Persona::Code,
        )
        .producer("openai", "gpt-4o-mini")
        .temperature(0.7)
        .max_tokens(512)
        .embedding(registry.embed(Some("openai"), &format!("todo app rewrite {i}")).await.unwrap());
        if let Some(parent) = parent_id {
            builder = builder.parent_id(parent);
        }
        let prompt = builder.build();
        store.insert(&prompt).await.unwrap();
        parent_id = Some(prompt.id);
        last = Some(prompt);
    }
    let deepest = last.unwrap();
    index
        .upsert(
            deepest.id,
            deepest.embedding.vector.clone(),
            IndexPayload {
                phase: Phase::Coagulatio,
                persona: Persona::Code,
                provider: "openai".to_string(),
                score: 8.5,
                session_id,
            },
        )
        .await
        .unwrap();

    let enhancer = HistoryEnhancer::new(registry, store, index, config);
    let outcome = enhancer.enhance("build a similar todo app", Persona::Code, 0).await;

    assert!(!outcome.applied, "the only candidate's origin chain is too deep, so nothing survives to enhance with");
    assert_eq!(outcome.used_examples, 0);
}
