//! End-to-end smoke tests for Transport A (the RPC-style tool interface),
//! run against mock providers and an in-memory store/index.

use std::sync::Arc;
use std::time::Duration;

use alchemy_core::index::mock::MockIndex;
use alchemy_core::lifecycle::ShutdownCoordinator;
use alchemy_core::providers::Registry;
use alchemy_core::store::PromptStore;
use alchemy_core::Config;
use alchemy_server::gateway::{dispatch, AppState, ToolCall, ToolResult};

async fn test_state() -> AppState<MockIndex> {
    let config = Config::default();
    let store = PromptStore::connect_memory().await.expect("in-memory store");
    let registry = Registry::new_mock(config.providers.clone(), config.embeddings.provider_priority.clone());
    let shutdown = Arc::new(ShutdownCoordinator::new(Duration::from_secs(config.lifecycle.shutdown_grace_secs)));
    AppState::new(registry, store, MockIndex::new(), None, config, shutdown)
}

#[tokio::test]
async fn generate_prompts_tool_matches_the_http_shape() {
    let state = test_state().await;
    let raw = serde_json::json!({
        "tool": "generate_prompts",
        "arguments": {
            "input": "Create a REST API for user management",
            "count": 1,
            "persona": "code",
            "phases": ["prima-materia", "solutio", "coagulatio"],
            "strategy": "best",
        }
    });
    let call: ToolCall = serde_json::from_value(raw).expect("generate_prompts call parses");
    match dispatch(&state, call).await {
        ToolResult::Ok(value) => {
            assert_eq!(value["prompts"].as_array().unwrap().len(), 3);
        }
        ToolResult::Err(err) => panic!("expected Ok, got error: {err:?}"),
    }
}

#[tokio::test]
async fn list_providers_tool_takes_no_arguments() {
    let state = test_state().await;
    let raw = serde_json::json!({"tool": "list_providers"});
    let call: ToolCall = serde_json::from_value(raw).unwrap();
    match dispatch(&state, call).await {
        ToolResult::Ok(value) => assert!(!value.as_array().unwrap().is_empty()),
        ToolResult::Err(err) => panic!("expected Ok, got error: {err:?}"),
    }
}

#[tokio::test]
async fn get_prompt_tool_surfaces_not_found_as_an_error_record() {
    let state = test_state().await;
    let missing = uuid::Uuid::new_v4();
    let raw = serde_json::json!({"tool": "get_prompt", "arguments": {"id": missing}});
    let call: ToolCall = serde_json::from_value(raw).unwrap();
    match dispatch(&state, call).await {
        ToolResult::Ok(_) => panic!("expected an error record for a missing id"),
        ToolResult::Err(err) => assert_eq!(err.code, "not_found"),
    }
}

#[tokio::test]
async fn batch_generate_tool_yields_one_entry_per_input() {
    let state = test_state().await;
    let raw = serde_json::json!({
        "tool": "batch_generate",
        "arguments": {
            "inputs": [
                {"input": "A", "count": 1, "persona": "generic", "phases": ["prima-materia"], "strategy": "best"},
                {"input": "B", "count": 1, "persona": "generic", "phases": ["prima-materia"], "strategy": "best"},
            ],
            "workers": 2,
        }
    });
    let call: ToolCall = serde_json::from_value(raw).unwrap();
    match dispatch(&state, call).await {
        ToolResult::Ok(value) => assert_eq!(value.as_array().unwrap().len(), 2),
        ToolResult::Err(err) => panic!("expected Ok, got error: {err:?}"),
    }
}
