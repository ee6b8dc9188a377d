//! Transport A: the RPC-style tool interface consumed by agents.
//!
//! Each tool is a single request/response whose arguments correspond 1:1 to
//! the engine inputs from spec §4.6/§4.8. The response channel carries
//! exclusively the structured result or an error record `{code, message,
//! details}` — progress/log messages belong on a side channel this module
//! never touches.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use alchemy_core::index::VectorIndex;
use alchemy_core::phases::GenerateRequest;

use crate::gateway::dto::{
    BatchRequestBody, GenerateResponseBody, OptimizeRequestBody, OptimizeResponseBody, SearchQuery,
    SearchResponseBody,
};
use crate::gateway::error::RpcError;
use crate::gateway::ops;
use crate::gateway::state::AppState;

/// One of the six tools from spec §6 Transport A, tagged by name with its
/// arguments nested under `arguments` so the wire shape matches a
/// conventional JSON-RPC-ish tool call without depending on a specific
/// agent framework's envelope.
#[derive(Debug, Deserialize)]
#[serde(tag = "tool", content = "arguments", rename_all = "snake_case")]
pub enum ToolCall {
    /// `generate_prompts` — runs the History Enhancer + Phase Engine.
    GeneratePrompts(GenerateRequest),
    /// `batch_generate` — runs [`ToolCall::GeneratePrompts`] over N inputs.
    BatchGenerate(BatchRequestBody),
    /// `search_prompts` — text, semantic, or hybrid retrieval.
    SearchPrompts(SearchQuery),
    /// `get_prompt` — fetch a single prompt by id.
    GetPrompt {
        /// Prompt id to fetch.
        id: Uuid,
    },
    /// `optimize_prompt` — runs the Optimizer meta-prompting loop.
    OptimizePrompt(OptimizeRequestBody),
    /// `list_providers` — registry listing; takes no arguments.
    ListProviders,
}

/// The tool call's outcome: exactly one of a structured result or the
/// uniform error record, never both.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ToolResult {
    /// Tool-specific result payload.
    Ok(Value),
    /// Uniform `{code, message, details}` error record.
    Err(RpcError),
}

impl ToolResult {
    fn ok(value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => ToolResult::Ok(v),
            Err(e) => ToolResult::Err(RpcError::from(alchemy_core::EngineError::InternalError(format!(
                "failed to serialize tool result: {e}"
            )))),
        }
    }
}

/// Dispatches one tool call through [`ops`], the same path Transport B's
/// HTTP handlers use, so both transports behave identically.
pub async fn dispatch<I: VectorIndex + Clone + Send + Sync + 'static>(
    state: &AppState<I>,
    call: ToolCall,
) -> ToolResult {
    match call {
        ToolCall::GeneratePrompts(request) => {
            let started = Instant::now();
            match ops::generate(state, request).await {
                Ok(outcome) => {
                    ToolResult::ok(GenerateResponseBody::new(outcome, started.elapsed().as_millis() as u64))
                }
                Err(err) => ToolResult::Err(RpcError::from(err)),
            }
        }
        ToolCall::BatchGenerate(body) => {
            let results = ops::batch(state, body).await;
            ToolResult::ok(results)
        }
        ToolCall::SearchPrompts(query) => match ops::search(state, query).await {
            Ok((results, limit, page)) => ToolResult::ok(SearchResponseBody { results, page, limit }),
            Err(err) => ToolResult::Err(RpcError::from(err)),
        },
        ToolCall::GetPrompt { id } => match ops::get_prompt(state, id).await {
            Ok(prompt) => ToolResult::ok(prompt),
            Err(err) => ToolResult::Err(RpcError::from(err)),
        },
        ToolCall::OptimizePrompt(body) => match ops::optimize(state, body).await {
            Ok(outcome) => ToolResult::ok(OptimizeResponseBody::from(outcome)),
            Err(err) => ToolResult::Err(RpcError::from(err)),
        },
        ToolCall::ListProviders => ToolResult::ok(ops::list_providers(state).await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_call_tags_match_spec_names() {
        let raw = serde_json::json!({"tool": "list_providers"});
        let call: ToolCall = serde_json::from_value(raw).expect("list_providers parses with no arguments");
        assert!(matches!(call, ToolCall::ListProviders));
    }

    #[test]
    fn get_prompt_parses_id_argument() {
        let id = Uuid::new_v4();
        let raw = serde_json::json!({"tool": "get_prompt", "arguments": {"id": id}});
        let call: ToolCall = serde_json::from_value(raw).expect("get_prompt parses");
        match call {
            ToolCall::GetPrompt { id: parsed } => assert_eq!(parsed, id),
            _ => panic!("expected GetPrompt"),
        }
    }
}
