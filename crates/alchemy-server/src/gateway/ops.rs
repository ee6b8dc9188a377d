//! Transport-agnostic request handling shared by the HTTP handlers in
//! [`crate::gateway::handler`] and the RPC tool dispatch in
//! [`crate::gateway::rpc`]. Neither transport talks to the engine directly;
//! both go through here so the two stay behaviorally identical.

use std::time::{Duration, Instant};

use futures_util::stream::{self, StreamExt};
use uuid::Uuid;

use alchemy_core::enhancer::HistoryEnhancer;
use alchemy_core::index::VectorIndex;
use alchemy_core::lifecycle::Deadline;
use alchemy_core::model::{Session, Strategy};
use alchemy_core::optimizer::{Optimizer, OptimizerRequest};
use alchemy_core::phases::{GenerateOutcome, GenerateRequest, PhaseEngine};
use alchemy_core::store::{ScoredPrompt, StoreFilters};
use alchemy_core::{EngineError, Prompt};

use crate::gateway::dto::{
    BatchRequestBody, BatchResultEntry, GenerateResponseBody, OptimizeRequestBody, SearchQuery,
    DEFAULT_OPTIMIZE_MAX_ITERATIONS, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT,
};
use crate::gateway::error::RpcError;
use crate::gateway::state::AppState;

/// Runs the History Enhancer over `request.input`, then the Phase Engine
/// over the (possibly enhanced) result, returning the raw engine outcome.
///
/// Tracked against [`crate::gateway::state::AppState::shutdown`] for the
/// whole call and bounded by the request-wide hard ceiling from
/// [`alchemy_core::config::LifecycleConfig::request_ceiling_secs`] (spec
/// §5): a deadline expiry cancels the in-flight enhancer/phase-engine work
/// and surfaces as [`EngineError::Canceled`] rather than hanging.
pub async fn generate<I: VectorIndex + Clone + Send + Sync + 'static>(
    state: &AppState<I>,
    mut request: GenerateRequest,
) -> Result<GenerateOutcome, EngineError> {
    request.validate().map_err(EngineError::InvalidInput)?;

    let _guard = state.shutdown.track_request().await;
    let deadline = Deadline::after(Duration::from_secs(state.config.lifecycle.request_ceiling_secs));

    let registry = state.registry.clone();
    let store = state.store.clone();
    let index = state.index.clone();
    let judge = state.judge.clone();
    let config = (*state.config).clone();

    let work = async move {
        let enhancer = HistoryEnhancer::new(registry.clone(), store.clone(), index.clone(), config.clone());
        let enhanced = enhancer.enhance(&request.input, request.persona, 0).await;
        request.input = enhanced.enhanced_input;

        let engine = PhaseEngine::new(registry, store, index, judge, config);
        engine.generate(request).await.map_err(EngineError::from)
    };

    match deadline.guard(work).await {
        Ok(result) => result,
        Err(()) => Err(EngineError::Canceled),
    }
}

/// Resolves a standalone optimize request into an [`OptimizerRequest`],
/// opens its session, and runs the Optimizer loop.
///
/// Tracked and deadline-bounded the same way as [`generate`] (spec §5).
pub async fn optimize<I: VectorIndex + Clone + Send + Sync + 'static>(
    state: &AppState<I>,
    body: OptimizeRequestBody,
) -> Result<alchemy_core::optimizer::OptimizeOutcome, EngineError> {
    let _guard = state.shutdown.track_request().await;
    let deadline = Deadline::after(Duration::from_secs(state.config.lifecycle.request_ceiling_secs));

    let seed_phase = alchemy_core::model::Phase::Coagulatio;
    let provider = body
        .provider
        .or_else(|| state.config.provider_for_phase(seed_phase).map(str::to_string))
        .ok_or_else(|| EngineError::InvalidInput("no provider configured for optimize".to_string()))?;
    let model = body
        .model
        .or_else(|| state.config.providers.get(&provider).map(|p| p.model.clone()))
        .unwrap_or_default();
    let temperature = body
        .temperature
        .unwrap_or(state.config.generation.default_temperature)
        .clamp(0.0, 2.0);
    let max_tokens = body.max_tokens.unwrap_or(state.config.generation.default_max_tokens);

    let session = Session::new(body.seed_content.clone(), body.persona, Strategy::Best);
    state.store.insert_session(&session).await.map_err(EngineError::from)?;

    let optimizer = Optimizer::new(
        state.registry.clone(),
        state.store.clone(),
        state.index.clone(),
        state.judge.clone(),
        (*state.config).clone(),
    );
    let request = OptimizerRequest {
        session_id: session.session_id,
        origin_input: body.seed_content.clone(),
        seed_content: body.seed_content,
        seed_phase,
        persona: body.persona,
        task: body.task,
        optimizer_provider: provider,
        optimizer_model: model,
        max_iterations: body.max_iterations.unwrap_or(DEFAULT_OPTIMIZE_MAX_ITERATIONS),
        target_score: body.target_score,
        temperature,
        max_tokens,
    };

    let work = async move { optimizer.optimize(request).await.map_err(EngineError::from) };
    match deadline.guard(work).await {
        Ok(result) => result,
        Err(()) => Err(EngineError::Canceled),
    }
}

/// Runs [`alchemy_core::store::PromptStore::hybrid`] when `semantic` is
/// set, otherwise a plain text search, clamping `limit`/`page` into sane
/// bounds.
pub async fn search<I: VectorIndex + Clone + Send + Sync + 'static>(
    state: &AppState<I>,
    query: SearchQuery,
) -> Result<(Vec<ScoredPrompt>, i64, i64), EngineError> {
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT);
    let page = query.page.unwrap_or(0).max(0);

    let filters = StoreFilters {
        provider: query.provider.clone(),
        phase: query.phase,
        persona: query.persona,
        tags: Vec::new(),
        min_score: query.min_score,
        since: None,
        until: None,
    };

    if !query.semantic {
        let prompts = state
            .store
            .search_text(&query.query, &filters, limit, page * limit)
            .await
            .map_err(EngineError::from)?;
        let results = prompts
            .into_iter()
            .map(|prompt| ScoredPrompt { prompt, relevance: 1.0 })
            .collect();
        return Ok((results, limit, page));
    }

    let embedding = state
        .registry
        .embed(None, &query.query)
        .await
        .map_err(EngineError::from)?;
    let results = state
        .store
        .hybrid(&query.query, embedding.vector, limit as usize, filters, &state.index)
        .await
        .map_err(EngineError::from)?;
    Ok((results, limit, page))
}

/// Fetches one prompt by id.
pub async fn get_prompt<I: VectorIndex + Clone + Send + Sync + 'static>(
    state: &AppState<I>,
    id: Uuid,
) -> Result<Prompt, EngineError> {
    state.store.get(id).await.map_err(EngineError::from)
}

/// Lists configured providers.
pub async fn list_providers<I: VectorIndex + Clone + Send + Sync + 'static>(
    state: &AppState<I>,
) -> Vec<alchemy_core::providers::ProviderInfo> {
    state.registry.list().await
}

/// Runs every batch input through [`generate`] concurrently over a worker
/// pool of `workers` (clamped to `[1, MAX_BATCH_WORKERS]`), honoring the
/// "partial failures do not cancel siblings" rule: every input yields a
/// result or error entry regardless of how its siblings fared.
pub async fn batch<I: VectorIndex + Clone + Send + Sync + 'static>(
    state: &AppState<I>,
    body: BatchRequestBody,
) -> Vec<BatchResultEntry> {
    let workers = body
        .workers
        .unwrap_or(alchemy_core::constants::DEFAULT_BATCH_WORKERS)
        .clamp(1, alchemy_core::constants::MAX_BATCH_WORKERS);

    let mut results: Vec<BatchResultEntry> = stream::iter(body.inputs.into_iter().enumerate())
        .map(|(index, input)| {
            let state = state.clone();
            async move {
                let started = Instant::now();
                match generate(&state, input).await {
                    Ok(outcome) => BatchResultEntry {
                        index,
                        result: Some(GenerateResponseBody::new(outcome, started.elapsed().as_millis() as u64)),
                        error: None,
                    },
                    Err(err) => BatchResultEntry {
                        index,
                        result: None,
                        error: Some(RpcError::from(err)),
                    },
                }
            }
        })
        .buffer_unordered(workers)
        .collect::<Vec<_>>()
        .await;

    results.sort_by_key(|entry| entry.index);
    results
}
