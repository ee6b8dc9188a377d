//! Transport B: the HTTP API from spec §6.

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use tracing::instrument;
use uuid::Uuid;

use alchemy_core::index::VectorIndex;
use alchemy_core::phases::GenerateRequest;

use crate::gateway::dto::{
    BatchRequestBody, BatchResponseBody, GenerateResponseBody, HealthResponse, OptimizeRequestBody,
    OptimizeResponseBody, ProvidersResponseBody, SearchQuery, SearchResponseBody,
};
use crate::gateway::error::ApiError;
use crate::gateway::ops;
use crate::gateway::state::AppState;

/// Builds the Axum router for Transport B, generic over the semantic index
/// implementation so the `mock` feature can stand up a router backed by
/// [`alchemy_core::index::mock::MockIndex`] in tests.
pub fn create_router<I: VectorIndex + Clone + Send + Sync + 'static>(state: AppState<I>) -> Router {
    Router::new()
        .route("/health", get(health_handler::<I>))
        .route("/api/v1/prompts/generate", post(generate_handler::<I>))
        .route("/api/v1/prompts/optimize", post(optimize_handler::<I>))
        .route("/api/v1/prompts/search", get(search_handler::<I>))
        .route("/api/v1/prompts/{id}", get(get_prompt_handler::<I>))
        .route("/api/v1/prompts/batch", post(batch_handler::<I>))
        .route("/api/v1/providers", get(list_providers_handler::<I>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[instrument(skip(state))]
async fn health_handler<I: VectorIndex + Clone + Send + Sync + 'static>(
    State(state): State<AppState<I>>,
) -> Json<HealthResponse> {
    let providers = state.registry.list().await;
    let database = if state.store.is_connected().await { "connected" } else { "disconnected" };
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        providers: providers.len(),
        database,
    })
}

#[instrument(skip(state, request))]
async fn generate_handler<I: VectorIndex + Clone + Send + Sync + 'static>(
    State(state): State<AppState<I>>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponseBody>, ApiError> {
    let started = Instant::now();
    let outcome = ops::generate(&state, request).await?;
    Ok(Json(GenerateResponseBody::new(outcome, started.elapsed().as_millis() as u64)))
}

#[instrument(skip(state, body))]
async fn optimize_handler<I: VectorIndex + Clone + Send + Sync + 'static>(
    State(state): State<AppState<I>>,
    Json(body): Json<OptimizeRequestBody>,
) -> Result<Json<OptimizeResponseBody>, ApiError> {
    let outcome = ops::optimize(&state, body).await?;
    Ok(Json(OptimizeResponseBody::from(outcome)))
}

#[instrument(skip(state, query))]
async fn search_handler<I: VectorIndex + Clone + Send + Sync + 'static>(
    State(state): State<AppState<I>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponseBody>, ApiError> {
    let (results, limit, page) = ops::search(&state, query).await?;
    Ok(Json(SearchResponseBody { results, page, limit }))
}

#[instrument(skip(state))]
async fn get_prompt_handler<I: VectorIndex + Clone + Send + Sync + 'static>(
    State(state): State<AppState<I>>,
    Path(id): Path<Uuid>,
) -> Result<Json<alchemy_core::Prompt>, ApiError> {
    let prompt = ops::get_prompt(&state, id).await?;
    Ok(Json(prompt))
}

#[instrument(skip(state, body))]
async fn batch_handler<I: VectorIndex + Clone + Send + Sync + 'static>(
    State(state): State<AppState<I>>,
    Json(body): Json<BatchRequestBody>,
) -> Json<BatchResponseBody> {
    let results = ops::batch(&state, body).await;
    Json(BatchResponseBody { results })
}

#[instrument(skip(state))]
async fn list_providers_handler<I: VectorIndex + Clone + Send + Sync + 'static>(
    State(state): State<AppState<I>>,
) -> Json<ProvidersResponseBody> {
    Json(ProvidersResponseBody {
        providers: ops::list_providers(&state).await,
    })
}
