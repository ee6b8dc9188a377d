//! Shared handler state: the engine components every Transport A and
//! Transport B entry point borrows to build a [`PhaseEngine`],
//! [`Optimizer`], or [`HistoryEnhancer`] per request.

use std::sync::Arc;

use alchemy_core::index::VectorIndex;
use alchemy_core::judge::Judge;
use alchemy_core::lifecycle::ShutdownCoordinator;
use alchemy_core::providers::Registry;
use alchemy_core::store::PromptStore;
use alchemy_core::Config;

/// Everything a handler needs, generic over the semantic index
/// implementation so tests can swap in [`alchemy_core::index::mock::MockIndex`]
/// for the real Qdrant-backed [`alchemy_core::index::SemanticIndex`].
///
/// Cheap to clone: every field is either already reference-counted
/// (`Registry`, `PromptStore`, `Arc<Config>`) or, for `I`, expected to be
/// cheap-to-clone itself (both index implementations hold only a client
/// handle or an `Arc`-backed map).
#[derive(Clone)]
pub struct AppState<I: VectorIndex + Clone + Send + Sync + 'static> {
    /// Chat + embedding provider façade.
    pub registry: Registry,
    /// Durable prompt/session/relationship/metrics store.
    pub store: PromptStore,
    /// Semantic vector index.
    pub index: I,
    /// LLM-evaluated quality scorer; `None` falls back to the Ranker for
    /// every phase.
    pub judge: Option<Judge>,
    /// Structured configuration, shared read-only.
    pub config: Arc<Config>,
    /// Coordinates graceful shutdown and in-flight request draining.
    pub shutdown: Arc<ShutdownCoordinator>,
}

impl<I: VectorIndex + Clone + Send + Sync + 'static> AppState<I> {
    /// Builds state from already-constructed components.
    pub fn new(
        registry: Registry,
        store: PromptStore,
        index: I,
        judge: Option<Judge>,
        config: Config,
        shutdown: Arc<ShutdownCoordinator>,
    ) -> Self {
        Self {
            registry,
            store,
            index,
            judge,
            config: Arc::new(config),
            shutdown,
        }
    }
}
