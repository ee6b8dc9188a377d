//! Prompt alchemy engine HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;

use alchemy_core::index::{SemanticIndex, DEFAULT_COLLECTION_NAME};
use alchemy_core::judge::Judge;
use alchemy_core::lifecycle::ShutdownCoordinator;
use alchemy_core::model::Phase;
use alchemy_core::providers::Registry;
use alchemy_core::store::PromptStore;
use alchemy_core::Config;
use alchemy_server::gateway::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("ALCHEMY_CONFIG").unwrap_or_else(|_| "alchemy.toml".to_string());
    let config = Config::load(&config_path)?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
        }))
        .init();

    tracing::info!(data_dir = %config.data_dir.display(), "prompt alchemy engine starting");

    std::fs::create_dir_all(&config.data_dir)?;
    let store = PromptStore::connect(&config.data_dir).await?;

    let mock_provider = std::env::var("ALCHEMY_MOCK_PROVIDER").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    let registry = if mock_provider {
        tracing::warn!("ALCHEMY_MOCK_PROVIDER set, all chat/embed calls return canned mock responses");
        Registry::new_mock(config.providers.clone(), config.embeddings.provider_priority.clone())
    } else {
        Registry::new(config.providers.clone(), config.embeddings.provider_priority.clone())
    };

    #[cfg(feature = "local-embeddings")]
    let registry = {
        let mut registry = registry;
        if config.embeddings.local_fallback
            && alchemy_core::local_embed::LocalEmbedder::is_available(&alchemy_core::local_embed::LocalEmbedConfig::new(
                config.embeddings.local_model_dir.clone(),
            ))
        {
            let embedder = alchemy_core::local_embed::LocalEmbedder::load(alchemy_core::local_embed::LocalEmbedConfig::new(
                config.embeddings.local_model_dir.clone(),
            ))?;
            registry = registry.with_local_embedder(Arc::new(embedder));
        }
        registry
    };

    let index = SemanticIndex::connect(&config.qdrant_url, DEFAULT_COLLECTION_NAME, config.embeddings.standard_dimensions).await?;

    let judge_provider = config.provider_for_phase(Phase::Coagulatio).map(str::to_string);
    let judge = judge_provider.and_then(|provider| {
        config
            .providers
            .get(&provider)
            .map(|cfg| Judge::new(registry.clone(), provider, cfg.model.clone()))
    });
    if judge.is_none() {
        tracing::warn!("no judge provider configured, every phase scores via the Ranker");
    }

    let shutdown = Arc::new(ShutdownCoordinator::new(Duration::from_secs(config.lifecycle.shutdown_grace_secs)));

    let bind_addr = std::env::var("ALCHEMY_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let addr: SocketAddr = bind_addr.parse()?;

    let state = AppState::new(registry, store, index, judge, config, shutdown.clone());
    let app = create_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "prompt alchemy engine listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("prompt alchemy engine shutdown complete");
    Ok(())
}

async fn shutdown_signal(shutdown: Arc<ShutdownCoordinator>) {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => tracing::info!("received SIGTERM, initiating graceful shutdown"),
    }

    if !shutdown.initiate().await {
        tracing::warn!("grace period elapsed with requests still in flight");
    }
}
