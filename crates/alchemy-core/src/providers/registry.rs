//! The provider registry: a uniform façade over heterogeneous chat and
//! embedding endpoints with fallback, timeout, and availability rules.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::config::ProviderConfig;
use crate::constants::{MAX_PROVIDER_RETRIES, PROVIDER_COOLDOWN_SECS};
use crate::model::{Embedding, Persona};

use super::chat::{ChatRequest, ChatResponse};
use super::error::ProviderError;

/// EWMA smoothing factor applied to `(provider, persona)` success tracking.
const SUCCESS_EWMA_ALPHA: f64 = 0.2;
/// Starting success rate for a `(provider, persona)` pair with no history
/// yet, deliberately not 1.0 so one early failure can't look catastrophic.
const SUCCESS_EWMA_PRIOR: f64 = 0.8;

/// Listing entry returned by [`Registry::list`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProviderInfo {
    /// Canonical provider name.
    pub name: String,
    /// Whether the provider currently accepts calls (not in cooldown).
    pub available: bool,
    /// Whether this provider is in the embedding priority list.
    pub supports_embeddings: bool,
    /// Configured default model plus fallbacks.
    pub models: Vec<String>,
    /// Rolling success rate averaged across every persona this provider has
    /// served, feeding the Ranker's `f_historical`.
    pub success_rate: f64,
}

#[derive(Debug, Clone, Copy)]
struct Availability {
    unavailable_since: Option<Instant>,
}

impl Availability {
    fn available() -> Self {
        Self {
            unavailable_since: None,
        }
    }

    fn is_available(&self) -> bool {
        match self.unavailable_since {
            None => true,
            Some(since) => since.elapsed() >= Duration::from_secs(PROVIDER_COOLDOWN_SECS),
        }
    }
}

/// Uniform access to configured chat + embedding providers.
///
/// Cheap to clone: the underlying `genai::Client` and availability map are
/// both reference-counted, matching the registry/config "read-shared,
/// write-rare" resource model.
#[derive(Clone)]
pub struct Registry {
    client: genai::Client,
    providers: HashMap<String, ProviderConfig>,
    embedding_priority: Vec<String>,
    availability: Arc<RwLock<HashMap<String, Availability>>>,
    /// Rolling per-`(provider, persona)` success rate, shared with the
    /// Ranker's `f_historical` term.
    success_ewma: Arc<RwLock<HashMap<(String, Persona), f64>>>,
    /// When set, `chat`/`embed` return deterministic canned responses
    /// instead of calling out, for tests and offline demos.
    mock: bool,
    /// Offline fallback used by [`Self::embed`] when no configured provider
    /// can embed, e.g. an Ollama-only deployment with no cloud provider.
    #[cfg(feature = "local-embeddings")]
    local_embedder: Option<Arc<crate::local_embed::LocalEmbedder>>,
}

impl Registry {
    /// Builds a registry from configuration. `genai::Client::default()`
    /// reads standard provider API keys (`OPENAI_API_KEY`, etc.) from the
    /// environment.
    pub fn new(providers: HashMap<String, ProviderConfig>, embedding_priority: Vec<String>) -> Self {
        let mut availability = HashMap::new();
        for name in providers.keys() {
            availability.insert(name.clone(), Availability::available());
        }
        Self {
            client: genai::Client::default(),
            providers,
            embedding_priority,
            availability: Arc::new(RwLock::new(availability)),
            success_ewma: Arc::new(RwLock::new(HashMap::new())),
            mock: false,
            #[cfg(feature = "local-embeddings")]
            local_embedder: None,
        }
    }

    /// Attaches a local offline embedder, consulted by [`Self::embed`] only
    /// when routing to every configured provider fails.
    #[cfg(feature = "local-embeddings")]
    pub fn with_local_embedder(mut self, embedder: Arc<crate::local_embed::LocalEmbedder>) -> Self {
        self.local_embedder = Some(embedder);
        self
    }

    /// Builds a registry that never calls out; every `chat`/`embed` returns
    /// a deterministic canned response. Used by the `mock` feature's test
    /// harnesses and by `ALCHEMY_MOCK_PROVIDER=1` for offline demos.
    pub fn new_mock(providers: HashMap<String, ProviderConfig>, embedding_priority: Vec<String>) -> Self {
        let mut registry = Self::new(providers, embedding_priority);
        registry.mock = true;
        registry
    }

    /// Lists configured providers with their live availability.
    pub async fn list(&self) -> Vec<ProviderInfo> {
        let availability = self.availability.read().await;
        let success_ewma = self.success_ewma.read().await;
        self.providers
            .iter()
            .map(|(name, config)| {
                let available = availability
                    .get(name)
                    .map(|a| a.is_available())
                    .unwrap_or(true);
                let mut models = vec![config.model.clone()];
                models.extend(config.fallback_models.iter().cloned());

                let rates: Vec<f64> = success_ewma
                    .iter()
                    .filter(|((provider, _), _)| provider == name)
                    .map(|(_, rate)| *rate)
                    .collect();
                let success_rate = if rates.is_empty() {
                    SUCCESS_EWMA_PRIOR
                } else {
                    rates.iter().sum::<f64>() / rates.len() as f64
                };

                ProviderInfo {
                    name: name.clone(),
                    available,
                    supports_embeddings: self.embedding_priority.contains(name),
                    models,
                    success_rate,
                }
            })
            .collect()
    }

    /// Current EWMA success rate for `(provider, persona)`, used to seed the
    /// Ranker's `f_historical` term.
    pub async fn historical_success_rate(&self, provider: &str, persona: Persona) -> f64 {
        self.success_ewma
            .read()
            .await
            .get(&(provider.to_string(), persona))
            .copied()
            .unwrap_or(SUCCESS_EWMA_PRIOR)
    }

    /// Records one outcome for `(provider, persona)`, updating the rolling
    /// success-rate EWMA the Ranker reads via [`Self::historical_success_rate`].
    pub async fn record_outcome(&self, provider: &str, persona: Persona, success: bool) {
        let mut success_ewma = self.success_ewma.write().await;
        let key = (provider.to_string(), persona);
        let prior = success_ewma.get(&key).copied().unwrap_or(SUCCESS_EWMA_PRIOR);
        let observed = if success { 1.0 } else { 0.0 };
        let updated = SUCCESS_EWMA_ALPHA * observed + (1.0 - SUCCESS_EWMA_ALPHA) * prior;
        success_ewma.insert(key, updated);
    }

    /// `true` if `name` is a known provider not currently in cooldown.
    pub async fn is_available(&self, name: &str) -> bool {
        self.availability
            .read()
            .await
            .get(name)
            .map(|a| a.is_available())
            .unwrap_or(false)
    }

    async fn mark_unavailable(&self, name: &str) {
        let mut availability = self.availability.write().await;
        availability.insert(
            name.to_string(),
            Availability {
                unavailable_since: Some(Instant::now()),
            },
        );
    }

    async fn mark_available(&self, name: &str) {
        let mut availability = self.availability.write().await;
        availability.insert(name.to_string(), Availability::available());
    }

    /// Issues one chat call to `provider`, retrying `Timeout`/`RateLimited`
    /// with exponential backoff and jitter up to [`MAX_PROVIDER_RETRIES`].
    #[instrument(skip(self, request), fields(provider = %provider, model = %request.model))]
    pub async fn chat(&self, provider: &str, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let config = self
            .providers
            .get(provider)
            .ok_or_else(|| ProviderError::Unavailable(provider.to_string()))?
            .clone();

        if !self.is_available(provider).await {
            return Err(ProviderError::Unavailable(provider.to_string()));
        }

        if self.mock {
            return Ok(Self::mock_chat_response(provider, &request));
        }

        let mut attempt = 0;
        loop {
            let started = Instant::now();
            let timeout = Duration::from_secs(config.timeout_secs);
            let result = tokio::time::timeout(timeout, self.exec_chat(provider, &request)).await;

            let outcome = match result {
                Ok(Ok(response)) => {
                    self.mark_available(provider).await;
                    return Ok(response);
                }
                Ok(Err(err)) => Err(err),
                Err(_) => Err(ProviderError::Timeout {
                    provider: provider.to_string(),
                    elapsed_ms: started.elapsed().as_millis() as u64,
                }),
            };

            let err = outcome.unwrap_err();
            if !err.is_retryable() || attempt >= MAX_PROVIDER_RETRIES {
                if matches!(err, ProviderError::Timeout { .. }) {
                    self.mark_unavailable(provider).await;
                }
                return Err(err);
            }

            let backoff_ms = Self::backoff_with_jitter(attempt);
            debug!(attempt, backoff_ms, "retrying provider call");
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            attempt += 1;
        }
    }

    async fn exec_chat(
        &self,
        provider: &str,
        request: &ChatRequest,
    ) -> Result<ChatResponse, ProviderError> {
        let messages: Vec<genai::chat::ChatMessage> = request
            .messages
            .iter()
            .map(|m| match m.role.as_str() {
                "system" => genai::chat::ChatMessage::system(m.content.clone()),
                "assistant" => genai::chat::ChatMessage::assistant(m.content.clone()),
                _ => genai::chat::ChatMessage::user(m.content.clone()),
            })
            .collect();

        let genai_request = genai::chat::ChatRequest::new(messages);
        let options = genai::chat::ChatOptions::default()
            .with_temperature(request.temperature)
            .with_max_tokens(request.max_tokens);

        let started = Instant::now();
        let response = self
            .client
            .exec_chat(&request.model, genai_request, Some(&options))
            .await
            .map_err(|e| Self::classify_genai_error(provider, e))?;

        let content = response.first_text().unwrap_or_default().to_string();
        let usage = response.usage.clone();

        Ok(ChatResponse {
            content,
            tokens_in: usage.prompt_tokens.unwrap_or(0) as u32,
            tokens_out: usage.completion_tokens.unwrap_or(0) as u32,
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Embeds `text`. If `provider` is `None` or the named provider is not
    /// in the embedding priority list, routes to the first available
    /// embedding-capable provider.
    #[instrument(skip(self, text), fields(provider = provider.unwrap_or("default")))]
    pub async fn embed(&self, provider: Option<&str>, text: &str) -> Result<Embedding, ProviderError> {
        let resolved = match provider.filter(|p| self.embedding_priority.iter().any(|e| e == p)) {
            Some(p) => Some(p.to_string()),
            None => self
                .embedding_priority
                .iter()
                .find(|p| self.providers.contains_key(p.as_str()))
                .cloned(),
        };

        let target = match resolved {
            Some(target) => target,
            None => {
                warn!("no embedding-capable provider configured, trying local fallback");
                return self.embed_local_fallback(text).await;
            }
        };

        let config = self
            .providers
            .get(&target)
            .ok_or_else(|| ProviderError::Unavailable(target.clone()))?;

        let model = &config.model;

        if self.mock {
            return Ok(Self::mock_embedding(text, model));
        }

        let response = self
            .client
            .embed(model, text, None)
            .await
            .map_err(|e| Self::classify_genai_error(&target, e))?;

        let vector = response
            .first_embedding()
            .map(|e| e.vector().to_vec())
            .ok_or_else(|| ProviderError::MalformedResponse {
                provider: target.clone(),
                reason: "embedding response carried no vector".to_string(),
            })?;

        Ok(Embedding::new(vector, model.clone()))
    }

    fn mock_chat_response(provider: &str, request: &ChatRequest) -> ChatResponse {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        ChatResponse {
            content: format!("[mock:{provider}] {last_user}"),
            tokens_in: last_user.split_whitespace().count() as u32,
            tokens_out: 8,
            latency_ms: 1,
        }
    }

    /// Deterministic stub embedding: hashes `text` into a small LCG seed
    /// and fills a fixed-dimension vector, so repeated calls with the same
    /// text are bit-identical without any model weights loaded.
    fn mock_embedding(text: &str, model: &str) -> Embedding {
        let mut seed = crate::hashing::hash_to_u64(text.as_bytes());
        let dim = crate::constants::DEFAULT_EMBEDDING_DIM;
        let mut vector = Vec::with_capacity(dim);
        for _ in 0..dim {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let normalized = ((seed >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0;
            vector.push(normalized);
        }
        Embedding::new(vector, model.to_string())
    }

    #[cfg(feature = "local-embeddings")]
    async fn embed_local_fallback(&self, text: &str) -> Result<Embedding, ProviderError> {
        let Some(embedder) = self.local_embedder.clone() else {
            return Err(ProviderError::NoCapableProvider { capability: "embed" });
        };
        let text = text.to_string();
        tokio::task::spawn_blocking(move || embedder.embed(&text, "local"))
            .await
            .map_err(|e| ProviderError::Upstream {
                provider: "local".to_string(),
                message: e.to_string(),
            })?
            .map_err(ProviderError::from)
    }

    #[cfg(not(feature = "local-embeddings"))]
    async fn embed_local_fallback(&self, _text: &str) -> Result<Embedding, ProviderError> {
        Err(ProviderError::NoCapableProvider { capability: "embed" })
    }

    fn classify_genai_error(provider: &str, err: genai::Error) -> ProviderError {
        let message = err.to_string();
        let provider = provider.to_string();
        if message.contains("429") || message.to_lowercase().contains("rate limit") {
            ProviderError::RateLimited {
                provider,
                retry_after_ms: 1000,
            }
        } else {
            ProviderError::Upstream { provider, message }
        }
    }

    fn backoff_with_jitter(attempt: u32) -> u64 {
        let base = 100u64 * 2u64.pow(attempt);
        let jitter = rand::thread_rng().gen_range(0..=base / 2 + 1);
        base + jitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ProviderConfig {
        ProviderConfig {
            model: "gpt-4o-mini".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn unknown_provider_is_unavailable() {
        let registry = Registry::new(HashMap::new(), vec![]);
        assert!(!registry.is_available("openai").await);
    }

    #[tokio::test]
    async fn list_reports_configured_providers() {
        let mut providers = HashMap::new();
        providers.insert("openai".to_string(), test_config());
        let registry = Registry::new(providers, vec!["openai".to_string()]);
        let listed = registry.list().await;
        assert_eq!(listed.len(), 1);
        assert!(listed[0].supports_embeddings);
        assert!(listed[0].available);
    }

    #[tokio::test]
    async fn chat_against_unconfigured_provider_is_unavailable() {
        let registry = Registry::new(HashMap::new(), vec![]);
        let request = ChatRequest {
            messages: vec![],
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 100,
            stop: vec![],
        };
        let result = registry.chat("openai", request).await;
        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
    }

    #[test]
    fn backoff_grows_with_attempt_number() {
        let first = Registry::backoff_with_jitter(0);
        let second = Registry::backoff_with_jitter(3);
        assert!(second >= first);
    }

    #[tokio::test]
    async fn mock_chat_returns_deterministic_response() {
        let mut providers = HashMap::new();
        providers.insert("openai".to_string(), test_config());
        let registry = Registry::new_mock(providers, vec!["openai".to_string()]);
        let request = ChatRequest {
            messages: vec![super::super::chat::ChatMessage::user("hello")],
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 100,
            stop: vec![],
        };
        let a = registry.chat("openai", request.clone()).await.unwrap();
        let b = registry.chat("openai", request).await.unwrap();
        assert_eq!(a.content, b.content);
        assert!(a.content.contains("hello"));
    }

    #[tokio::test]
    async fn historical_success_rate_defaults_to_prior_then_tracks_outcomes() {
        let registry = Registry::new(HashMap::new(), vec![]);
        let rate = registry.historical_success_rate("openai", crate::model::Persona::Code).await;
        assert_eq!(rate, SUCCESS_EWMA_PRIOR);

        registry.record_outcome("openai", crate::model::Persona::Code, true).await;
        let after_success = registry.historical_success_rate("openai", crate::model::Persona::Code).await;
        assert!(after_success > SUCCESS_EWMA_PRIOR);

        registry.record_outcome("openai", crate::model::Persona::Code, false).await;
        let after_failure = registry.historical_success_rate("openai", crate::model::Persona::Code).await;
        assert!(after_failure < after_success);
    }

    #[tokio::test]
    async fn mock_embed_is_deterministic_and_dimensioned() {
        let mut providers = HashMap::new();
        providers.insert("openai".to_string(), test_config());
        let registry = Registry::new_mock(providers, vec!["openai".to_string()]);
        let a = registry.embed(Some("openai"), "hello world").await.unwrap();
        let b = registry.embed(Some("openai"), "hello world").await.unwrap();
        assert_eq!(a.vector, b.vector);
        assert_eq!(a.dim(), crate::constants::DEFAULT_EMBEDDING_DIM);
    }
}
