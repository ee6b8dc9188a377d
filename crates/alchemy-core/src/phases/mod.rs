//! Phase Engine: runs the ordered prima-materia -> solutio -> coagulatio
//! pipeline, generating `count` variants per phase, scoring them with the
//! Judge (falling back to the Ranker), and persisting every candidate.

pub mod error;
pub mod model;
pub mod templates;

#[cfg(test)]
mod tests;

pub use error::PhaseError;
pub use model::{GenerateOptimizeOptions, GenerateOutcome, GenerateRequest, PhaseState, PhaseTrace};

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::index::{IndexFilters, IndexPayload, VectorIndex};
use crate::judge::Judge;
use crate::model::{Persona, Phase, Prompt, Relationship, RelationshipKind, Session, Strategy};
use crate::optimizer::{Optimizer, OptimizerRequest};
use crate::providers::{ChatRequest, Registry};
use crate::ranker::RankerContext;
use crate::store::PromptStore;

/// One phase's surviving candidates plus its trace and selected winner.
struct PhaseOutcome {
    candidates: Vec<Prompt>,
    trace: PhaseTrace,
}

impl PhaseOutcome {
    /// The best candidate by final `score`, ties broken by lower
    /// `actual_tokens` then earlier `created_at`, matching the Ranker's
    /// own tie-break rule so Judge-scored and Ranker-scored phases order
    /// consistently.
    fn winner(&self) -> Option<&Prompt> {
        self.candidates.iter().min_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.actual_tokens.unwrap_or(u32::MAX).cmp(&b.actual_tokens.unwrap_or(u32::MAX)))
                .then_with(|| a.created_at.cmp(&b.created_at))
        })
    }
}

/// Runs the phase pipeline for one generate request, generic over the
/// semantic index implementation so tests can swap in
/// [`crate::index::mock::MockIndex`].
#[derive(Clone)]
pub struct PhaseEngine<I: VectorIndex + Clone> {
    registry: Registry,
    store: PromptStore,
    index: I,
    judge: Option<Judge>,
    config: Config,
}

impl<I: VectorIndex + Clone + Send + Sync + 'static> PhaseEngine<I> {
    /// Builds a phase engine. `judge` is `None` when no judge provider is
    /// configured, in which case every phase scores via the Ranker.
    pub fn new(registry: Registry, store: PromptStore, index: I, judge: Option<Judge>, config: Config) -> Self {
        Self {
            registry,
            store,
            index,
            judge,
            config,
        }
    }

    /// Runs the pipeline end to end: validates the request, opens a
    /// session, executes each requested phase in order, and assembles the
    /// selected prompts per the request's strategy. Optionally runs the
    /// Optimizer on the pipeline's final output before returning.
    #[instrument(skip(self, request), fields(persona = %request.persona, strategy = ?request.strategy))]
    pub async fn generate(&self, request: GenerateRequest) -> Result<GenerateOutcome, PhaseError> {
        request.validate().map_err(PhaseError::InvalidInput)?;

        let session = Session::new(request.input.clone(), request.persona, request.strategy);
        self.store.insert_session(&session).await?;

        let requested_temperature = request
            .temperature
            .unwrap_or(self.config.generation.default_temperature);
        let temperature = requested_temperature.clamp(0.0, 2.0);
        let temperature_clamped = (temperature - requested_temperature).abs() > f64::EPSILON;
        if temperature_clamped {
            warn!(requested_temperature, clamped_temperature = temperature, "temperature out of range, clamped");
        }
        let max_tokens = request.max_tokens.unwrap_or(self.config.generation.default_max_tokens);
        let task_description = request.task_description.clone().unwrap_or_else(|| request.input.clone());

        let mut prompts = Vec::new();
        let mut trace = Vec::new();
        let mut degraded = false;

        let mut cascade_text = request.input.clone();
        let mut cascade_parent: Option<Uuid> = None;

        for phase in &request.phases {
            let phase_input = match request.strategy {
                Strategy::Cascade => cascade_text.clone(),
                _ => request.input.clone(),
            };
            let phase_parent = match request.strategy {
                Strategy::Cascade => cascade_parent,
                _ => None,
            };

            let provider = request
                .provider_override
                .clone()
                .or_else(|| self.config.provider_for_phase(*phase).map(str::to_string))
                .ok_or_else(|| PhaseError::InvalidInput("no provider configured for phase".to_string()))?;

            match self
                .run_phase(
                    *phase,
                    request.persona,
                    &phase_input,
                    phase_parent,
                    request.count,
                    temperature,
                    max_tokens,
                    &provider,
                    session.session_id,
                    &request.input,
                    &task_description,
                )
                .await
            {
                Ok(outcome) => {
                    trace.push(outcome.trace.clone());
                    match request.strategy {
                        Strategy::All => prompts.extend(outcome.candidates.iter().cloned()),
                        Strategy::Best => {
                            if let Some(winner) = outcome.winner() {
                                prompts.push(winner.clone());
                            }
                        }
                        Strategy::Cascade => {
                            if let Some(winner) = outcome.winner() {
                                if let Some(prev) = phase_parent {
                                    self.store
                                        .insert_relationship(&Relationship::new(prev, winner.id, RelationshipKind::Cascade))
                                        .await?;
                                }
                                cascade_parent = Some(winner.id);
                                cascade_text = winner.content.clone();
                                prompts.push(winner.clone());
                            }
                        }
                    }
                }
                Err(PhaseError::PhaseExhausted { phase, reason }) => {
                    if prompts.is_empty() {
                        return Err(PhaseError::PhaseExhausted { phase, reason });
                    }
                    warn!(%phase, %reason, "phase exhausted after partial success, returning degraded result");
                    degraded = true;
                    trace.push(PhaseTrace {
                        phase,
                        state: PhaseState::Failed,
                        surviving_candidates: 0,
                        requested_candidates: request.count as usize,
                        judged: false,
                    });
                    break;
                }
                Err(other) => return Err(other),
            }
        }

        if let (Some(options), Some(seed)) = (&request.optimize, prompts.last().cloned()) {
            let provider = request
                .provider_override
                .clone()
                .or_else(|| self.config.provider_for_phase(seed.phase).map(str::to_string))
                .unwrap_or_default();
            let model = self
                .config
                .providers
                .get(&provider)
                .map(|p| p.model.clone())
                .unwrap_or_default();

            let optimizer = Optimizer::new(
                self.registry.clone(),
                self.store.clone(),
                self.index.clone(),
                self.judge.clone(),
                self.config.clone(),
            );
            let outcome = optimizer
                .optimize(OptimizerRequest {
                    session_id: session.session_id,
                    origin_input: request.input.clone(),
                    seed_content: seed.content.clone(),
                    seed_phase: seed.phase,
                    persona: request.persona,
                    task: task_description.clone(),
                    optimizer_provider: provider,
                    optimizer_model: model,
                    max_iterations: options.max_iterations,
                    target_score: options.target_score,
                    temperature,
                    max_tokens,
                })
                .await?;

            degraded = degraded || outcome.partial;
            prompts.extend(outcome.iterations.into_iter().map(|iteration| iteration.prompt));
        }

        Ok(GenerateOutcome {
            session_id: session.session_id,
            prompts,
            degraded,
            temperature_clamped,
            trace,
        })
    }

    #[instrument(skip(self, text, origin_input, task_description), fields(phase = %phase, provider = %provider))]
    #[allow(clippy::too_many_arguments)]
    async fn run_phase(
        &self,
        phase: Phase,
        persona: Persona,
        text: &str,
        parent_id: Option<Uuid>,
        count: u32,
        temperature: f64,
        max_tokens: u32,
        provider: &str,
        session_id: Uuid,
        origin_input: &str,
        task_description: &str,
    ) -> Result<PhaseOutcome, PhaseError> {
        let max_concurrent = self
            .config
            .providers
            .get(provider)
            .map(|p| p.max_concurrent)
            .unwrap_or(4);
        let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));

        let system = templates::system_prompt(phase, persona);
        let user = templates::user_message(phase, text);

        let mut calls = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let semaphore = semaphore.clone();
            let registry = self.registry.clone();
            let provider = provider.to_string();
            let request = ChatRequest {
                messages: vec![
                    crate::providers::ChatMessage::system(system),
                    crate::providers::ChatMessage::user(user.clone()),
                ],
                model: self
                    .config
                    .providers
                    .get(&provider)
                    .map(|p| p.model.clone())
                    .unwrap_or_default(),
                temperature,
                max_tokens,
                stop: vec![],
            };
            calls.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                registry.chat(&provider, request).await
            }));
        }

        let mut responses = Vec::with_capacity(count as usize);
        let mut last_error = None;
        for call in calls {
            match call.await.expect("chat dispatch task panicked") {
                Ok(response) => {
                    self.registry.record_outcome(provider, persona, true).await;
                    responses.push(response);
                }
                Err(err) => {
                    self.registry.record_outcome(provider, persona, false).await;
                    last_error = Some(err.to_string());
                }
            }
        }

        if responses.is_empty() {
            return Err(PhaseError::PhaseExhausted {
                phase,
                reason: last_error.unwrap_or_else(|| "no variant calls returned".to_string()),
            });
        }

        let weights = self.config.ranking.weights;
        let mut candidates = Vec::with_capacity(responses.len());
        for response in responses {
            let embedding = self
                .registry
                .embed(Some(provider), &response.content)
                .await
                .map_err(|e| PhaseError::PhaseExhausted {
                    phase,
                    reason: format!("embedding failed: {e}"),
                })?;

            let mut builder = Prompt::builder(response.content.clone(), phase, session_id, origin_input, persona)
                .producer(provider, self.config.providers.get(provider).map(|p| p.model.clone()).unwrap_or_default())
                .temperature(temperature)
                .max_tokens(max_tokens)
                .actual_tokens(response.tokens_out)
                .embedding(embedding.clone());
            if let Some(parent) = parent_id {
                builder = builder.parent_id(parent);
            }
            candidates.push(builder.build());
        }

        let mut judged_all = true;
        for candidate in &mut candidates {
            let semantic_similarity = self.semantic_context(persona, &candidate.embedding.vector).await;
            let context = RankerContext {
                historical_success_rate: self.registry.historical_success_rate(provider, persona).await,
                semantic_similarity,
            };

            let outcome = Judge::score_or_fallback(
                self.judge.as_ref(),
                &candidate.content,
                task_description,
                persona,
                candidate,
                &weights,
                &context,
            )
            .await;
            judged_all = judged_all && outcome.judged;
            candidate.score = outcome.score;
        }

        let mut anchor_id = None;
        for candidate in &mut candidates {
            let canonical_id = self.store.insert(candidate).await?;
            if canonical_id != candidate.id {
                *candidate = self.store.get(canonical_id).await?;
            }
            self.index
                .upsert(
                    canonical_id,
                    candidate.embedding.vector.clone(),
                    IndexPayload {
                        phase,
                        persona,
                        provider: provider.to_string(),
                        score: candidate.score,
                        session_id,
                    },
                )
                .await?;
            if anchor_id.is_none() {
                anchor_id = Some(canonical_id);
            }
            if let Some(anchor) = anchor_id {
                if anchor != candidate.id {
                    self.store
                        .insert_relationship(&Relationship::new(anchor, candidate.id, RelationshipKind::Variant))
                        .await?;
                }
            }
        }

        let surviving = candidates.len();
        Ok(PhaseOutcome {
            candidates,
            trace: PhaseTrace {
                phase,
                state: PhaseState::Done,
                surviving_candidates: surviving,
                requested_candidates: count as usize,
                judged: judged_all,
            },
        })
    }

    /// Average cosine similarity of `vector` to the top-k stored prompts
    /// for `persona` whose score clears the learning threshold, feeding
    /// the Ranker's `f_semantic` term.
    async fn semantic_context(&self, persona: Persona, vector: &[f32]) -> f64 {
        let filters = IndexFilters {
            provider: None,
            phase: None,
            persona: Some(persona),
            min_score: Some(self.config.learning.min_relevance_score),
        };
        match self.index.query(vector.to_vec(), 5, filters).await {
            Ok(matches) if !matches.is_empty() => {
                matches.iter().map(|m| m.similarity as f64).sum::<f64>() / matches.len() as f64
            }
            _ => 0.0,
        }
    }
}
