//! Optimizer: iteratively rewrites one prompt against a task description,
//! scoring each rewrite and stopping on target score, stall, or exhaustion.

pub mod error;
pub mod model;

#[cfg(test)]
mod tests;

pub use error::OptimizerError;
pub use model::{OptimizeOutcome, OptimizerIteration, OptimizerRequest};

use tracing::{instrument, warn};

use crate::config::Config;
use crate::constants::{OPTIMIZER_MAX_CONSECUTIVE_REGRESSIONS, OPTIMIZER_REGRESSION_EPSILON};
use crate::index::{IndexFilters, IndexPayload, VectorIndex};
use crate::judge::Judge;
use crate::model::{Prompt, Relationship, RelationshipKind};
use crate::providers::{ChatMessage, ChatRequest, Registry};
use crate::ranker::RankerContext;
use crate::store::PromptStore;

/// Runs the meta-prompting rewrite loop, generic over the semantic index
/// implementation so tests can swap in [`crate::index::mock::MockIndex`].
#[derive(Clone)]
pub struct Optimizer<I: VectorIndex + Clone> {
    registry: Registry,
    store: PromptStore,
    index: I,
    judge: Option<Judge>,
    config: Config,
}

impl<I: VectorIndex + Clone + Send + Sync + 'static> Optimizer<I> {
    /// Builds an optimizer sharing the engine's registry, store, index,
    /// Judge, and configuration.
    pub fn new(registry: Registry, store: PromptStore, index: I, judge: Option<Judge>, config: Config) -> Self {
        Self {
            registry,
            store,
            index,
            judge,
            config,
        }
    }

    /// Scores the seed, then rewrites it up to `request.max_iterations`
    /// times, persisting every iteration and linking it to its predecessor
    /// by an `optimize_iteration` relationship edge. Stops early once a
    /// score reaches `request.target_score`, or after two consecutive
    /// iterations that each regress the score by more than
    /// [`OPTIMIZER_REGRESSION_EPSILON`]. A rewrite-call failure ends the
    /// loop and returns the best result seen so far with `partial: true`.
    #[instrument(skip(self, request), fields(persona = %request.persona, max_iterations = request.max_iterations))]
    pub async fn optimize(&self, request: OptimizerRequest) -> Result<OptimizeOutcome, OptimizerError> {
        let weights = self.config.ranking.weights;

        let (seed_prompt, seed_score, seed_reasoning) = self
            .score_and_persist(
                request.seed_content.clone(),
                request.seed_phase,
                None,
                &request,
                &weights,
            )
            .await?;

        let mut iterations = Vec::new();

        let mut best = seed_prompt.clone();
        let mut best_score = seed_score;
        let mut current = seed_prompt.clone();
        let mut prev_score = seed_score;
        let mut consecutive_regressions = 0;
        let mut partial = false;

        if seed_score < request.target_score {
            for _ in 0..request.max_iterations {
                let prior_reasoning = iterations.last().map(|it| it.reasoning.clone()).unwrap_or_else(|| seed_reasoning.clone());
                let rewrite = match self.rewrite(&current.content, &request, &prior_reasoning).await {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(error = %err, "optimizer rewrite call failed, stopping with best-so-far");
                        partial = true;
                        break;
                    }
                };

                let (new_prompt, score, reasoning) = self
                    .score_and_persist(rewrite, request.seed_phase, Some(current.id), &request, &weights)
                    .await?;
                self.store
                    .insert_relationship(&Relationship::new(current.id, new_prompt.id, RelationshipKind::OptimizeIteration))
                    .await?;

                iterations.push(OptimizerIteration {
                    prompt: new_prompt.clone(),
                    score,
                    reasoning,
                });

                if score > best_score {
                    best = new_prompt.clone();
                    best_score = score;
                }

                if score >= request.target_score {
                    current = new_prompt;
                    break;
                }

                if score < prev_score - OPTIMIZER_REGRESSION_EPSILON {
                    consecutive_regressions += 1;
                } else {
                    consecutive_regressions = 0;
                }
                prev_score = score;
                current = new_prompt;

                if consecutive_regressions >= OPTIMIZER_MAX_CONSECUTIVE_REGRESSIONS {
                    break;
                }
            }
        }

        Ok(OptimizeOutcome {
            original: seed_prompt,
            optimized: best,
            original_score: seed_score,
            final_score: best_score,
            iterations,
            partial,
        })
    }

    async fn rewrite(
        &self,
        current_content: &str,
        request: &OptimizerRequest,
        prior_reasoning: &str,
    ) -> Result<String, crate::providers::ProviderError> {
        let system = format!(
            "You are the prompt optimizer for the '{persona}' persona. Rewrite the candidate \
             prompt to score higher against the task, addressing the prior feedback. Respond \
             with the rewritten prompt text only, no commentary.\n\nPrior feedback: {prior_reasoning}",
            persona = request.persona,
        );
        let user = format!("Task: {task}\n\nCurrent prompt:\n{current_content}", task = request.task);

        let chat_request = ChatRequest {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            model: request.optimizer_model.clone(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stop: vec![],
        };
        let response = self.registry.chat(&request.optimizer_provider, chat_request).await?;
        Ok(response.content)
    }

    async fn score_and_persist(
        &self,
        content: String,
        phase: crate::model::Phase,
        parent_id: Option<uuid::Uuid>,
        request: &OptimizerRequest,
        weights: &crate::config::RankingWeights,
    ) -> Result<(Prompt, f64, String), OptimizerError> {
        let embedding = self.registry.embed(Some(&request.optimizer_provider), &content).await?;

        let mut builder = Prompt::builder(content, phase, request.session_id, &request.origin_input, request.persona)
            .producer(&request.optimizer_provider, &request.optimizer_model)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens)
            .embedding(embedding.clone());
        if let Some(parent) = parent_id {
            builder = builder.parent_id(parent);
        }
        let mut candidate = builder.build();

        let semantic_similarity = self.semantic_context(request.persona, &candidate.embedding.vector).await;
        let context = RankerContext {
            historical_success_rate: self
                .registry
                .historical_success_rate(&request.optimizer_provider, request.persona)
                .await,
            semantic_similarity,
        };

        let outcome = Judge::score_or_fallback(
            self.judge.as_ref(),
            &candidate.content,
            &request.task,
            request.persona,
            &candidate,
            weights,
            &context,
        )
        .await;
        candidate.score = outcome.score;

        let canonical_id = self.store.insert(&candidate).await?;
        if canonical_id != candidate.id {
            candidate = self.store.get(canonical_id).await?;
        }
        self.index
            .upsert(
                canonical_id,
                candidate.embedding.vector.clone(),
                IndexPayload {
                    phase,
                    persona: request.persona,
                    provider: request.optimizer_provider.clone(),
                    score: candidate.score,
                    session_id: request.session_id,
                },
            )
            .await?;

        Ok((candidate, outcome.score, outcome.reasoning))
    }

    async fn semantic_context(&self, persona: crate::model::Persona, vector: &[f32]) -> f64 {
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
