//! History Enhancer: augments raw input with guidance distilled from
//! similar, highly-scored past prompts before phase 0 runs. Best-effort —
//! any failure degrades to a passthrough rather than blocking generation.

#[cfg(test)]
mod tests;

use tracing::{instrument, warn};

use crate::config::Config;
use crate::constants::MAX_ENHANCEMENT_ORIGIN_DEPTH;
use crate::index::{IndexFilters, VectorIndex};
use crate::model::{Persona, Phase};
use crate::providers::{ChatMessage, ChatRequest, Registry};
use crate::store::PromptStore;

/// Result of [`HistoryEnhancer::enhance`].
#[derive(Debug, Clone)]
pub struct EnhanceOutcome {
    /// The text to feed phase 0. Equal to the original input when the
    /// enhancer is disabled, found nothing relevant, or a call failed.
    pub enhanced_input: String,
    /// How many past prompts contributed guidance.
    pub used_examples: usize,
    /// `true` if guidance was actually prepended.
    pub applied: bool,
}

impl EnhanceOutcome {
    fn passthrough(input: &str) -> Self {
        Self {
            enhanced_input: input.to_string(),
            used_examples: 0,
            applied: false,
        }
    }
}

/// Prepends a compact "learned guidance" block to raw input, distilled
/// from the top-k most similar past prompts whose score clears
/// `learning.min_relevance_score`.
#[derive(Clone)]
pub struct HistoryEnhancer<I: VectorIndex + Clone> {
    registry: Registry,
    store: PromptStore,
    index: I,
    config: Config,
}

impl<I: VectorIndex + Clone + Send + Sync + 'static> HistoryEnhancer<I> {
    /// Builds an enhancer sharing the engine's registry, store, index, and
    /// configuration.
    pub fn new(registry: Registry, store: PromptStore, index: I, config: Config) -> Self {
        Self {
            registry,
            store,
            index,
            config,
        }
    }

    /// Returns `input` unchanged, prepended with learned guidance, or
    /// unchanged if disabled, `origin_chain_depth` has reached
    /// [`MAX_ENHANCEMENT_ORIGIN_DEPTH`], nothing relevant was found, or a
    /// call along the way failed. Callers that chain generate calls (using
    /// one call's output as the next call's input) should increment
    /// `origin_chain_depth` each hop so enhancement cannot feed on itself
    /// indefinitely.
    #[instrument(skip(self, input), fields(%persona, origin_chain_depth))]
    pub async fn enhance(&self, input: &str, persona: Persona, origin_chain_depth: u32) -> EnhanceOutcome {
        if !self.config.learning.enabled || origin_chain_depth >= MAX_ENHANCEMENT_ORIGIN_DEPTH {
            return EnhanceOutcome::passthrough(input);
        }

        let embedding = match self.registry.embed(None, input).await {
            Ok(embedding) => embedding,
            Err(err) => {
                warn!(error = %err, "enhancer embed failed, passing input through unchanged");
                return EnhanceOutcome::passthrough(input);
            }
        };

        let filters = IndexFilters {
            provider: None,
            phase: None,
            persona: Some(persona),
            min_score: Some(self.config.learning.min_relevance_score),
        };
        let matches = match self
            .index
            .query(embedding.vector.clone(), self.config.learning.max_examples, filters)
            .await
        {
            Ok(matches) if !matches.is_empty() => matches,
            Ok(_) => return EnhanceOutcome::passthrough(input),
            Err(err) => {
                warn!(error = %err, "enhancer index query failed, passing input through unchanged");
                return EnhanceOutcome::passthrough(input);
            }
        };

        let mut examples = Vec::with_capacity(matches.len());
        for candidate in &matches {
            let prompt = match self.store.get(candidate.id).await {
                Ok(prompt) => prompt,
                Err(err) => {
                    warn!(error = %err, id = %candidate.id, "enhancer could not hydrate match, skipping");
                    continue;
                }
            };
            if self.origin_chain_depth(&prompt).await > MAX_ENHANCEMENT_ORIGIN_DEPTH {
                warn!(id = %candidate.id, "excluding candidate whose origin chain is too deep, prevents enhancement feedback");
                continue;
            }
            examples.push(prompt.content);
        }
        if examples.is_empty() {
            return EnhanceOutcome::passthrough(input);
        }

        let provider = match self.config.provider_for_phase(Phase::PrimaMateria) {
            Some(provider) => provider,
            None => return EnhanceOutcome::passthrough(input),
        };
        let model = self
            .config
            .providers
            .get(provider)
            .map(|p| p.model.clone())
            .unwrap_or_default();

        let guidance = match self.summarize(provider, &model, persona, &examples).await {
            Ok(guidance) => guidance,
            Err(err) => {
                warn!(error = %err, "enhancer summarization failed, passing input through unchanged");
                return EnhanceOutcome::passthrough(input);
            }
        };

        EnhanceOutcome {
            enhanced_input: format!(
                "Learned guidance from {count} similar past prompts:\n{guidance}\n\nOriginal idea:\n{input}",
                count = examples.len(),
            ),
            used_examples: examples.len(),
            applied: true,
        }
    }

    /// Walks `prompt`'s `parent_id` chain and counts hops back to its root,
    /// capping the walk at [`MAX_ENHANCEMENT_ORIGIN_DEPTH`] + 1 since the
    /// caller only needs to know whether the candidate clears the bound,
    /// not its exact depth. A cascade-linked prompt several hops deep is a
    /// prompt that has already been rewritten by the pipeline multiple
    /// times; feeding it back as "learned guidance" risks compounding
    /// drift, so it is excluded rather than surfaced as an example.
    async fn origin_chain_depth(&self, prompt: &crate::model::Prompt) -> u32 {
        let mut depth = 0;
        let mut cursor = prompt.parent_id;
        while let Some(parent_id) = cursor {
            depth += 1;
            if depth > MAX_ENHANCEMENT_ORIGIN_DEPTH {
                break;
            }
            cursor = match self.store.get(parent_id).await {
                Ok(parent) => parent.parent_id,
                Err(_) => break,
            };
        }
        depth
    }

    async fn summarize(
        &self,
        provider: &str,
        model: &str,
        persona: Persona,
        examples: &[String],
    ) -> Result<String, crate::providers::ProviderError> {
        let system = format!(
            "You distill common successful patterns across past prompts for the '{persona}' \
             persona into concise, actionable guidance for writing the next one. Two to four \
             sentences, no preamble."
        );
        let numbered: String = examples
            .iter()
            .enumerate()
            .map(|(i, text)| format!("{}. {text}", i + 1))
            .collect::<Vec<_>>()
            .join("\n\n");
        let user = format!("Past prompts:\n{numbered}");

        let request = ChatRequest {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            model: model.to_string(),
            temperature: 0.3,
            max_tokens: 200,
            stop: vec![],
        };
        let response = self.registry.chat(provider, request).await?;
        Ok(response.content)
    }
}
