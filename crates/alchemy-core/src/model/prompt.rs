use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::embedding::Embedding;

/// One stage of the ordered transformation pipeline.
///
/// `prima-materia` extracts structure, `solutio` rewrites naturally,
/// `coagulatio` crystallizes. Canonical order is fixed; see
/// [`crate::constants::PHASE_ORDER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Extracts structure from the raw idea.
    PrimaMateria,
    /// Rewrites the structured draft naturally.
    Solutio,
    /// Crystallizes the final prompt.
    Coagulatio,
}

impl Phase {
    /// Returns the phase's position in the canonical order (0-based).
    pub fn ordinal(&self) -> usize {
        match self {
            Phase::PrimaMateria => 0,
            Phase::Solutio => 1,
            Phase::Coagulatio => 2,
        }
    }

    /// `true` if `self` may immediately follow `prior` in a cascade chain.
    pub fn follows(&self, prior: &Phase) -> bool {
        self.ordinal() == prior.ordinal() + 1
    }

    /// Short slug used in templates, logs, and storage keys.
    pub fn slug(&self) -> &'static str {
        match self {
            Phase::PrimaMateria => "prima-materia",
            Phase::Solutio => "solutio",
            Phase::Coagulatio => "coagulatio",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug())
    }
}

/// Target domain flavor influencing templates and ranker targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    /// Code generation / software engineering prompts.
    Code,
    /// Creative and long-form writing prompts.
    Writing,
    /// Analytical / research prompts.
    Analysis,
    /// Everything else.
    Generic,
}

impl Persona {
    /// Bell-curve peak temperature for this persona, feeding the Ranker's
    /// `f_temperature` term.
    pub fn target_temperature(&self) -> f64 {
        match self {
            Persona::Code => 0.5,
            Persona::Writing => 0.9,
            Persona::Analysis => 0.3,
            Persona::Generic => 0.7,
        }
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Persona::Code => "code",
            Persona::Writing => "writing",
            Persona::Analysis => "analysis",
            Persona::Generic => "generic",
        };
        write!(f, "{s}")
    }
}

/// The fundamental entity: one generated prompt, after one phase, with its
/// embedding, score, and lineage.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Prompt {
    /// Stable unique identifier.
    pub id: Uuid,
    /// Final text after the phase that produced it.
    pub content: String,
    /// Which phase produced this prompt.
    pub phase: Phase,
    /// Producer provider name.
    pub provider: String,
    /// Producer model name.
    pub model: String,
    /// Sampling temperature used, 0.0-2.0.
    pub temperature: f64,
    /// Requested max tokens.
    pub max_tokens: u32,
    /// Tokens actually consumed, if known.
    pub actual_tokens: Option<u32>,
    /// Hash of (origin_input, persona, phase, provider, model, temperature).
    pub input_fingerprint: [u8; 32],
    /// Groups prompts produced by one user request.
    pub session_id: Uuid,
    /// The prompt fed into the phase that produced this one, if any.
    pub parent_id: Option<Uuid>,
    /// The original raw user input before any phase.
    pub origin_input: String,
    /// Target domain flavor.
    pub persona: Persona,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Final ranked score in [0, 10].
    pub score: f64,
    /// Monotonic creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Embedding vector for this prompt's content.
    pub embedding: Embedding,
}

impl Prompt {
    /// Starts building a new prompt with required fields.
    pub fn builder(
        content: impl Into<String>,
        phase: Phase,
        session_id: Uuid,
        origin_input: impl Into<String>,
        persona: Persona,
    ) -> PromptBuilder {
        PromptBuilder::new(content, phase, session_id, origin_input, persona)
    }

    /// `true` if `score` falls within the valid [0, 10] range.
    pub fn has_valid_score(&self) -> bool {
        (crate::constants::SCORE_MIN..=crate::constants::SCORE_MAX).contains(&self.score)
    }
}

/// Builder for [`Prompt`], filling in id/created_at/fingerprint at `build()`.
pub struct PromptBuilder {
    content: String,
    phase: Phase,
    provider: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    actual_tokens: Option<u32>,
    session_id: Uuid,
    parent_id: Option<Uuid>,
    origin_input: String,
    persona: Persona,
    tags: Vec<String>,
    score: f64,
    embedding: Option<Embedding>,
}

impl PromptBuilder {
    fn new(
        content: impl Into<String>,
        phase: Phase,
        session_id: Uuid,
        origin_input: impl Into<String>,
        persona: Persona,
    ) -> Self {
        Self {
            content: content.into(),
            phase,
            provider: String::new(),
            model: String::new(),
            temperature: 1.0,
            max_tokens: 1024,
            actual_tokens: None,
            session_id,
            parent_id: None,
            origin_input: origin_input.into(),
            persona,
            tags: Vec::new(),
            score: 0.0,
            embedding: None,
        }
    }

    /// Sets the producer provider/model identity.
    pub fn producer(mut self, provider: impl Into<String>, model: impl Into<String>) -> Self {
        self.provider = provider.into();
        self.model = model.into();
        self
    }

    /// Sets sampling temperature.
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets requested max tokens.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets tokens actually consumed.
    pub fn actual_tokens(mut self, actual_tokens: u32) -> Self {
        self.actual_tokens = Some(actual_tokens);
        self
    }

    /// Sets the cascade parent (the prompt fed into this phase).
    pub fn parent_id(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Sets tags.
    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Sets the ranked score; caller is responsible for the 0..10 scale.
    pub fn score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    /// Sets the embedding vector.
    pub fn embedding(mut self, embedding: Embedding) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Finalizes the prompt, computing its id, fingerprint, and timestamp.
    pub fn build(self) -> Prompt {
        let fingerprint = crate::hashing::hash_input_fingerprint(
            &self.origin_input,
            self.persona,
            self.phase,
            &self.provider,
            &self.model,
            self.temperature,
        );

        Prompt {
            id: Uuid::new_v4(),
            content: self.content,
            phase: self.phase,
            provider: self.provider,
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            actual_tokens: self.actual_tokens,
            input_fingerprint: fingerprint,
            session_id: self.session_id,
            parent_id: self.parent_id,
            origin_input: self.origin_input,
            persona: self.persona,
            tags: self.tags,
            score: self.score,
            created_at: Utc::now(),
            embedding: self.embedding.unwrap_or_default(),
        }
    }
}
