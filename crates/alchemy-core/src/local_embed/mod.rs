//! Offline candle-based embedder, used as a last-resort fallback when no
//! configured provider can embed text (e.g. an Ollama-only deployment with
//! every cloud provider disabled). Gated behind the `local-embeddings`
//! feature; callers reach it through [`crate::providers::Registry::embed`]
//! when [`crate::config::EmbeddingsConfig::local_fallback`] is set.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::LocalEmbedError;

use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tracing::{debug, info};

use crate::model::Embedding;

/// Configuration for [`LocalEmbedder`].
#[derive(Debug, Clone)]
pub struct LocalEmbedConfig {
    /// Directory holding `config.json`, `model.safetensors`, and
    /// `tokenizer.json`.
    pub model_dir: PathBuf,
    /// Max tokens considered per input; longer inputs are truncated.
    pub max_seq_len: usize,
    /// Output embedding dimension advertised to callers (the model's hidden
    /// size, truncated or padded to this if they disagree).
    pub embedding_dim: usize,
}

impl Default for LocalEmbedConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::new(),
            max_seq_len: 256,
            embedding_dim: crate::constants::DEFAULT_EMBEDDING_DIM,
        }
    }
}

impl LocalEmbedConfig {
    /// Builds a config pointed at `model_dir`.
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            ..Default::default()
        }
    }

    fn config_path(&self) -> PathBuf {
        self.model_dir.join("config.json")
    }

    fn weights_path(&self) -> PathBuf {
        self.model_dir.join("model.safetensors")
    }

    fn tokenizer_path(&self) -> PathBuf {
        self.model_dir.join("tokenizer.json")
    }

    fn is_available(&self) -> bool {
        self.config_path().exists() && self.weights_path().exists() && self.tokenizer_path().exists()
    }
}

/// Local embedder: a BERT encoder run on CPU, mean-pooled over the
/// attention mask and L2-normalized, matching the shape callers expect from
/// a hosted embedding endpoint.
pub struct LocalEmbedder {
    model: BertModel,
    tokenizer: tokenizers::Tokenizer,
    device: Device,
    config: LocalEmbedConfig,
}

impl std::fmt::Debug for LocalEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEmbedder")
            .field("model_dir", &self.config.model_dir)
            .field("embedding_dim", &self.config.embedding_dim)
            .finish()
    }
}

impl LocalEmbedder {
    /// Loads the model and tokenizer from `config.model_dir`.
    pub fn load(config: LocalEmbedConfig) -> Result<Self, LocalEmbedError> {
        if !config.is_available() {
            return Err(LocalEmbedError::ModelNotFound {
                path: config.model_dir.clone(),
            });
        }

        let device = Device::Cpu;
        let bert_config: BertConfig = serde_json::from_str(&std::fs::read_to_string(config.config_path())?)
            .map_err(|e| LocalEmbedError::ModelLoadFailed {
                reason: format!("failed to parse bert config.json: {e}"),
            })?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[config.weights_path()], DTYPE, &device)
                .map_err(|e| LocalEmbedError::ModelLoadFailed {
                    reason: format!("failed to map model weights: {e}"),
                })?
        };
        let model = BertModel::load(vb, &bert_config).map_err(|e| LocalEmbedError::ModelLoadFailed {
            reason: format!("failed to load BERT encoder: {e}"),
        })?;

        let tokenizer = Self::load_tokenizer(&config.tokenizer_path())?;

        info!(
            model_dir = %config.model_dir.display(),
            hidden_size = bert_config.hidden_size,
            "local embedding model loaded"
        );

        Ok(Self {
            model,
            tokenizer,
            device,
            config,
        })
    }

    fn load_tokenizer(path: &Path) -> Result<tokenizers::Tokenizer, LocalEmbedError> {
        tokenizers::Tokenizer::from_file(path).map_err(|e| LocalEmbedError::TokenizationFailed {
            reason: format!("failed to load tokenizer at {}: {e}", path.display()),
        })
    }

    /// Embeds one string, mean-pooling the final hidden states over the
    /// attention mask and L2-normalizing the result.
    pub fn embed(&self, text: &str, model_name: &str) -> Result<Embedding, LocalEmbedError> {
        let mut encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| LocalEmbedError::TokenizationFailed { reason: e.to_string() })?;
        encoding.truncate(self.config.max_seq_len, 0, tokenizers::TruncationDirection::Right);

        let token_ids = encoding.get_ids().to_vec();
        if token_ids.is_empty() {
            return Ok(Embedding::new(vec![0.0; self.config.embedding_dim], model_name.to_string()));
        }

        debug!(text_len = text.len(), token_count = token_ids.len(), "local embedding forward pass");

        let token_ids = Tensor::new(&token_ids[..], &self.device)?.unsqueeze(0)?;
        let token_type_ids = token_ids.zeros_like()?;
        let attention_mask = Tensor::new(&vec![1u32; encoding.get_ids().len()][..], &self.device)?.unsqueeze(0)?;

        let hidden_states = self.model.forward(&token_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = Self::mean_pool(&hidden_states, &attention_mask)?;
        let vector = pooled.to_vec1::<f32>()?;

        Ok(Embedding::new(Self::normalize(vector), model_name.to_string()))
    }

    fn mean_pool(hidden_states: &Tensor, attention_mask: &Tensor) -> Result<Tensor, candle_core::Error> {
        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let masked = hidden_states.broadcast_mul(&mask)?;
        let summed = masked.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9, f64::INFINITY)?;
        summed.broadcast_div(&counts)?.squeeze(0)
    }

    fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }

    /// `true` if the configured model/tokenizer files exist on disk.
    pub fn is_available(config: &LocalEmbedConfig) -> bool {
        config.is_available()
    }
}
