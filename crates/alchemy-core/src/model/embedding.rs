/// A dense embedding vector plus the name of the model that produced it.
///
/// Dimension is whatever the producing model emits; callers validate against
/// the configured standard dimension with [`crate::constants::validate_embedding_dim`]
/// before writing into the semantic index.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Embedding {
    /// Ordered vector components.
    pub vector: Vec<f32>,
    /// Name of the embedding model that produced `vector`.
    pub model: String,
}

impl Embedding {
    /// Builds an embedding from a vector and model name.
    pub fn new(vector: Vec<f32>, model: impl Into<String>) -> Self {
        Self {
            vector,
            model: model.into(),
        }
    }

    /// Number of components.
    pub fn dim(&self) -> usize {
        self.vector.len()
    }

    /// `true` if the embedding has no components.
    pub fn is_empty(&self) -> bool {
        self.vector.is_empty()
    }

    /// Cosine similarity against another embedding. Returns `0.0` if either
    /// vector is zero-length or the dimensions disagree.
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        if self.vector.len() != other.vector.len() || self.vector.is_empty() {
            return 0.0;
        }
        let dot: f32 = self
            .vector
            .iter()
            .zip(other.vector.iter())
            .map(|(a, b)| a * b)
            .sum();
        let norm_a = self.vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        let norm_b = other.vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_identical_vectors_is_one() {
        let a = Embedding::new(vec![1.0, 2.0, 3.0], "test-model");
        let b = Embedding::new(vec![1.0, 2.0, 3.0], "test-model");
        assert!((a.cosine_similarity(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_orthogonal_is_zero() {
        let a = Embedding::new(vec![1.0, 0.0], "test-model");
        let b = Embedding::new(vec![0.0, 1.0], "test-model");
        assert!(a.cosine_similarity(&b).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_mismatched_dims_is_zero() {
        let a = Embedding::new(vec![1.0, 0.0], "test-model");
        let b = Embedding::new(vec![1.0, 0.0, 0.0], "test-model");
        assert_eq!(a.cosine_similarity(&b), 0.0);
    }

    #[test]
    fn empty_embedding_has_zero_dim() {
        let e = Embedding::default();
        assert_eq!(e.dim(), 0);
        assert!(e.is_empty());
    }
}
