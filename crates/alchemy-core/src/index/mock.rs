//! In-memory stand-in for [`super::SemanticIndex`], used by the `mock`
//! feature and the crate's own test suite.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use super::{IndexError, IndexFilters, IndexMatch, IndexPayload, VectorIndex};

#[derive(Clone)]
struct Entry {
    vector: Vec<f32>,
    payload: IndexPayload,
}

/// Brute-force cosine-similarity index. Correct, not fast; fine for tests
/// and small offline demos.
///
/// Shares its point map behind an `Arc` so the index is cheaply `Clone`,
/// matching [`crate::index::SemanticIndex`]'s cheap-to-clone Qdrant client
/// handle — callers holding a `MockIndex` always see the same points.
#[derive(Default, Clone)]
pub struct MockIndex {
    points: Arc<RwLock<HashMap<Uuid, Entry>>>,
}

impl MockIndex {
    /// Creates an empty mock index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vectors currently stored.
    pub fn len(&self) -> usize {
        self.points.read().expect("lock poisoned").len()
    }

    /// `true` if no vectors are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cosine similarity between two equal-length vectors; `0.0` if either is
/// zero-length or they disagree in length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

impl VectorIndex for MockIndex {
    async fn upsert(&self, id: Uuid, vector: Vec<f32>, payload: IndexPayload) -> Result<(), IndexError> {
        let mut points = self.points.write().expect("lock poisoned");
        points.insert(id, Entry { vector, payload });
        Ok(())
    }

    async fn query(
        &self,
        vector: Vec<f32>,
        k: usize,
        filters: IndexFilters,
    ) -> Result<Vec<IndexMatch>, IndexError> {
        let points = self.points.read().expect("lock poisoned");
        let mut matches: Vec<IndexMatch> = points
            .iter()
            .filter(|(_, entry)| {
                if let Some(provider) = &filters.provider {
                    if &entry.payload.provider != provider {
                        return false;
                    }
                }
                if let Some(phase) = filters.phase {
                    if entry.payload.phase != phase {
                        return false;
                    }
                }
                if let Some(persona) = filters.persona {
                    if entry.payload.persona != persona {
                        return false;
                    }
                }
                if let Some(min_score) = filters.min_score {
                    if entry.payload.score < min_score {
                        return false;
                    }
                }
                true
            })
            .map(|(id, entry)| IndexMatch {
                id: *id,
                similarity: cosine_similarity(&vector, &entry.vector),
                payload: entry.payload.clone(),
            })
            .collect();

        matches.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap());
        matches.truncate(k);
        Ok(matches)
    }

    async fn delete(&self, id: Uuid) -> Result<(), IndexError> {
        self.points.write().expect("lock poisoned").remove(&id);
        Ok(())
    }
}
