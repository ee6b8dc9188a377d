//! Semantic vector index backing [`crate::store::PromptStore::search_semantic`].
//! Maintains a Qdrant collection keyed by prompt id whose vectors share the
//! registered embedding model and dimension; cosine distance.

pub mod error;
pub mod model;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(test)]
mod tests;

pub use error::IndexError;
pub use model::{IndexFilters, IndexMatch, IndexPayload};

use std::collections::HashMap;

use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use uuid::Uuid;

use crate::constants::validate_embedding_dim;
use crate::model::{Persona, Phase};

/// Default collection name for prompt embeddings.
pub const DEFAULT_COLLECTION_NAME: &str = "alchemy_prompts";

/// Minimal async interface implemented by both the real Qdrant-backed
/// index and the in-memory [`mock::MockIndex`] used in tests.
pub trait VectorIndex: Send + Sync {
    /// Inserts or replaces the vector and payload for `id`.
    fn upsert(
        &self,
        id: Uuid,
        vector: Vec<f32>,
        payload: IndexPayload,
    ) -> impl std::future::Future<Output = Result<(), IndexError>> + Send;

    /// Returns the `k` nearest neighbors to `vector` matching `filters`.
    fn query(
        &self,
        vector: Vec<f32>,
        k: usize,
        filters: IndexFilters,
    ) -> impl std::future::Future<Output = Result<Vec<IndexMatch>, IndexError>> + Send;

    /// Removes `id` from the index.
    fn delete(&self, id: Uuid) -> impl std::future::Future<Output = Result<(), IndexError>> + Send;
}

/// Qdrant-backed implementation of [`VectorIndex`].
#[derive(Clone)]
pub struct SemanticIndex {
    client: Qdrant,
    collection: String,
    vector_size: usize,
}

impl SemanticIndex {
    /// Connects to `url` and ensures `collection` exists with `vector_size`
    /// dimensions and cosine distance.
    pub async fn connect(url: &str, collection: &str, vector_size: usize) -> Result<Self, IndexError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| IndexError::ConnectionFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let index = Self {
            client,
            collection: collection.to_string(),
            vector_size,
        };
        index.ensure_collection().await?;
        Ok(index)
    }

    async fn ensure_collection(&self) -> Result<(), IndexError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| IndexError::CollectionUnavailable {
                collection: self.collection.clone(),
                message: e.to_string(),
            })?;

        if !exists {
            let vectors_config = VectorParamsBuilder::new(self.vector_size as u64, Distance::Cosine);
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection)
                        .vectors_config(vectors_config)
                        .on_disk_payload(true),
                )
                .await
                .map_err(|e| IndexError::CollectionUnavailable {
                    collection: self.collection.clone(),
                    message: e.to_string(),
                })?;
        }

        Ok(())
    }

    /// Configured vector dimension for this collection.
    pub fn vector_size(&self) -> usize {
        self.vector_size
    }
}

fn payload_to_qdrant(payload: &IndexPayload) -> HashMap<String, qdrant_client::qdrant::Value> {
    let mut map = HashMap::new();
    map.insert("phase".to_string(), payload.phase.slug().into());
    map.insert("persona".to_string(), payload.persona.to_string().into());
    map.insert("provider".to_string(), payload.provider.clone().into());
    map.insert("score".to_string(), payload.score.into());
    map.insert(
        "session_id".to_string(),
        payload.session_id.to_string().into(),
    );
    map
}

fn payload_from_qdrant(
    map: &HashMap<String, qdrant_client::qdrant::Value>,
) -> Option<IndexPayload> {
    let phase = match map.get("phase")?.as_str()? {
        "prima-materia" => Phase::PrimaMateria,
        "solutio" => Phase::Solutio,
        "coagulatio" => Phase::Coagulatio,
        _ => return None,
    };
    let persona = match map.get("persona")?.as_str()? {
        "code" => Persona::Code,
        "writing" => Persona::Writing,
        "analysis" => Persona::Analysis,
        _ => Persona::Generic,
    };
    let provider = map.get("provider")?.as_str()?.to_string();
    let score = map.get("score")?.as_double()?;
    let session_id = Uuid::parse_str(map.get("session_id")?.as_str()?).ok()?;

    Some(IndexPayload {
        phase,
        persona,
        provider,
        score,
        session_id,
    })
}

impl VectorIndex for SemanticIndex {
    async fn upsert(&self, id: Uuid, vector: Vec<f32>, payload: IndexPayload) -> Result<(), IndexError> {
        if vector.len() != self.vector_size {
            return Err(IndexError::DimensionMismatch {
                expected: self.vector_size,
                actual: vector.len(),
            });
        }
        validate_embedding_dim(vector.len(), self.vector_size)
            .map_err(|_| IndexError::DimensionMismatch {
                expected: self.vector_size,
                actual: vector.len(),
            })?;

        let point = PointStruct::new(id.to_string(), vector, payload_to_qdrant(&payload));

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]).wait(true))
            .await
            .map_err(|e| IndexError::UpsertFailed {
                collection: self.collection.clone(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    async fn query(
        &self,
        vector: Vec<f32>,
        k: usize,
        filters: IndexFilters,
    ) -> Result<Vec<IndexMatch>, IndexError> {
        let mut conditions = Vec::new();
        if let Some(provider) = &filters.provider {
            conditions.push(Condition::matches("provider", provider.clone()));
        }
        if let Some(phase) = filters.phase {
            conditions.push(Condition::matches("phase", phase.slug().to_string()));
        }
        if let Some(persona) = filters.persona {
            conditions.push(Condition::matches("persona", persona.to_string()));
        }

        let mut builder = SearchPointsBuilder::new(&self.collection, vector, k as u64).with_payload(true);
        if !conditions.is_empty() {
            builder = builder.filter(Filter::must(conditions));
        }

        let result = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| IndexError::QueryFailed {
                collection: self.collection.clone(),
                message: e.to_string(),
            })?;

        let matches = result
            .result
            .into_iter()
            .filter_map(|point| {
                let id_str = match point.id.and_then(|p| p.point_id_options) {
                    Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(s)) => s,
                    Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(n)) => n.to_string(),
                    None => return None,
                };
                let id = Uuid::parse_str(&id_str).ok()?;
                let payload = payload_from_qdrant(&point.payload)?;
                if let Some(min_score) = filters.min_score {
                    if payload.score < min_score {
                        return None;
                    }
                }
                Some(IndexMatch {
                    id,
                    similarity: point.score,
                    payload,
                })
            })
            .collect();

        Ok(matches)
    }

    async fn delete(&self, id: Uuid) -> Result<(), IndexError> {
        use qdrant_client::qdrant::{DeletePointsBuilder, PointsIdsList};

        let selector = PointsIdsList {
            ids: vec![id.to_string().into()],
        };

        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(selector)
                    .wait(true),
            )
            .await
            .map_err(|e| IndexError::DeleteFailed {
                collection: self.collection.clone(),
                message: e.to_string(),
            })?;

        Ok(())
    }
}
