//! Durable Prompt Store: `id -> Prompt` plus the `Session`, `Relationship`,
//! and `Metrics` auxiliary tables. Backed by a single-file SQLite
//! database; embeddings live alongside each prompt row so that a read after
//! a committed insert always observes both.
//!
//! `search_semantic` and `hybrid` delegate similarity search to a
//! [`crate::index::VectorIndex`] and hydrate the matched ids back into full
//! rows here — the store itself never computes cosine similarity.

pub mod error;
pub mod model;


pub use error::StoreError;
pub use model::{MaintenancePolicy, MetricsDelta, ScoredPrompt, StoreFilters};

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::instrument;
use uuid::Uuid;

use crate::index::{IndexFilters, IndexPayload, VectorIndex};
use crate::model::{Embedding, MetricsRecord, Persona, Phase, Prompt, Relationship, RelationshipKind, Session, Strategy};

const INIT_SQL: &str = include_str!("sql/0001_init.sql");

/// Durable store for prompts, sessions, relationships, and metrics.
#[derive(Clone)]
pub struct PromptStore {
    pool: SqlitePool,
}

impl PromptStore {
    /// Opens (creating if absent) the SQLite file at `data_dir/prompts.db`
    /// and applies the schema.
    pub async fn connect(data_dir: &Path) -> Result<Self, StoreError> {
        let db_path = data_dir.join("prompts.db");
        Self::connect_path(&db_path).await
    }

    /// Opens a store at an explicit path. `:memory:` and `sqlite::memory:`
    /// are valid for tests.
    pub async fn connect_path(path: &Path) -> Result<Self, StoreError> {
        let path_str = path.to_string_lossy().to_string();
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{path_str}"))
            .map_err(|e| StoreError::ConnectionFailed {
                path: path_str.clone(),
                source: e,
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::ConnectionFailed {
                path: path_str.clone(),
                source: e,
            })?;

        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// Opens an in-memory store, useful for tests and for `mock`-feature
    /// deployments that never touch disk.
    pub async fn connect_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StoreError::ConnectionFailed {
                path: "sqlite::memory:".to_string(),
                source: e,
            })?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<(), StoreError> {
        for statement in INIT_SQL.split(';') {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                continue;
            }
            sqlx::query(trimmed).execute(pool).await?;
        }
        Ok(())
    }

    /// Persists a session. `origin_input` is immutable once written;
    /// callers must not call this twice for the same `session_id`.
    #[instrument(skip(self, session))]
    pub async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sessions (session_id, origin_input, persona, phase_strategy, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(session.session_id.to_string())
        .bind(&session.origin_input)
        .bind(session.persona.to_string())
        .bind(session.phase_strategy.to_string())
        .bind(session.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Inserts `prompt` and its embedding atomically. If a prompt with the
    /// same `input_fingerprint` already exists, the insert is a no-op and
    /// the existing row's id is returned.
    #[instrument(skip(self, prompt))]
    pub async fn insert(&self, prompt: &Prompt) -> Result<Uuid, StoreError> {
        let mut tx = self.pool.begin().await?;

        let tags_json = serde_json::to_string(&prompt.tags).map_err(|e| StoreError::Decode(e.to_string()))?;
        let embedding_bytes = encode_embedding(&prompt.embedding);

        let result = sqlx::query(
            "INSERT INTO prompts (
                id, content, phase, provider, model, temperature, max_tokens, actual_tokens,
                input_fingerprint, session_id, parent_id, origin_input, persona, tags, score,
                created_at, embedding_model, embedding_vector
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (input_fingerprint) DO NOTHING",
        )
        .bind(prompt.id.to_string())
        .bind(&prompt.content)
        .bind(prompt.phase.slug())
        .bind(&prompt.provider)
        .bind(&prompt.model)
        .bind(prompt.temperature)
        .bind(prompt.max_tokens)
        .bind(prompt.actual_tokens)
        .bind(prompt.input_fingerprint.as_slice())
        .bind(prompt.session_id.to_string())
        .bind(prompt.parent_id.map(|id| id.to_string()))
        .bind(&prompt.origin_input)
        .bind(prompt.persona.to_string())
        .bind(tags_json)
        .bind(prompt.score)
        .bind(prompt.created_at.to_rfc3339())
        .bind(&prompt.embedding.model)
        .bind(embedding_bytes)
        .execute(&mut *tx)
        .await?;

        let canonical_id = if result.rows_affected() == 1 {
            sqlx::query("INSERT INTO metrics (prompt_id) VALUES (?)")
                .bind(prompt.id.to_string())
                .execute(&mut *tx)
                .await?;
            prompt.id
        } else {
            let row = sqlx::query("SELECT id FROM prompts WHERE input_fingerprint = ?")
                .bind(prompt.input_fingerprint.as_slice())
                .fetch_one(&mut *tx)
                .await?;
            parse_uuid(row.try_get::<String, _>("id")?)?
        };

        tx.commit().await?;
        Ok(canonical_id)
    }

    /// Cheap liveness probe for `GET /health`: `true` if the pool still
    /// accepts a trivial query.
    pub async fn is_connected(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    /// Fetches the full prompt for `id`.
    pub async fn get(&self, id: Uuid) -> Result<Prompt, StoreError> {
        let row = sqlx::query("SELECT * FROM prompts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;
        prompt_from_row(&row)
    }

    /// Fetches a session by id.
    pub async fn get_session(&self, session_id: Uuid) -> Result<Session, StoreError> {
        let row = sqlx::query("SELECT * FROM sessions WHERE session_id = ?")
            .bind(session_id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(session_id))?;

        let strategy_str: String = row.try_get("phase_strategy")?;
        let phase_strategy = session_strategy_from_str(&strategy_str)
            .ok_or_else(|| StoreError::Decode(format!("unknown phase_strategy '{strategy_str}'")))?;

        Ok(Session {
            session_id: parse_uuid(row.try_get("session_id")?)?,
            origin_input: row.try_get("origin_input")?,
            persona: parse_persona(&row.try_get::<String, _>("persona")?)?,
            created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
            phase_strategy,
        })
    }

    /// Fetches the metrics record for `id`.
    pub async fn get_metrics(&self, id: Uuid) -> Result<MetricsRecord, StoreError> {
        let row = sqlx::query("SELECT * FROM metrics WHERE prompt_id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;
        metrics_from_row(&row)
    }

    /// Relevance-ordered text match over prompt content, honoring `filters`.
    #[instrument(skip(self, filters))]
    pub async fn search_text(
        &self,
        query: &str,
        filters: &StoreFilters,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Prompt>, StoreError> {
        let mut sql = String::from("SELECT * FROM prompts WHERE content LIKE ?");
        let like_query = format!("%{query}%");
        let mut conditions = Vec::new();

        if filters.provider.is_some() {
            conditions.push("provider = ?");
        }
        if filters.phase.is_some() {
            conditions.push("phase = ?");
        }
        if filters.persona.is_some() {
            conditions.push("persona = ?");
        }
        if filters.min_score.is_some() {
            conditions.push("score >= ?");
        }
        if filters.since.is_some() {
            conditions.push("created_at >= ?");
        }
        if filters.until.is_some() {
            conditions.push("created_at <= ?");
        }
        for tag in &filters.tags {
            let _ = tag;
            conditions.push("tags LIKE ?");
        }
        for condition in &conditions {
            sql.push_str(" AND ");
            sql.push_str(condition);
        }
        sql.push_str(" ORDER BY score DESC, created_at ASC LIMIT ? OFFSET ?");

        let mut q = sqlx::query(&sql).bind(like_query);
        if let Some(provider) = &filters.provider {
            q = q.bind(provider.clone());
        }
        if let Some(phase) = filters.phase {
            q = q.bind(phase.slug());
        }
        if let Some(persona) = filters.persona {
            q = q.bind(persona.to_string());
        }
        if let Some(min_score) = filters.min_score {
            q = q.bind(min_score);
        }
        if let Some(since) = filters.since {
            q = q.bind(since.to_rfc3339());
        }
        if let Some(until) = filters.until {
            q = q.bind(until.to_rfc3339());
        }
        for tag in &filters.tags {
            q = q.bind(format!("%\"{tag}\"%"));
        }
        q = q.bind(limit).bind(offset);

        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(prompt_from_row).collect()
    }

    /// Cosine-similarity top-`k` search, delegated to `index` and hydrated
    /// back into full rows.
    #[instrument(skip(self, index, query_vector, filters))]
    pub async fn search_semantic(
        &self,
        index: &impl VectorIndex,
        query_vector: Vec<f32>,
        k: usize,
        filters: IndexFilters,
        min_similarity: f32,
    ) -> Result<Vec<ScoredPrompt>, StoreError> {
        let matches = index
            .query(query_vector, k, filters)
            .await
            .map_err(|e| StoreError::QueryFailed(sqlx::Error::Protocol(e.to_string())))?;

        let mut results = Vec::with_capacity(matches.len());
        for m in matches.into_iter().filter(|m| m.similarity >= min_similarity) {
            let prompt = self.get(m.id).await?;
            results.push(ScoredPrompt {
                prompt,
                relevance: m.similarity as f64,
            });
        }
        Ok(results)
    }

    /// Merges [`Self::search_text`] and [`Self::search_semantic`] results,
    /// averaging each candidate's normalized text rank and semantic
    /// similarity.
    #[instrument(skip(self, index, query_vector, filters))]
    pub async fn hybrid(
        &self,
        query: &str,
        query_vector: Vec<f32>,
        k: usize,
        filters: StoreFilters,
        index: &impl VectorIndex,
    ) -> Result<Vec<ScoredPrompt>, StoreError> {
        let text_matches = self.search_text(query, &filters, k as i64, 0).await?;
        let text_score = |rank: usize, total: usize| -> f64 {
            if total <= 1 {
                1.0
            } else {
                1.0 - (rank as f64 / (total - 1) as f64)
            }
        };

        let index_filters = IndexFilters {
            provider: filters.provider.clone(),
            phase: filters.phase,
            persona: filters.persona,
            min_score: filters.min_score,
        };
        let semantic_matches = self.search_semantic(index, query_vector, k, index_filters, 0.0).await?;

        let mut merged: std::collections::HashMap<Uuid, ScoredPrompt> = std::collections::HashMap::new();
        let total = text_matches.len();
        for (rank, prompt) in text_matches.into_iter().enumerate() {
            let id = prompt.id;
            merged.insert(
                id,
                ScoredPrompt {
                    prompt,
                    relevance: text_score(rank, total) * 0.5,
                },
            );
        }
        for scored in semantic_matches {
            merged
                .entry(scored.prompt.id)
                .and_modify(|existing| existing.relevance += scored.relevance * 0.5)
                .or_insert(ScoredPrompt {
                    prompt: scored.prompt,
                    relevance: scored.relevance * 0.5,
                });
        }

        let mut out: Vec<ScoredPrompt> = merged.into_values().collect();
        out.sort_by(|a, b| b.relevance.partial_cmp(&a.relevance).unwrap_or(std::cmp::Ordering::Equal));
        out.truncate(k);
        Ok(out)
    }

    /// Applies one usage increment. Each prompt id is updated with a single
    /// atomic `UPDATE`, so concurrent callers never race a read-modify-write
    /// on the running average.
    #[instrument(skip(self, delta))]
    pub async fn update_metrics(&self, id: Uuid, delta: MetricsDelta) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE metrics SET
                avg_latency_ms = (avg_latency_ms * usage_count + ?) / (usage_count + 1),
                usage_count = usage_count + 1,
                success_count = success_count + ?,
                failure_count = failure_count + ?,
                last_used_at = ?
             WHERE prompt_id = ?",
        )
        .bind(delta.latency_ms)
        .bind(i64::from(delta.success))
        .bind(i64::from(!delta.success))
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    /// Records a lineage edge between two prompts.
    pub async fn insert_relationship(&self, relationship: &Relationship) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT OR IGNORE INTO relationships (from_prompt_id, to_prompt_id, kind) VALUES (?, ?, ?)",
        )
        .bind(relationship.from_prompt_id.to_string())
        .bind(relationship.to_prompt_id.to_string())
        .bind(relationship_kind_str(relationship.kind))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Deletes a prompt and every relationship edge referencing it in one
    /// transaction, so a prompt is never left dangling with a stale edge.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM relationships WHERE from_prompt_id = ? OR to_prompt_id = ?")
            .bind(id.to_string())
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM metrics WHERE prompt_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM prompts WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    /// Sweeps prompts matching `policy` (unused, low-scoring, stale),
    /// cascading to their relationships and metrics. Returns the number of
    /// prompts removed.
    #[instrument(skip(self, policy))]
    pub async fn maintenance(&self, policy: MaintenancePolicy) -> Result<u64, StoreError> {
        let cutoff = (Utc::now() - policy.max_age).to_rfc3339();
        let candidates: Vec<String> = sqlx::query(
            "SELECT p.id FROM prompts p
             JOIN metrics m ON m.prompt_id = p.id
             WHERE m.usage_count = 0 AND p.score < ? AND p.created_at < ?",
        )
        .bind(policy.max_score)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| row.try_get::<String, _>("id"))
        .collect::<Result<_, _>>()?;

        let mut removed = 0;
        for id in candidates {
            if let Ok(id) = Uuid::parse_str(&id) {
                if self.delete(id).await.is_ok() {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

fn relationship_kind_str(kind: RelationshipKind) -> &'static str {
    match kind {
        RelationshipKind::Cascade => "cascade",
        RelationshipKind::OptimizeIteration => "optimize_iteration",
        RelationshipKind::Variant => "variant",
    }
}

fn parse_uuid(s: String) -> Result<Uuid, StoreError> {
    Uuid::parse_str(&s).map_err(|e| StoreError::Decode(e.to_string()))
}

fn parse_phase(s: &str) -> Result<Phase, StoreError> {
    match s {
        "prima-materia" => Ok(Phase::PrimaMateria),
        "solutio" => Ok(Phase::Solutio),
        "coagulatio" => Ok(Phase::Coagulatio),
        other => Err(StoreError::Decode(format!("unknown phase '{other}'"))),
    }
}

fn parse_persona(s: &str) -> Result<Persona, StoreError> {
    match s {
        "code" => Ok(Persona::Code),
        "writing" => Ok(Persona::Writing),
        "analysis" => Ok(Persona::Analysis),
        "generic" => Ok(Persona::Generic),
        other => Err(StoreError::Decode(format!("unknown persona '{other}'"))),
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode(e.to_string()))
}

fn encode_embedding(embedding: &Embedding) -> Vec<u8> {
    embedding.vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn decode_embedding(model: String, bytes: &[u8]) -> Result<Embedding, StoreError> {
    if bytes.len() % 4 != 0 {
        return Err(StoreError::Decode("embedding byte length not a multiple of 4".into()));
    }
    let vector = bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    Ok(Embedding::new(vector, model))
}

fn prompt_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Prompt, StoreError> {
    let fingerprint_bytes: Vec<u8> = row.try_get("input_fingerprint")?;
    let fingerprint: [u8; 32] = fingerprint_bytes
        .try_into()
        .map_err(|_| StoreError::Decode("input_fingerprint is not 32 bytes".into()))?;

    let tags_json: String = row.try_get("tags")?;
    let tags: Vec<String> = serde_json::from_str(&tags_json).map_err(|e| StoreError::Decode(e.to_string()))?;

    let embedding_bytes: Vec<u8> = row.try_get("embedding_vector")?;
    let embedding_model: String = row.try_get("embedding_model")?;

    Ok(Prompt {
        id: parse_uuid(row.try_get("id")?)?,
        content: row.try_get("content")?,
        phase: parse_phase(&row.try_get::<String, _>("phase")?)?,
        provider: row.try_get("provider")?,
        model: row.try_get("model")?,
        temperature: row.try_get("temperature")?,
        max_tokens: row.try_get::<i64, _>("max_tokens")? as u32,
        actual_tokens: row.try_get::<Option<i64>, _>("actual_tokens")?.map(|v| v as u32),
        input_fingerprint: fingerprint,
        session_id: parse_uuid(row.try_get("session_id")?)?,
        parent_id: row
            .try_get::<Option<String>, _>("parent_id")?
            .map(parse_uuid)
            .transpose()?,
        origin_input: row.try_get("origin_input")?,
        persona: parse_persona(&row.try_get::<String, _>("persona")?)?,
        tags,
        score: row.try_get("score")?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
        embedding: decode_embedding(embedding_model, &embedding_bytes)?,
    })
}

fn metrics_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<MetricsRecord, StoreError> {
    Ok(MetricsRecord {
        usage_count: row.try_get::<i64, _>("usage_count")? as u64,
        last_used_at: row
            .try_get::<Option<String>, _>("last_used_at")?
            .map(|s| parse_timestamp(&s))
            .transpose()?,
        avg_latency_ms: row.try_get("avg_latency_ms")?,
        success_count: row.try_get::<i64, _>("success_count")? as u64,
        failure_count: row.try_get::<i64, _>("failure_count")? as u64,
    })
}

fn session_strategy_from_str(s: &str) -> Option<Strategy> {
    match s {
        "best" => Some(Strategy::Best),
        "cascade" => Some(Strategy::Cascade),
        "all" => Some(Strategy::All),
        _ => None,
    }
}
