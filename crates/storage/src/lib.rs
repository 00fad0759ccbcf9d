//! Persistence Layer (C8), per spec.md §4.7.
//!
//! Grounded on the teacher's `PostgresMetadataStorage`
//! (`crates/storage/src/metadata_storage.rs`): `CREATE TABLE IF NOT EXISTS`
//! schema setup, `client.execute`/`query` per statement. Pooled via
//! `deadpool-postgres` rather than the teacher's single `tokio_postgres::Client`
//! since the orchestrator runs several DB workers concurrently (C9); vectors
//! stored with `pgvector` in place of the teacher's Qdrant client, since
//! spec.md requires Postgres-native per-dimension tables, not an external
//! vector database.
pub mod error;

use std::collections::HashMap;

use chrono::Utc;
use deadpool_postgres::Pool;
use ingest_common::model::{SourceRecord, TranscriptSegment};
use ingest_common::speaker_label::SpeakerLabel;
use pgvector::Vector;

pub use error::StorageError;

/// `lists = max(50, min(100, sqrt(row_count)))`, per spec.md §4.7's
/// redesigned IVFFlat sizing (the original implementation used a flat
/// default of 100 regardless of table size).
#[must_use]
pub fn ivfflat_lists(row_count: i64) -> i64 {
    let sqrt_n = (row_count.max(0) as f64).sqrt();
    let clamped = sqrt_n.clamp(10.0, 100.0);
    clamped.max(50.0).round() as i64
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PersistStats {
    pub segments_inserted: u64,
    pub segments_known: u64,
    pub segments_guest: u64,
    pub segments_unknown: u64,
    pub embeddings_inserted: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct PersistOptions {
    pub store_known_only: bool,
}

pub struct Storage {
    pool: Pool,
}

impl Storage {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn client(&self) -> Result<deadpool_postgres::Client, StorageError> {
        self.pool.get().await.map_err(|e| StorageError::Pool(e.to_string()))
    }

    /// Create the sources/segments tables if absent. Safe to call on every
    /// startup; mirrors the teacher's `init_schema`.
    pub async fn init_schema(&self) -> Result<(), StorageError> {
        let client = self.client().await?;
        client
            .batch_execute(
                r"
                CREATE TABLE IF NOT EXISTS sources (
                    id BIGSERIAL PRIMARY KEY,
                    external_id TEXT NOT NULL UNIQUE,
                    title TEXT NOT NULL,
                    source_kind TEXT NOT NULL,
                    publish_time TIMESTAMPTZ,
                    duration_s DOUBLE PRECISION,
                    url TEXT,
                    tags JSONB,
                    provenance_metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
                );

                CREATE TABLE IF NOT EXISTS segments (
                    id BIGSERIAL PRIMARY KEY,
                    source_id BIGINT NOT NULL REFERENCES sources(id),
                    start_s DOUBLE PRECISION NOT NULL,
                    end_s DOUBLE PRECISION NOT NULL,
                    text TEXT NOT NULL,
                    speaker_label TEXT NOT NULL,
                    speaker_confidence REAL,
                    avg_logprob REAL,
                    compression_ratio REAL,
                    no_speech_prob REAL,
                    re_asr BOOLEAN NOT NULL DEFAULT false,
                    needs_refinement BOOLEAN NOT NULL DEFAULT false,
                    is_overlap BOOLEAN NOT NULL DEFAULT false
                );

                CREATE INDEX IF NOT EXISTS idx_segments_source_id ON segments(source_id);
                ",
            )
            .await
            .map_err(|e| StorageError::Postgres(e.to_string()))
    }

    /// Create `segment_embeddings_{dim}` on demand. In production mode a
    /// missing table is a hard failure; in development with `auto_create` it
    /// is created along with a cosine-ops IVFFlat index.
    pub async fn ensure_embedding_table(&self, dim: usize, production_mode: bool, auto_create: bool) -> Result<(), StorageError> {
        let client = self.client().await?;
        let table = format!("segment_embeddings_{dim}");
        let exists: bool = client
            .query_one("SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1)", &[&table])
            .await
            .map_err(|e| StorageError::Postgres(e.to_string()))?
            .get(0);

        if exists {
            return Ok(());
        }
        if production_mode {
            return Err(StorageError::MissingEmbeddingTable(dim));
        }
        if !auto_create {
            return Err(StorageError::MissingEmbeddingTable(dim));
        }

        tracing::warn!(table, "embedding table missing, auto-creating in development mode");
        let create = format!(
            "CREATE TABLE {table} (
                segment_id BIGINT NOT NULL REFERENCES segments(id),
                model_key TEXT NOT NULL,
                embedding VECTOR({dim}) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                UNIQUE (segment_id, model_key)
            )"
        );
        client.batch_execute(&create).await.map_err(|e| StorageError::Postgres(e.to_string()))?;

        let row_count: i64 = client
            .query_one(&format!("SELECT count(*) FROM {table}"), &[])
            .await
            .map_err(|e| StorageError::Postgres(e.to_string()))?
            .get(0);
        let lists = ivfflat_lists(row_count);
        let index = format!(
            "CREATE INDEX ON {table} USING ivfflat (embedding vector_cosine_ops) WITH (lists = {lists})"
        );
        client.batch_execute(&index).await.map_err(|e| StorageError::Postgres(e.to_string()))?;
        Ok(())
    }

    /// `upsert_source`, per spec.md §4.7, unique by `external_id`.
    pub async fn upsert_source(&self, source: &SourceRecord) -> Result<i64, StorageError> {
        let client = self.client().await?;
        let row = client
            .query_one(
                r"
                INSERT INTO sources (external_id, title, source_kind, publish_time, duration_s, url, tags, provenance_metadata)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (external_id) DO UPDATE SET
                    title = EXCLUDED.title,
                    duration_s = EXCLUDED.duration_s,
                    provenance_metadata = EXCLUDED.provenance_metadata,
                    updated_at = now()
                RETURNING id
                ",
                &[
                    &source.external_id,
                    &source.title,
                    &source.source_kind,
                    &source.publish_time,
                    &source.duration_s,
                    &source.url,
                    &serde_json::to_value(&source.tags).unwrap_or(serde_json::Value::Null),
                    &source.provenance_metadata,
                ],
            )
            .await
            .map_err(|e| StorageError::Postgres(e.to_string()))?;
        Ok(row.get(0))
    }

    pub async fn has_existing_segments(&self, external_id: &str) -> Result<bool, StorageError> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT 1 FROM segments s JOIN sources src ON s.source_id = src.id WHERE src.external_id = $1 LIMIT 1",
                &[&external_id],
            )
            .await
            .map_err(|e| StorageError::Postgres(e.to_string()))?;
        Ok(row.is_some())
    }

    /// Persist one video's source row, segments, and embeddings as a single
    /// transaction, per spec.md §4.7's transaction discipline. Upserts and
    /// `ON CONFLICT DO NOTHING` inserts make a retried persist idempotent.
    pub async fn persist_video(
        &self,
        source: &SourceRecord,
        segments: &[TranscriptSegment],
        model_key: &str,
        known_name: &str,
        opts: PersistOptions,
    ) -> Result<PersistStats, StorageError> {
        let mut client = self.client().await?;
        let txn = client.transaction().await.map_err(|e| StorageError::Transaction(e.to_string()))?;

        let source_id: i64 = txn
            .query_one(
                r"
                INSERT INTO sources (external_id, title, source_kind, publish_time, duration_s, url, tags, provenance_metadata)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (external_id) DO UPDATE SET
                    title = EXCLUDED.title,
                    duration_s = EXCLUDED.duration_s,
                    provenance_metadata = EXCLUDED.provenance_metadata,
                    updated_at = now()
                RETURNING id
                ",
                &[
                    &source.external_id,
                    &source.title,
                    &source.source_kind,
                    &source.publish_time,
                    &source.duration_s,
                    &source.url,
                    &serde_json::to_value(&source.tags).unwrap_or(serde_json::Value::Null),
                    &source.provenance_metadata,
                ],
            )
            .await
            .map_err(|e| StorageError::Transaction(e.to_string()))?
            .get(0);

        let mut stats = PersistStats::default();
        let mut segment_ids = Vec::with_capacity(segments.len());

        for seg in segments {
            if opts.store_known_only && !seg.speaker_label.is_known(known_name) {
                continue;
            }
            let row = txn
                .query_one(
                    r"
                    INSERT INTO segments (
                        source_id, start_s, end_s, text, speaker_label, speaker_confidence,
                        avg_logprob, compression_ratio, no_speech_prob,
                        re_asr, needs_refinement, is_overlap
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                    RETURNING id
                    ",
                    &[
                        &source_id,
                        &seg.start_s,
                        &seg.end_s,
                        &seg.text,
                        &label_text(&seg.speaker_label),
                        &seg.speaker_confidence,
                        &seg.asr_quality.avg_logprob,
                        &seg.asr_quality.compression_ratio,
                        &seg.asr_quality.no_speech_prob,
                        &seg.re_asr,
                        &seg.needs_refinement,
                        &seg.is_overlap,
                    ],
                )
                .await
                .map_err(|e| StorageError::Transaction(e.to_string()))?;
            let segment_id: i64 = row.get(0);
            stats.segments_inserted += 1;
            match &seg.speaker_label {
                SpeakerLabel::Known(name) if name.eq_ignore_ascii_case(known_name) => stats.segments_known += 1,
                SpeakerLabel::Guest => stats.segments_guest += 1,
                SpeakerLabel::Known(_) | SpeakerLabel::Unknown => stats.segments_unknown += 1,
            }
            segment_ids.push((segment_id, seg.embedding.clone()));
        }

        if let Some(dim) = segment_ids.iter().find_map(|(_, e)| e.as_ref().map(Vec::len)) {
            let table = format!("segment_embeddings_{dim}");
            for (segment_id, embedding) in &segment_ids {
                let Some(embedding) = embedding else { continue };
                let inserted = txn
                    .execute(
                        &format!(
                            "INSERT INTO {table} (segment_id, model_key, embedding, created_at) VALUES ($1, $2, $3, $4)
                             ON CONFLICT (segment_id, model_key) DO NOTHING"
                        ),
                        &[segment_id, &model_key, &Vector::from(embedding.clone()), &Utc::now()],
                    )
                    .await
                    .map_err(|e| StorageError::Transaction(e.to_string()))?;
                stats.embeddings_inserted += inserted;
            }
        }

        txn.commit().await.map_err(|e| StorageError::Transaction(e.to_string()))?;
        Ok(stats)
    }

    /// Row-count introspection across source/segment/embedding tables,
    /// supplementing the original `get_storage_status` helper.
    pub async fn storage_status(&self) -> Result<HashMap<String, i64>, StorageError> {
        let client = self.client().await?;
        let mut status = HashMap::new();
        for table in ["sources", "segments"] {
            let count: i64 = client
                .query_one(&format!("SELECT count(*) FROM {table}"), &[])
                .await
                .map_err(|e| StorageError::Postgres(e.to_string()))?
                .get(0);
            status.insert(table.to_string(), count);
        }
        Ok(status)
    }
}

fn label_text(label: &SpeakerLabel) -> String {
    label.as_str().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ivfflat_lists_floors_at_fifty() {
        assert_eq!(ivfflat_lists(100), 50);
        assert_eq!(ivfflat_lists(0), 50);
    }

    #[test]
    fn ivfflat_lists_caps_at_one_hundred() {
        assert_eq!(ivfflat_lists(1_000_000), 100);
    }

    #[test]
    fn ivfflat_lists_follows_sqrt_within_bounds() {
        // sqrt(10000) = 100, clamped to 100, then max(50, 100) = 100.
        assert_eq!(ivfflat_lists(10_000), 100);
        // sqrt(6400) = 80, within [10,100], max(50, 80) = 80.
        assert_eq!(ivfflat_lists(6_400), 80);
    }
}
