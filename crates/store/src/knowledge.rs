//! SQLite-backed FAQ knowledge index with cosine ranking.
//!
//! Entries are keyed by the SHA-256 of their question text, so re-ingesting
//! the same question overwrites the stored answer and embedding instead of
//! accumulating duplicates. Embeddings are stored as little-endian f32 blobs.
//!
//! Retrieval is a full scan with in-process cosine ranking. FAQ corpora are
//! small (hundreds of entries); a dedicated ANN index would be overkill.

use crate::vector::cosine_similarity;
use async_trait::async_trait;
use chrono::Utc;
use crabdesk_core::error::Error;
use crabdesk_core::knowledge::{FaqDocument, FaqMatch, KnowledgeIndex};
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

/// A production SQLite knowledge index.
pub struct SqliteKnowledgeIndex {
    pool: SqlitePool,
}

impl SqliteKnowledgeIndex {
    /// Create the index on an existing pool, running migrations.
    pub async fn new(pool: SqlitePool) -> Result<Self, Error> {
        let index = Self { pool };
        index.run_migrations().await?;
        Ok(index)
    }

    async fn run_migrations(&self) -> Result<(), Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS faq_entries (
                id          TEXT PRIMARY KEY,
                question    TEXT NOT NULL,
                answer      TEXT NOT NULL,
                embedding   BLOB NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::vector("migrate", format!("faq_entries table: {e}")))?;

        debug!("Knowledge index migrations complete");
        Ok(())
    }

    /// Deterministic storage key for a question: lowercase hex SHA-256.
    pub fn document_id(question: &str) -> String {
        let digest = Sha256::digest(question.as_bytes());
        let mut id = String::with_capacity(64);
        for byte in digest {
            id.push_str(&format!("{byte:02x}"));
        }
        id
    }

    /// Serialize an embedding vector to bytes.
    fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize an embedding blob back into f32s.
    fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
        blob.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }
}

#[async_trait]
impl KnowledgeIndex for SqliteKnowledgeIndex {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn upsert(&self, documents: Vec<FaqDocument>) -> Result<usize, Error> {
        let now = crate::fmt_ts(Utc::now());
        let count = documents.len();

        for doc in documents {
            let id = Self::document_id(&doc.question);
            let blob = Self::embedding_to_blob(&doc.embedding);

            sqlx::query(
                r#"
                INSERT INTO faq_entries (id, question, answer, embedding, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    answer = excluded.answer,
                    embedding = excluded.embedding,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&id)
            .bind(&doc.question)
            .bind(&doc.answer)
            .bind(&blob)
            .bind(&now)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::vector("upsert", format!("INSERT failed: {e}")))?;
        }

        info!(count, "Upserted FAQ entries");
        Ok(count)
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<FaqMatch>, Error> {
        let rows = sqlx::query("SELECT question, answer, embedding FROM faq_entries")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::vector("query", format!("SELECT failed: {e}")))?;

        let mut matches: Vec<FaqMatch> = Vec::with_capacity(rows.len());
        for row in &rows {
            let question: String = row
                .try_get("question")
                .map_err(|e| Error::vector("query", format!("question column: {e}")))?;
            let answer: String = row
                .try_get("answer")
                .map_err(|e| Error::vector("query", format!("answer column: {e}")))?;
            let blob: Vec<u8> = row
                .try_get("embedding")
                .map_err(|e| Error::vector("query", format!("embedding column: {e}")))?;

            let stored = Self::blob_to_embedding(&blob);
            matches.push(FaqMatch {
                score: cosine_similarity(&stored, embedding),
                question,
                answer,
            });
        }

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn count(&self) -> Result<usize, Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM faq_entries")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::vector("count", format!("COUNT failed: {e}")))?;
        Ok(row.0 as usize)
    }
}
