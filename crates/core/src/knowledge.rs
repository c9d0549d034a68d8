//! Knowledge-base domain types and the similarity-search trait.
//!
//! The knowledge base holds curated question/answer pairs. Retrieval returns
//! [`FaqMatch`]es ranked by descending similarity score; the top score gates
//! the answer tier downstream.

use crate::error::Error;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A raw question/answer pair as submitted for ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
}

/// An embedded FAQ entry ready for indexing.
///
/// The index derives the storage key deterministically from the question
/// text, so re-ingesting an identical question overwrites the prior entry.
#[derive(Debug, Clone)]
pub struct FaqDocument {
    pub question: String,
    pub answer: String,
    pub embedding: Vec<f32>,
}

/// One retrieved knowledge item plus its similarity score.
///
/// Transient: produced per retrieval call, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqMatch {
    /// Similarity to the query, higher = more relevant
    pub score: f32,

    /// The stored question text
    pub question: String,

    /// The stored answer text
    pub answer: String,
}

/// The similarity-search collaborator.
///
/// Implementations: SQLite-backed cosine index (production), in-memory
/// fixtures (tests). Within one `query` call the returned matches are
/// ordered by non-increasing score.
#[async_trait]
pub trait KnowledgeIndex: Send + Sync {
    /// The index name (e.g. "sqlite").
    fn name(&self) -> &str;

    /// Insert or overwrite a batch of embedded entries.
    /// Returns the number of entries written.
    async fn upsert(&self, documents: Vec<FaqDocument>) -> Result<usize, Error>;

    /// Rank stored entries against a query embedding, best first.
    /// An empty index yields an empty vec, not an error.
    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<FaqMatch>, Error>;

    /// Total number of stored entries.
    async fn count(&self) -> Result<usize, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faq_item_deserializes_from_api_shape() {
        let json = r#"{"question": "How do I reset my password?", "answer": "Use the reset link."}"#;
        let item: FaqItem = serde_json::from_str(json).unwrap();
        assert!(item.question.contains("password"));
    }

    #[test]
    fn match_serializes_score() {
        let m = FaqMatch {
            score: 0.91,
            question: "Q".into(),
            answer: "A".into(),
        };
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("0.91"));
    }
}
