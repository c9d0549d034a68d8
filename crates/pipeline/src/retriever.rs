//! Retrieval: embed the question, rank it against the knowledge index.

use crabdesk_core::error::Error;
use crabdesk_core::knowledge::{FaqMatch, KnowledgeIndex};
use crabdesk_core::provider::{CompletionProvider, EmbeddingRequest};
use std::sync::Arc;
use tracing::debug;

/// Embeds queries and runs similarity search.
pub struct Retriever {
    provider: Arc<dyn CompletionProvider>,
    index: Arc<dyn KnowledgeIndex>,
    embedding_model: String,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        index: Arc<dyn KnowledgeIndex>,
        embedding_model: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            provider,
            index,
            embedding_model: embedding_model.into(),
            top_k,
        }
    }

    /// Retrieve the best-matching FAQ entries for a query, best first.
    ///
    /// An empty knowledge base yields an empty vec. Embedding failures are
    /// part of the retrieval failure domain and surface as `VectorStore`.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<FaqMatch>, Error> {
        let request = EmbeddingRequest {
            model: self.embedding_model.clone(),
            inputs: vec![query.to_string()],
        };

        let embeddings = self
            .provider
            .embed(request)
            .await
            .map_err(|e| Error::vector("retrieve", format!("embedding failed for query '{query}': {e}")))?;

        let embedding = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| Error::vector("retrieve", "provider returned no embedding"))?;

        let matches = self.index.query(&embedding, self.top_k).await?;
        debug!(
            query_len = query.len(),
            matches = matches.len(),
            "Retrieved FAQ matches"
        );
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingProvider, SequentialMockProvider, StaticIndex};
    use crabdesk_core::knowledge::FaqMatch;

    fn m(score: f32) -> FaqMatch {
        FaqMatch {
            score,
            question: format!("Q{score}"),
            answer: "A".into(),
        }
    }

    #[tokio::test]
    async fn retrieve_returns_top_k_best_first() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let index = Arc::new(StaticIndex::new(vec![m(0.9), m(0.8), m(0.7)]));
        let retriever = Retriever::new(provider, index, "embed-model", 2);

        let matches = retriever.retrieve("anything").await.unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches[0].score >= matches[1].score);
    }

    #[tokio::test]
    async fn empty_index_yields_empty_vec() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let index = Arc::new(StaticIndex::new(vec![]));
        let retriever = Retriever::new(provider, index, "embed-model", 3);

        let matches = retriever.retrieve("anything").await.unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn embedding_failure_is_vector_store_error() {
        let provider = Arc::new(FailingProvider);
        let index = Arc::new(StaticIndex::new(vec![m(0.9)]));
        let retriever = Retriever::new(provider, index, "embed-model", 3);

        let result = retriever.retrieve("anything").await;
        assert!(matches!(result, Err(Error::VectorStore { .. })));
    }
}
