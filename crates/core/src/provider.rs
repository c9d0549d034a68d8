//! CompletionProvider trait — the abstraction over the generative backend.
//!
//! The pipeline sends a fully assembled prompt and waits for the complete
//! text (fire-and-wait, no streaming). The same backend serves embedding
//! requests for retrieval.

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single completion request: one prompt in, one text out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use (e.g. "gpt-4o-mini")
    pub model: String,

    /// The fully assembled prompt text
    pub prompt: String,

    /// Temperature (0.0 = deterministic)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.3
}

impl CompletionRequest {
    /// Build a request with the default temperature and no token cap.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

/// An embedding request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// The embedding model identifier
    pub model: String,

    /// The texts to embed
    pub inputs: Vec<String>,
}

/// The generative-model collaborator.
///
/// One backend at a time; there is no internal routing or fallback. Once a
/// call is issued it runs to completion or failure — callers impose any
/// timeout externally (the HTTP client's request timeout is the ceiling).
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// A human-readable name for this provider (e.g. "openai").
    fn name(&self) -> &str;

    /// Send a prompt and wait for the complete, trimmed response text.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<String, ProviderError>;

    /// Generate embeddings for the given texts, one vector per input.
    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> std::result::Result<Vec<Vec<f32>>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_request_defaults() {
        let req = CompletionRequest::new("gpt-4o-mini", "Hello");
        assert!((req.temperature - 0.3).abs() < f32::EPSILON);
        assert!(req.max_tokens.is_none());
    }

    #[test]
    fn embedding_request_shape() {
        let req = EmbeddingRequest {
            model: "text-embedding-3-small".into(),
            inputs: vec!["a".into(), "b".into()],
        };
        assert_eq!(req.inputs.len(), 2);
    }
}
