//! Shared mocks for pipeline tests.

use async_trait::async_trait;
use crabdesk_core::error::{Error, ProviderError};
use crabdesk_core::knowledge::{FaqDocument, FaqMatch, KnowledgeIndex};
use crabdesk_core::provider::{CompletionProvider, CompletionRequest, EmbeddingRequest};
use std::sync::Mutex;

/// A mock provider that returns a sequence of scripted completion results.
///
/// Each `complete` call consumes the next scripted result and records the
/// prompt it was given. Panics if more calls are made than results
/// provided. `embed` always succeeds with a fixed unit vector.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<String, ProviderError>>>,
    call_count: Mutex<usize>,
    prompts: Mutex<Vec<String>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: Mutex::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Script a sequence of successful text completions.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    /// How many completion calls have been made.
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// The prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let mut count = self.call_count.lock().unwrap();
        let responses = self.responses.lock().unwrap();

        if *count >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                *count,
                responses.len()
            );
        }

        self.prompts.lock().unwrap().push(request.prompt);
        let response = responses[*count].clone();
        *count += 1;
        response
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(vec![vec![1.0, 0.0, 0.0]; request.inputs.len()])
    }
}

/// A provider whose every call fails with a network error.
pub struct FailingProvider;

#[async_trait]
impl CompletionProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<String, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }

    async fn embed(&self, _request: EmbeddingRequest) -> Result<Vec<Vec<f32>>, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

/// An in-memory index that returns a fixed, pre-ranked match list.
pub struct StaticIndex {
    matches: Vec<FaqMatch>,
    docs: Mutex<Vec<FaqDocument>>,
}

impl StaticIndex {
    pub fn new(matches: Vec<FaqMatch>) -> Self {
        Self {
            matches,
            docs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl KnowledgeIndex for StaticIndex {
    fn name(&self) -> &str {
        "static"
    }

    async fn upsert(&self, documents: Vec<FaqDocument>) -> Result<usize, Error> {
        let count = documents.len();
        self.docs.lock().unwrap().extend(documents);
        Ok(count)
    }

    async fn query(&self, _embedding: &[f32], top_k: usize) -> Result<Vec<FaqMatch>, Error> {
        Ok(self.matches.iter().take(top_k).cloned().collect())
    }

    async fn count(&self) -> Result<usize, Error> {
        Ok(self.matches.len() + self.docs.lock().unwrap().len())
    }
}
