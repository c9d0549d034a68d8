//! Conversation summarization.

use crabdesk_core::error::Error;
use crabdesk_core::message::ChatMessage;
use crabdesk_core::provider::{CompletionProvider, CompletionRequest};
use std::sync::Arc;
use tracing::debug;

use crate::prompts;

/// Returned without a model call when there is nothing to summarize.
pub const EMPTY_SUMMARY: &str = "No conversation to summarize.";

/// Summarizes a full conversation history.
pub struct ConversationSummarizer {
    provider: Arc<dyn CompletionProvider>,
    chat_model: String,
}

impl ConversationSummarizer {
    pub fn new(provider: Arc<dyn CompletionProvider>, chat_model: impl Into<String>) -> Self {
        Self {
            provider,
            chat_model: chat_model.into(),
        }
    }

    /// Summarize the whole (untruncated) history.
    ///
    /// Empty history short-circuits to [`EMPTY_SUMMARY`]. Model failure is
    /// an `LlmService` error; whether that is fatal is the caller's call.
    pub async fn summarize(&self, history: &[ChatMessage]) -> Result<String, Error> {
        if history.is_empty() {
            return Ok(EMPTY_SUMMARY.to_string());
        }

        let conversation_text = history
            .iter()
            .map(|m| format!("{}: {}", m.role.label(), m.content))
            .collect::<Vec<_>>()
            .join("\n");

        debug!(turns = history.len(), "Summarizing conversation");

        let prompt = prompts::conversation_summary(&conversation_text);
        self.provider
            .complete(CompletionRequest::new(&self.chat_model, prompt))
            .await
            .map_err(|e| Error::llm("conversation_summary", e.to_string()))
    }
}
