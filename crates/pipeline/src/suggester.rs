//! Follow-up action suggestions.
//!
//! Best-effort by contract: this module never propagates an error. Topic
//! analysis failure degrades to a generic topic; suggestion failure
//! degrades to a fixed fallback list.

use crabdesk_core::message::ChatMessage;
use crabdesk_core::provider::{CompletionProvider, CompletionRequest};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::composer::tail;
use crate::prompts;

/// Topic used when topic analysis fails.
const FALLBACK_TOPIC: &str = "general support";

/// How many history turns feed the suggestion prompt.
const SUGGESTION_HISTORY_TURNS: usize = 5;

/// Maximum number of suggestions returned.
const MAX_SUGGESTIONS: usize = 5;

/// Openers that mark filler lines rather than real suggestions.
const FILLER_PREFIXES: [&str; 4] = ["here", "you can", "please", "thank"];

/// Generates contextual follow-up suggestions for a user question.
pub struct ActionSuggester {
    provider: Arc<dyn CompletionProvider>,
    chat_model: String,
}

impl ActionSuggester {
    pub fn new(provider: Arc<dyn CompletionProvider>, chat_model: impl Into<String>) -> Self {
        Self {
            provider,
            chat_model: chat_model.into(),
        }
    }

    /// Suggest up to five follow-up questions for the user's situation.
    pub async fn suggest(
        &self,
        query: &str,
        history: &[ChatMessage],
        faq_context: &str,
    ) -> Vec<String> {
        let conversation_text = tail(history, SUGGESTION_HISTORY_TURNS)
            .iter()
            .map(|m| format!("{}: {}", m.role.label(), m.content))
            .collect::<Vec<_>>()
            .join("\n");

        let main_topic = match self
            .provider
            .complete(CompletionRequest::new(
                &self.chat_model,
                prompts::topic_analysis(query),
            ))
            .await
        {
            Ok(topic) => topic.trim().to_lowercase(),
            Err(e) => {
                warn!(error = %e, "Topic analysis failed, using fallback topic");
                FALLBACK_TOPIC.to_string()
            }
        };

        debug!(topic = %main_topic, "Generating action suggestions");

        let prompt =
            prompts::action_suggestions(query, &main_topic, &conversation_text, faq_context);

        match self
            .provider
            .complete(CompletionRequest::new(&self.chat_model, prompt))
            .await
        {
            Ok(raw) => filter_suggestions(&raw),
            Err(e) => {
                warn!(error = %e, "Suggestion generation failed, using fallback list");
                fallback_suggestions()
            }
        }
    }
}

/// Keep lines that look like genuine suggestions: long enough, and not
/// starting with a filler opener.
fn filter_suggestions(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            let lower = line.to_lowercase();
            line.chars().count() > 10 && !FILLER_PREFIXES.iter().any(|p| lower.starts_with(p))
        })
        .map(str::to_string)
        .take(MAX_SUGGESTIONS)
        .collect()
}

fn fallback_suggestions() -> Vec<String> {
    vec![
        "Can you provide more details about your specific situation?".to_string(),
        "Would you like me to walk you through the steps?".to_string(),
        "Do you need help with anything else related to this?".to_string(),
        "Is there a specific part you're having trouble with?".to_string(),
    ]
}
