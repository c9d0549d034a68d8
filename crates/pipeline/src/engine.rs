//! Per-turn orchestration of the answer pipeline.

use crabdesk_config::RetrievalConfig;
use crabdesk_core::error::Error;
use crabdesk_core::knowledge::KnowledgeIndex;
use crabdesk_core::message::ChatMessage;
use crabdesk_core::provider::CompletionProvider;
use std::sync::Arc;
use tracing::info;

use crate::composer::{AnswerComposer, ResponseTier};
use crate::context::assemble;
use crate::retriever::Retriever;
use crate::suggester::ActionSuggester;
use crate::summarizer::ConversationSummarizer;

/// Summaries are only produced once a conversation has this many turns.
pub const SUMMARY_TRIGGER_TURNS: usize = 4;

/// The full per-turn result.
#[derive(Debug, Clone)]
pub struct EngineResponse {
    pub answer: String,
    pub escalated: bool,
    pub score: f32,
    pub summary: Option<String>,
    pub suggestions: Option<Vec<String>>,
    pub tier: ResponseTier,
}

/// Wires the retriever, composer, summarizer, and suggester together.
pub struct AnswerEngine {
    retriever: Retriever,
    composer: AnswerComposer,
    summarizer: ConversationSummarizer,
    suggester: ActionSuggester,
    score_threshold: f32,
    max_context_chars: usize,
}

impl AnswerEngine {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        index: Arc<dyn KnowledgeIndex>,
        chat_model: &str,
        embedding_model: &str,
        retrieval: &RetrievalConfig,
    ) -> Self {
        Self {
            retriever: Retriever::new(
                provider.clone(),
                index,
                embedding_model,
                retrieval.top_k,
            ),
            composer: AnswerComposer::new(
                provider.clone(),
                chat_model,
                retrieval.direct_answer_threshold,
                retrieval.history_turns,
            ),
            summarizer: ConversationSummarizer::new(provider.clone(), chat_model),
            suggester: ActionSuggester::new(provider, chat_model),
            score_threshold: retrieval.score_threshold,
            max_context_chars: retrieval.max_context_chars,
        }
    }

    /// Answer one user turn, with optional summary and suggestions.
    ///
    /// The summary is produced only for conversations with at least
    /// [`SUMMARY_TRIGGER_TURNS`] turns; suggestions are skipped for
    /// escalated answers (the handoff text needs no follow-ups).
    pub async fn respond(
        &self,
        query: &str,
        history: &[ChatMessage],
        include_suggestions: bool,
    ) -> Result<EngineResponse, Error> {
        let matches = self.retriever.retrieve(query).await?;
        let ctx = assemble(&matches, self.score_threshold, self.max_context_chars);
        let composed = self.composer.compose(query, history, &ctx, &matches).await?;

        let summary = if history.len() >= SUMMARY_TRIGGER_TURNS {
            Some(self.summarizer.summarize(history).await?)
        } else {
            None
        };

        let suggestions = if include_suggestions && !composed.escalated {
            Some(self.suggester.suggest(query, history, &ctx.context).await)
        } else {
            None
        };

        info!(
            tier = composed.tier.as_str(),
            score = composed.score,
            escalated = composed.escalated,
            "Pipeline turn complete"
        );

        Ok(EngineResponse {
            answer: composed.answer,
            escalated: composed.escalated,
            score: composed.score,
            summary,
            suggestions,
            tier: composed.tier,
        })
    }

    /// Summarize a stored conversation (standalone endpoint).
    pub async fn summarize(&self, history: &[ChatMessage]) -> Result<String, Error> {
        self.summarizer.summarize(history).await
    }

    /// Suggest follow-up actions for a stored conversation (standalone
    /// endpoint). Rebuilds the FAQ context for the query first.
    pub async fn suggest_actions(
        &self,
        query: &str,
        history: &[ChatMessage],
    ) -> Result<Vec<String>, Error> {
        let matches = self.retriever.retrieve(query).await?;
        let ctx = assemble(&matches, self.score_threshold, self.max_context_chars);
        Ok(self.suggester.suggest(query, history, &ctx.context).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarizer::EMPTY_SUMMARY;
    use crate::test_helpers::{SequentialMockProvider, StaticIndex};
    use crabdesk_core::knowledge::FaqMatch;
    use crabdesk_core::message::Role;

    fn m(score: f32, question: &str, answer: &str) -> FaqMatch {
        FaqMatch {
            score,
            question: question.into(),
            answer: answer.into(),
        }
    }

    fn engine(
        provider: Arc<SequentialMockProvider>,
        matches: Vec<FaqMatch>,
    ) -> AnswerEngine {
        AnswerEngine::new(
            provider,
            Arc::new(StaticIndex::new(matches)),
            "mock-model",
            "mock-embed",
            &RetrievalConfig::default(),
        )
    }

    fn turns(n: usize) -> Vec<ChatMessage> {
        (0..n)
            .map(|i| {
                let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
                ChatMessage::new("s", role, format!("turn-{i}"))
            })
            .collect()
    }

    #[tokio::test]
    async fn short_conversation_gets_no_summary() {
        let provider = Arc::new(SequentialMockProvider::texts(&["billing", "suggestion line?"]));
        let engine = engine(
            provider,
            vec![m(0.95, "Billing?", "Check the billing page.")],
        );

        let response = engine
            .respond("Billing?", &turns(2), true)
            .await
            .unwrap();

        assert_eq!(response.answer, "Check the billing page.");
        assert!(response.summary.is_none());
        assert!(response.suggestions.is_some());
        assert_eq!(response.tier, ResponseTier::Faq);
    }

    #[tokio::test]
    async fn long_conversation_gets_summary() {
        // Direct extraction needs no completion, then: summary, topic, suggestions.
        let provider = Arc::new(SequentialMockProvider::texts(&[
            "Customer asked about billing twice.",
            "billing",
            "How do I download my invoices?",
        ]));
        let engine = engine(
            provider,
            vec![m(0.95, "Billing?", "Check the billing page.")],
        );

        let response = engine.respond("Billing?", &turns(4), true).await.unwrap();
        assert_eq!(
            response.summary.as_deref(),
            Some("Customer asked about billing twice.")
        );
        assert_eq!(
            response.suggestions.as_deref(),
            Some(&["How do I download my invoices?".to_string()][..])
        );
    }

    #[tokio::test]
    async fn suggestions_skipped_when_not_requested() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let engine = engine(
            provider.clone(),
            vec![m(0.95, "Billing?", "Check the billing page.")],
        );

        let response = engine.respond("Billing?", &[], false).await.unwrap();
        assert!(response.suggestions.is_none());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn escalated_answer_suppresses_suggestions() {
        let provider = Arc::new(SequentialMockProvider::texts(&["ESCALATE_TO_HUMAN"]));
        let engine = engine(provider.clone(), vec![]);

        let response = engine.respond("Odd question", &[], true).await.unwrap();
        assert!(response.escalated);
        assert!(response.suggestions.is_none());
        assert_eq!(response.tier, ResponseTier::Escalated);
        // Only the general-response call was made.
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn standalone_summary_of_empty_history() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let engine = engine(provider, vec![]);
        assert_eq!(engine.summarize(&[]).await.unwrap(), EMPTY_SUMMARY);
    }

    #[tokio::test]
    async fn standalone_suggestions_rebuild_context() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            "shipping",
            "When will my package arrive?",
        ]));
        let engine = engine(
            provider.clone(),
            vec![m(0.9, "Shipping?", "3-5 business days.")],
        );

        let actions = engine
            .suggest_actions("Shipping?", &turns(2))
            .await
            .unwrap();
        assert_eq!(actions, vec!["When will my package arrive?".to_string()]);
        // The suggestion prompt carries the rebuilt FAQ context.
        assert!(provider.prompts()[1].contains("3-5 business days."));
    }
}
