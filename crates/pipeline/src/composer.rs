//! Tiered answer composition.
//!
//! Exactly one tier per request:
//! 1. Direct extraction — top match scores at or above the direct-answer
//!    threshold; the stored answer's first line is returned with no model
//!    call. A blank extraction falls through to tier 2.
//! 2. Knowledge-grounded — one model call over the assembled FAQ context.
//! 3. General knowledge — evidence was insufficient; one ungrounded call.
//! 4. Escalation — the general reply asked for a human; a fixed handoff
//!    message replaces it.

use crabdesk_core::error::Error;
use crabdesk_core::knowledge::FaqMatch;
use crabdesk_core::message::ChatMessage;
use crabdesk_core::provider::{CompletionProvider, CompletionRequest};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::context::AssembledContext;
use crate::prompts;

/// Fixed handoff text returned on escalation.
pub const ESCALATION_MESSAGE: &str = "I apologize, but I'm unable to provide a specific answer \
to your question. Let me connect you with a human agent who can better assist you.";

/// Which path produced the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseTier {
    /// Direct extraction or knowledge-grounded generation
    Faq,
    /// General-knowledge generation without FAQ evidence
    General,
    /// Handed off to a human agent
    Escalated,
}

impl ResponseTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseTier::Faq => "faq",
            ResponseTier::General => "general",
            ResponseTier::Escalated => "escalated",
        }
    }
}

/// One composed answer.
#[derive(Debug, Clone)]
pub struct ComposedAnswer {
    pub answer: String,
    pub escalated: bool,
    pub score: f32,
    pub tier: ResponseTier,
}

/// Runs the tier state machine for one question.
pub struct AnswerComposer {
    provider: Arc<dyn CompletionProvider>,
    chat_model: String,
    direct_answer_threshold: f32,
    history_turns: usize,
}

impl AnswerComposer {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        chat_model: impl Into<String>,
        direct_answer_threshold: f32,
        history_turns: usize,
    ) -> Self {
        Self {
            provider,
            chat_model: chat_model.into(),
            direct_answer_threshold,
            history_turns,
        }
    }

    /// Compose the answer for a question given its retrieval outcome.
    ///
    /// `matches` is the ranked retrieval result backing `ctx`; the top
    /// match's stored answer is the direct-extraction source.
    pub async fn compose(
        &self,
        query: &str,
        history: &[ChatMessage],
        ctx: &AssembledContext,
        matches: &[FaqMatch],
    ) -> Result<ComposedAnswer, Error> {
        let recent = tail(history, self.history_turns);
        let history_text = render_history(recent);

        if !ctx.insufficient_evidence {
            if ctx.best_score >= self.direct_answer_threshold {
                if let Some(extracted) = matches.first().and_then(first_nonblank_line) {
                    info!(score = ctx.best_score, "Answering by direct extraction");
                    return Ok(ComposedAnswer {
                        answer: extracted,
                        escalated: false,
                        score: ctx.best_score,
                        tier: ResponseTier::Faq,
                    });
                }
                debug!("Direct extraction found no usable line, falling back to grounded call");
            }

            let prompt = prompts::faq_response(&ctx.context, &history_text, query);
            let answer = self
                .provider
                .complete(CompletionRequest::new(&self.chat_model, prompt))
                .await
                .map_err(|e| Error::llm("faq_response", e.to_string()))?;

            return Ok(ComposedAnswer {
                answer,
                escalated: false,
                score: ctx.best_score,
                tier: ResponseTier::Faq,
            });
        }

        let prompt = prompts::general_response(&history_text, query);
        let reply = self
            .provider
            .complete(CompletionRequest::new(&self.chat_model, prompt))
            .await
            .map_err(|e| Error::llm("general_response", e.to_string()))?;

        // Covers both the explicit ESCALATE_TO_HUMAN marker and any other
        // mention of escalation in the reply.
        if reply.to_lowercase().contains("escalate") {
            info!(score = ctx.best_score, "Escalating to human agent");
            return Ok(ComposedAnswer {
                answer: ESCALATION_MESSAGE.to_string(),
                escalated: true,
                score: ctx.best_score,
                tier: ResponseTier::Escalated,
            });
        }

        Ok(ComposedAnswer {
            answer: reply,
            escalated: false,
            score: ctx.best_score,
            tier: ResponseTier::General,
        })
    }
}

/// The last `n` items of a slice.
pub(crate) fn tail<T>(items: &[T], n: usize) -> &[T] {
    let start = items.len().saturating_sub(n);
    &items[start..]
}

/// Format history as `role: content` lines for grounded/general prompts.
pub(crate) fn render_history(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn first_nonblank_line(m: &FaqMatch) -> Option<String> {
    m.answer
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}
