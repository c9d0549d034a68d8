//! The CrabDesk answer pipeline.
//!
//! Per turn: embed the question, rank it against the FAQ knowledge base,
//! assemble a character-budgeted context, and pick exactly one answer tier
//! (direct extraction, knowledge-grounded, general knowledge, or escalation).
//! Summaries and follow-up suggestions are optional enrichments layered on
//! top by the [`AnswerEngine`] orchestrator.

pub mod composer;
pub mod context;
pub mod engine;
pub mod prompts;
pub mod retriever;
pub mod suggester;
pub mod summarizer;

pub use composer::{AnswerComposer, ComposedAnswer, ResponseTier};
pub use context::{AssembledContext, assemble};
pub use engine::{AnswerEngine, EngineResponse};
pub use retriever::Retriever;
pub use suggester::ActionSuggester;
pub use summarizer::ConversationSummarizer;

#[cfg(test)]
pub(crate) mod test_helpers;
