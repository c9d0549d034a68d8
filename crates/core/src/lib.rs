//! # CrabDesk Core
//!
//! Domain types, traits, and error definitions for the CrabDesk customer
//! support bot. This crate has **zero framework dependencies** — it defines
//! the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The collaborators with external contracts (the generative model, the
//! knowledge index) are defined as traits here. Implementations live in
//! their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod knowledge;
pub mod message;
pub mod provider;
pub mod session;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result};
pub use knowledge::{FaqDocument, FaqItem, FaqMatch, KnowledgeIndex};
pub use message::{ChatMessage, Role};
pub use provider::{CompletionProvider, CompletionRequest, EmbeddingRequest};
pub use session::Session;
