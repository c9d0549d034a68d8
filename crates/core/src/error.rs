//! Error types for the CrabDesk domain.
//!
//! Uses `thiserror` for ergonomic error definitions. The top-level [`Error`]
//! is a closed set of tagged kinds, one per failure domain; call sites and
//! the HTTP boundary match on kind, never on type identity.

use thiserror::Error;

/// The top-level error type for all CrabDesk operations.
///
/// One variant per failure domain, each carrying the structured detail
/// needed to reproduce the failure (operation name, relevant identifiers).
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A generative-model call failed or returned unusable output.
    /// Surfaced to clients as a service-unavailable condition.
    #[error("LLM service error during {operation}: {message}")]
    LlmService { operation: String, message: String },

    /// The embedding step or the similarity search failed.
    /// Surfaced to clients as a service-unavailable condition.
    #[error("Vector store error during {operation}: {message}")]
    VectorStore { operation: String, message: String },

    /// An operation was attempted on a missing or inactive session.
    /// Surfaced to clients as a correctable bad-request condition.
    #[error("Session error for '{session_id}': {message}")]
    Session {
        session_id: String,
        message: String,
    },

    /// The persistence layer itself failed (connection, transaction, query,
    /// or row decoding). A server fault, never a client-correctable one.
    #[error("Storage error during {operation}: {message}")]
    Storage { operation: String, message: String },

    /// Malformed client input (e.g. an empty ingestion batch).
    #[error("Validation error on '{field}': {message}")]
    Validation { field: String, message: String },

    /// Invalid or missing configuration. Fatal at startup.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl Error {
    /// Shorthand for an LLM-service failure.
    pub fn llm(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LlmService {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a vector-store failure.
    pub fn vector(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::VectorStore {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a session failure.
    pub fn session(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Session {
            session_id: session_id.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a persistence-layer failure.
    pub fn storage(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Transport-level failures from the generative-model backend.
///
/// The pipeline maps these into the [`Error`] kinds at its seams:
/// completion failures become `LlmService`, embedding failures become
/// `VectorStore` (embedding belongs to the retrieval failure domain).
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned no usable output: {0}")]
    EmptyResponse(String),
}
