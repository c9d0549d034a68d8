//! Translation of domain errors into HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use crabdesk_core::error::Error;
use tracing::error;

/// Wrapper making the domain [`Error`] an Axum response.
///
/// Each error kind maps to one status code; the body carries the kind tag
/// and the human-readable message.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            Error::LlmService { .. } => (StatusCode::SERVICE_UNAVAILABLE, "llm_service"),
            Error::VectorStore { .. } => (StatusCode::SERVICE_UNAVAILABLE, "vector_store"),
            Error::Session { .. } => (StatusCode::BAD_REQUEST, "session"),
            Error::Storage { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),
            Error::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
            Error::Config { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "config"),
        };

        error!(kind, status = status.as_u16(), error = %self.0, "Request failed");

        let body = serde_json::json!({
            "error": {
                "kind": kind,
                "message": self.0.to_string(),
            }
        });

        (status, Json(body)).into_response()
    }
}
