//! REST handlers and their request/response DTOs.
//!
//! Endpoints:
//!
//! - `POST /api/chat`            — one conversation turn through the pipeline
//! - `POST /api/ingest/faq`      — embed and index a batch of FAQ entries
//! - `POST /api/summarize`       — summary of a stored session
//! - `POST /api/suggest-actions` — follow-up suggestions for a stored session
//! - `GET  /health`              — liveness
//! - `GET  /api/metrics`         — metrics export
//! - `GET  /api/sessions/stats`  — session table statistics

use axum::extract::State;
use axum::response::Json;
use chrono::Utc;
use crabdesk_core::error::Error;
use crabdesk_core::knowledge::{FaqDocument, FaqItem};
use crabdesk_core::message::{ChatMessage, Role};
use crabdesk_core::provider::EmbeddingRequest;
use crabdesk_store::SessionStats;
use crabdesk_telemetry::{MetricsReport, RequestMetrics};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

use crate::SharedState;
use crate::error::ApiError;

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
    #[serde(default = "default_true")]
    pub include_suggestions: bool,
    #[serde(default)]
    pub include_summary: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub response: String,
    pub escalated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_actions: Option<Vec<String>>,
    pub response_type: String,
    pub confidence_score: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct IngestFaqRequest {
    pub items: Vec<FaqItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestFaqResponse {
    pub ingested: usize,
}

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub session_id: String,
    pub summary: String,
}

#[derive(Debug, Deserialize)]
pub struct ActionsRequest {
    pub session_id: String,
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionsResponse {
    pub session_id: String,
    pub actions: Vec<String>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

// ── Handlers ──────────────────────────────────────────────────────────────

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// One conversation turn: resolve the session, persist both sides of the
/// exchange, and run the full pipeline in between.
pub async fn chat(
    State(state): State<SharedState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let start = Instant::now();

    let session = state
        .sessions
        .resolve_or_create(req.session_id.as_deref())
        .await?;
    state
        .sessions
        .append_message(&session.id, Role::User, &req.message)
        .await?;

    let history = conversation_history(state.sessions.list_messages(&session.id).await?);

    let result = state
        .engine
        .respond(&req.message, &history, req.include_suggestions)
        .await?;

    state
        .sessions
        .append_message(&session.id, Role::Assistant, &result.answer)
        .await?;

    let response_time = start.elapsed().as_secs_f64();
    state.metrics.record(RequestMetrics {
        endpoint: "/api/chat".into(),
        method: "POST".into(),
        status_code: 200,
        response_time_secs: response_time,
        timestamp: Utc::now(),
        session_id: Some(session.id.clone()),
        confidence_score: Some(result.score),
        response_type: Some(result.tier.as_str().into()),
        escalated: result.escalated,
    });

    info!(
        session_id = %session.id,
        tier = result.tier.as_str(),
        response_time,
        "Chat turn served"
    );

    let escalation_reason = result.escalated.then(|| {
        format!(
            "Low similarity score: {:.2}. Escalating to human agent.",
            result.score
        )
    });

    Ok(Json(ChatResponse {
        session_id: session.id,
        response: result.answer,
        escalated: result.escalated,
        escalation_reason,
        conversation_summary: if req.include_summary {
            result.summary
        } else {
            None
        },
        next_actions: result.suggestions,
        response_type: result.tier.as_str().to_string(),
        confidence_score: Some(result.score),
    }))
}

/// Embed and index a batch of question/answer pairs.
///
/// Entries are keyed by the question, so re-submitting a question
/// overwrites its answer. The embedding input is the question and answer
/// joined by a newline.
pub async fn ingest_faq(
    State(state): State<SharedState>,
    Json(req): Json<IngestFaqRequest>,
) -> Result<Json<IngestFaqResponse>, ApiError> {
    if req.items.is_empty() {
        return Err(Error::Validation {
            field: "items".into(),
            message: "no FAQ items provided".into(),
        }
        .into());
    }

    let inputs: Vec<String> = req
        .items
        .iter()
        .map(|it| format!("{}\n{}", it.question, it.answer))
        .collect();

    let embeddings = state
        .provider
        .embed(EmbeddingRequest {
            model: state.config.embedding_model.clone(),
            inputs,
        })
        .await
        .map_err(|e| Error::vector("ingest", e.to_string()))?;

    if embeddings.len() != req.items.len() {
        return Err(Error::vector(
            "ingest",
            format!(
                "expected {} embeddings, provider returned {}",
                req.items.len(),
                embeddings.len()
            ),
        )
        .into());
    }

    let documents: Vec<FaqDocument> = req
        .items
        .into_iter()
        .zip(embeddings)
        .map(|(item, embedding)| FaqDocument {
            question: item.question,
            answer: item.answer,
            embedding,
        })
        .collect();

    let ingested = state.index.upsert(documents).await?;
    info!(ingested, "FAQ batch ingested");
    Ok(Json(IngestFaqResponse { ingested }))
}

/// Summarize a stored session's conversation.
pub async fn summarize(
    State(state): State<SharedState>,
    Json(req): Json<SummaryRequest>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let stored = state.sessions.list_messages(&req.session_id).await?;
    if stored.is_empty() {
        return Ok(Json(SummaryResponse {
            session_id: req.session_id,
            summary: "No conversation found for this session.".into(),
        }));
    }

    let history = conversation_history(stored);
    let summary = state.engine.summarize(&history).await?;

    Ok(Json(SummaryResponse {
        session_id: req.session_id,
        summary,
    }))
}

/// Suggest follow-up actions for a stored session. The anchor query is the
/// explicit `query` field when given, otherwise the latest user message.
pub async fn suggest_actions(
    State(state): State<SharedState>,
    Json(req): Json<ActionsRequest>,
) -> Result<Json<ActionsResponse>, ApiError> {
    let stored = state.sessions.list_messages(&req.session_id).await?;
    if stored.is_empty() {
        return Ok(Json(ActionsResponse {
            session_id: req.session_id,
            actions: vec!["Start a conversation to get personalized suggestions.".into()],
        }));
    }

    let history = conversation_history(stored);
    let query = req
        .query
        .filter(|q| !q.trim().is_empty())
        .or_else(|| {
            history
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .map(|m| m.content.clone())
        })
        .unwrap_or_else(|| "How can I help you today?".into());

    let actions = state.engine.suggest_actions(&query, &history).await?;

    Ok(Json(ActionsResponse {
        session_id: req.session_id,
        actions,
    }))
}

pub async fn metrics(State(state): State<SharedState>) -> Json<MetricsReport> {
    Json(state.metrics.export())
}

pub async fn session_stats(
    State(state): State<SharedState>,
) -> Result<Json<SessionStats>, ApiError> {
    Ok(Json(state.sessions.stats().await?))
}

/// Only user and assistant turns feed the model; system notes stay out.
fn conversation_history(stored: Vec<ChatMessage>) -> Vec<ChatMessage> {
    stored
        .into_iter()
        .filter(|m| matches!(m.role, Role::User | Role::Assistant))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GatewayState, SharedState, build_router};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Duration;
    use crabdesk_config::AppConfig;
    use crabdesk_core::error::ProviderError;
    use crabdesk_core::provider::{CompletionProvider, CompletionRequest};
    use crabdesk_store::{SessionStore, SqliteKnowledgeIndex};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    /// Scripted provider: completions pop from a queue, embeddings are a
    /// fixed unit vector so any query matches any ingested entry exactly.
    struct ScriptedProvider {
        completions: Mutex<VecDeque<String>>,
    }

    impl ScriptedProvider {
        fn new(completions: &[&str]) -> Self {
            Self {
                completions: Mutex::new(completions.iter().map(|s| s.to_string()).collect()),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<String, ProviderError> {
            self.completions
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ProviderError::EmptyResponse("script exhausted".into()))
        }

        async fn embed(
            &self,
            request: EmbeddingRequest,
        ) -> Result<Vec<Vec<f32>>, ProviderError> {
            Ok(vec![vec![1.0, 0.0, 0.0]; request.inputs.len()])
        }
    }

    async fn test_state(completions: &[&str]) -> SharedState {
        let config = AppConfig {
            db_path: "sqlite::memory:".into(),
            ..AppConfig::default()
        };
        let pool = crabdesk_store::connect(&config.db_path).await.unwrap();
        let index = Arc::new(SqliteKnowledgeIndex::new(pool.clone()).await.unwrap());
        let sessions = Arc::new(
            SessionStore::new(pool, Duration::hours(24)).await.unwrap(),
        );
        let provider = Arc::new(ScriptedProvider::new(completions));

        Arc::new(GatewayState::new(config, provider, index, sessions))
    }

    async fn post_json(
        state: SharedState,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let app = build_router(state);
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(test_state(&[]).await);
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ingest_empty_batch_is_unprocessable() {
        let state = test_state(&[]).await;
        let (status, body) =
            post_json(state, "/api/ingest/faq", serde_json::json!({"items": []})).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["kind"], "validation");
    }

    #[tokio::test]
    async fn ingest_then_chat_answers_by_direct_extraction() {
        let state = test_state(&[]).await;

        let (status, body) = post_json(
            state.clone(),
            "/api/ingest/faq",
            serde_json::json!({"items": [
                {"question": "How do I reset my password?",
                 "answer": "Use the reset link on the login page."}
            ]}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ingested"], 1);

        // Identical embeddings give score 1.0: direct extraction, no
        // completion calls needed.
        let (status, body) = post_json(
            state,
            "/api/chat",
            serde_json::json!({
                "message": "How do I reset my password?",
                "include_suggestions": false
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "Use the reset link on the login page.");
        assert_eq!(body["response_type"], "faq");
        assert_eq!(body["escalated"], false);
        assert!(body["session_id"].as_str().is_some_and(|s| !s.is_empty()));
    }

    #[tokio::test]
    async fn chat_without_knowledge_uses_general_tier() {
        let state = test_state(&["Our support team is available around the clock."]).await;

        let (status, body) = post_json(
            state,
            "/api/chat",
            serde_json::json!({
                "message": "When can I call support?",
                "include_suggestions": false
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response_type"], "general");
        assert_eq!(
            body["response"],
            "Our support team is available around the clock."
        );
        assert!(body.get("escalation_reason").is_none());
    }

    #[tokio::test]
    async fn escalated_chat_carries_reason() {
        let state = test_state(&["ESCALATE_TO_HUMAN"]).await;

        let (status, body) = post_json(
            state,
            "/api/chat",
            serde_json::json!({
                "message": "Check my internal account flags",
                "include_suggestions": false
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["escalated"], true);
        assert_eq!(body["response_type"], "escalated");
        assert_eq!(
            body["escalation_reason"],
            "Low similarity score: 0.00. Escalating to human agent."
        );
    }

    #[tokio::test]
    async fn chat_reuses_session_across_turns() {
        let state = test_state(&["First answer.", "Second answer."]).await;

        let (_, first) = post_json(
            state.clone(),
            "/api/chat",
            serde_json::json!({"message": "Hello?", "include_suggestions": false}),
        )
        .await;
        let session_id = first["session_id"].as_str().unwrap().to_string();

        let (status, second) = post_json(
            state.clone(),
            "/api/chat",
            serde_json::json!({
                "session_id": session_id,
                "message": "Another question?",
                "include_suggestions": false
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["session_id"].as_str().unwrap(), session_id);

        let stats = state.sessions.stats().await.unwrap();
        assert_eq!(stats.active_count, 1);
        assert_eq!(stats.total_messages, 4);
    }

    #[tokio::test]
    async fn chat_includes_summary_once_conversation_is_long_enough() {
        // Two turns build up four stored messages; the third turn's general
        // answer is followed by the summary call.
        let state = test_state(&[
            "Answer one.",
            "Answer two.",
            "Answer three.",
            "Customer asked about orders and delivery.",
        ])
        .await;

        let (_, first) = post_json(
            state.clone(),
            "/api/chat",
            serde_json::json!({
                "message": "Where is my order?",
                "include_suggestions": false,
                "include_summary": true
            }),
        )
        .await;
        let session_id = first["session_id"].as_str().unwrap().to_string();
        // Too short to summarize yet.
        assert!(first.get("conversation_summary").is_none());

        post_json(
            state.clone(),
            "/api/chat",
            serde_json::json!({
                "session_id": session_id,
                "message": "It was due yesterday.",
                "include_suggestions": false
            }),
        )
        .await;

        let (status, third) = post_json(
            state,
            "/api/chat",
            serde_json::json!({
                "session_id": session_id,
                "message": "Can you check again?",
                "include_suggestions": false,
                "include_summary": true
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(third["response"], "Answer three.");
        assert_eq!(
            third["conversation_summary"],
            "Customer asked about orders and delivery."
        );
    }

    #[tokio::test]
    async fn summarize_unknown_session_is_bad_request() {
        let state = test_state(&[]).await;
        let (status, body) = post_json(
            state,
            "/api/summarize",
            serde_json::json!({"session_id": "ghost"}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "session");
    }

    #[tokio::test]
    async fn suggest_actions_for_stored_conversation() {
        let state = test_state(&[
            "Shipping question answered.",
            "shipping",
            "When will my package arrive at my address?",
        ])
        .await;

        let (_, chat) = post_json(
            state.clone(),
            "/api/chat",
            serde_json::json!({"message": "Do you ship abroad?", "include_suggestions": false}),
        )
        .await;
        let session_id = chat["session_id"].as_str().unwrap().to_string();

        let (status, body) = post_json(
            state,
            "/api/suggest-actions",
            serde_json::json!({"session_id": session_id}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["actions"],
            serde_json::json!(["When will my package arrive at my address?"])
        );
    }

    #[tokio::test]
    async fn metrics_endpoint_reflects_chat_traffic() {
        let state = test_state(&["An answer."]).await;

        post_json(
            state.clone(),
            "/api/chat",
            serde_json::json!({"message": "Hi", "include_suggestions": false}),
        )
        .await;

        let app = build_router(state);
        let request = Request::builder()
            .uri("/api/metrics")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["system_metrics"]["total_requests"], 1);
        assert_eq!(json["active_sessions_count"], 1);
    }
}
