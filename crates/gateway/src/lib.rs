//! HTTP API gateway for CrabDesk.
//!
//! Exposes the chat pipeline, FAQ ingestion, conversation utilities, and
//! operational endpoints over REST. Built on Axum.

pub mod api;
pub mod error;

use axum::{
    Router,
    routing::{get, post},
};
use chrono::Duration;
use crabdesk_config::AppConfig;
use crabdesk_core::error::Error;
use crabdesk_core::knowledge::KnowledgeIndex;
use crabdesk_core::provider::CompletionProvider;
use crabdesk_pipeline::AnswerEngine;
use crabdesk_store::{SessionStore, SqliteKnowledgeIndex};
use crabdesk_telemetry::MetricsCollector;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub provider: Arc<dyn CompletionProvider>,
    pub index: Arc<dyn KnowledgeIndex>,
    pub sessions: Arc<SessionStore>,
    pub engine: AnswerEngine,
    pub metrics: MetricsCollector,
    pub config: AppConfig,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    /// Wire up state from configuration and already-built collaborators.
    pub fn new(
        config: AppConfig,
        provider: Arc<dyn CompletionProvider>,
        index: Arc<dyn KnowledgeIndex>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        let engine = AnswerEngine::new(
            provider.clone(),
            index.clone(),
            &config.chat_model,
            &config.embedding_model,
            &config.retrieval,
        );

        Self {
            provider,
            index,
            sessions,
            engine,
            metrics: MetricsCollector::default(),
            config,
        }
    }
}

/// Build the full application state from configuration.
///
/// Opens the database, runs migrations, and constructs the provider from
/// the configured API key.
pub async fn build_state(config: AppConfig) -> Result<SharedState, Error> {
    let pool = crabdesk_store::connect(&config.db_path).await?;

    let index: Arc<dyn KnowledgeIndex> = Arc::new(SqliteKnowledgeIndex::new(pool.clone()).await?);
    let sessions = Arc::new(
        SessionStore::new(pool, Duration::hours(config.session.window_hours)).await?,
    );
    let provider: Arc<dyn CompletionProvider> =
        Arc::new(crabdesk_providers::from_config(&config)?);

    Ok(Arc::new(GatewayState::new(
        config, provider, index, sessions,
    )))
}

/// Build the Axum router with all gateway routes.
///
/// CORS is permissive, matching the service's public-widget deployment
/// model (the API carries no credentials).
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/api/chat", post(api::chat))
        .route("/api/ingest/faq", post(api::ingest_faq))
        .route("/api/summarize", post(api::summarize))
        .route("/api/suggest-actions", post(api::suggest_actions))
        .route("/api/metrics", get(api::metrics))
        .route("/api/sessions/stats", get(api::session_stats))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server and serve until shutdown.
pub async fn serve(state: SharedState) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!(
        "{}:{}",
        state.config.gateway.host, state.config.gateway.port
    );
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
