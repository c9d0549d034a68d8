//! Configuration loading, validation, and management for CrabDesk.
//!
//! Loads configuration from a TOML file (default `crabdesk.toml` in the
//! working directory) with environment variable overrides. Every field has
//! a default; validation runs at startup and is fatal on failure.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the generative/embedding backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Chat completion model
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Embedding model
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// SQLite database path (`sqlite::memory:` for ephemeral)
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Retrieval and answer-tier parameters
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Session lifecycle parameters
    #[serde(default)]
    pub session: SessionConfig,

    /// HTTP gateway parameters
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_chat_model() -> String {
    "gpt-4o-mini".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_db_path() -> String {
    "data/crabdesk.db".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .field("db_path", &self.db_path)
            .field("retrieval", &self.retrieval)
            .field("session", &self.session)
            .field("gateway", &self.gateway)
            .finish()
    }
}

/// Retrieval fan-out and scoring thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// How many matches to request from the knowledge index
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Below this top score, evidence is deemed insufficient
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,

    /// At or above this top score, answer verbatim without a model call
    #[serde(default = "default_direct_answer_threshold")]
    pub direct_answer_threshold: f32,

    /// Character budget for the assembled FAQ context
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    /// How many trailing history turns to include in grounded prompts
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
}

fn default_top_k() -> usize {
    3
}
fn default_score_threshold() -> f32 {
    0.75
}
fn default_direct_answer_threshold() -> f32 {
    0.90
}
fn default_max_context_chars() -> usize {
    1200
}
fn default_history_turns() -> usize {
    6
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            score_threshold: default_score_threshold(),
            direct_answer_threshold: default_direct_answer_threshold(),
            max_context_chars: default_max_context_chars(),
            history_turns: default_history_turns(),
        }
    }
}

/// Session sliding-window and cleanup parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sliding expiration window in hours
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,

    /// Interval between expiry sweeps, in seconds
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_window_hours() -> i64 {
    24
}
fn default_sweep_interval_secs() -> u64 {
    3600
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8080
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path with env overrides.
    ///
    /// Environment variables (highest priority):
    /// - `CRABDESK_API_KEY`, falling back to `OPENAI_API_KEY`
    /// - `CRABDESK_BASE_URL`
    /// - `CRABDESK_MODEL`
    /// - `CRABDESK_DB_PATH`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(Path::new("crabdesk.toml"))?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("CRABDESK_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }
        if let Ok(url) = std::env::var("CRABDESK_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(model) = std::env::var("CRABDESK_MODEL") {
            config.chat_model = model;
        }
        if let Ok(path) = std::env::var("CRABDESK_DB_PATH") {
            config.db_path = path;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration. Fatal at startup on failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.retrieval;
        if r.score_threshold <= 0.0 || r.score_threshold > 1.0 {
            return Err(ConfigError::ValidationError(
                "retrieval.score_threshold must be in (0, 1]".into(),
            ));
        }
        if r.direct_answer_threshold <= 0.0 || r.direct_answer_threshold > 1.0 {
            return Err(ConfigError::ValidationError(
                "retrieval.direct_answer_threshold must be in (0, 1]".into(),
            ));
        }
        if r.direct_answer_threshold < r.score_threshold {
            return Err(ConfigError::ValidationError(
                "retrieval.direct_answer_threshold must be >= retrieval.score_threshold".into(),
            ));
        }
        if r.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be at least 1".into(),
            ));
        }
        if r.max_context_chars == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.max_context_chars must be positive".into(),
            ));
        }
        if self.session.window_hours <= 0 {
            return Err(ConfigError::ValidationError(
                "session.window_hours must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            db_path: default_db_path(),
            retrieval: RetrievalConfig::default(),
            session: SessionConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for crabdesk_core::Error {
    fn from(err: ConfigError) -> Self {
        crabdesk_core::Error::Config {
            message: err.to_string(),
        }
    }
}
