//! Provider implementations for CrabDesk.
//!
//! One generative backend at a time: the OpenAI-compatible HTTP provider
//! covers OpenAI, OpenRouter, Ollama, vLLM, and anything else exposing
//! `/v1/chat/completions` and `/v1/embeddings`.

mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use crabdesk_config::AppConfig;
use crabdesk_core::error::Error;

/// Build the configured provider.
///
/// Fails with a `Config` error when no API key is available.
pub fn from_config(config: &AppConfig) -> Result<OpenAiCompatProvider, Error> {
    let api_key = config.api_key.clone().ok_or_else(|| Error::Config {
        message: "no API key configured (set CRABDESK_API_KEY or OPENAI_API_KEY)".into(),
    })?;

    Ok(OpenAiCompatProvider::new(
        "openai",
        config.base_url.clone(),
        api_key,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_requires_api_key() {
        let config = AppConfig::default();
        let result = from_config(&config);
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn from_config_with_key() {
        let config = AppConfig {
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        let provider = from_config(&config).unwrap();
        assert_eq!(
            crabdesk_core::CompletionProvider::name(&provider),
            "openai"
        );
    }
}
