//! Language-model clients used to produce grounded answers.
//!
//! Both adapters issue a single non-streaming HTTP request per prompt and return the provider's
//! completion text exactly as received.

mod ollama;
mod openai;

pub use ollama::OllamaLlmClient;
pub use openai::OpenAiChatClient;

use crate::config::{Config, LlmProvider};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced while requesting a completion.
#[derive(Debug, Error)]
pub enum LlmClientError {
    /// Provider could not be reached or is misconfigured.
    #[error("Language model provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate completion: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by language-model providers.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `prompt` with the configured model.
    async fn complete(&self, prompt: &str) -> Result<String, LlmClientError>;
}

/// Build the language-model client selected by configuration.
pub fn get_llm_client(config: &Config) -> Result<Arc<dyn LanguageModel>, LlmClientError> {
    let timeout = Duration::from_secs(config.http_timeout_secs);
    let client: Arc<dyn LanguageModel> = match config.llm_provider {
        LlmProvider::Ollama => Arc::new(OllamaLlmClient::new(
            &config.llm_url,
            &config.llm_model,
            timeout,
        )?),
        LlmProvider::OpenAI => Arc::new(OpenAiChatClient::new(
            &config.llm_url,
            &config.llm_model,
            config.llm_api_key.clone().unwrap_or_default(),
            timeout,
        )?),
    };
    tracing::info!(
        provider = ?config.llm_provider,
        model = %config.llm_model,
        "Language model client initialized"
    );
    Ok(client)
}

pub(crate) fn build_http_client(
    user_agent: &str,
    timeout: Duration,
) -> Result<reqwest::Client, LlmClientError> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .map_err(|error| LlmClientError::ProviderUnavailable(format!("failed to build HTTP client: {error}")))
}
