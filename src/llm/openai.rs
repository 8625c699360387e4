use super::{LanguageModel, LlmClientError, build_http_client};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Completion client for OpenAI-compatible `POST /v1/chat/completions` endpoints.
pub struct OpenAiChatClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl OpenAiChatClient {
    /// Construct a client for the API at `base_url`.
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, LlmClientError> {
        Ok(Self {
            http: build_http_client("docqa/answer", timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmClientError> {
        let payload = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                LlmClientError::ProviderUnavailable(format!("request failed: {error}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|error| error.error.message)
                .unwrap_or(body);
            return Err(LlmClientError::GenerationFailed(format!(
                "OpenAI returned {status}: {detail}"
            )));
        }

        let body: ChatResponse = response.json().await.map_err(|error| {
            LlmClientError::InvalidResponse(format!("failed to decode OpenAI response: {error}"))
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmClientError::InvalidResponse("response contained no completion".into()))
    }
}
