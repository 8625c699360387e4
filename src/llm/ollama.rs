use super::{LanguageModel, LlmClientError, build_http_client};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Completion client for an Ollama runtime (`POST /api/generate`).
pub struct OllamaLlmClient {
    http: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

impl OllamaLlmClient {
    /// Construct a client for the runtime at `base_url`.
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, LlmClientError> {
        Ok(Self {
            http: build_http_client("docqa/answer", timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

#[async_trait]
impl LanguageModel for OllamaLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmClientError> {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                LlmClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(LlmClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            LlmClientError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(LlmClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn client_for(server: &MockServer) -> OllamaLlmClient {
        OllamaLlmClient::new(&server.base_url(), "llama3.1", Duration::from_secs(5)).expect("client")
    }

    #[tokio::test]
    async fn returns_response_text_unmodified() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .json_body(json!({ "model": "llama3.1", "prompt": "Question?", "stream": false }));
                then.status(200).json_body(json!({
                    "response": "  The answer [1].\n",
                    "done": true
                }));
            })
            .await;

        let answer = client_for(&server).complete("Question?").await.expect("answer");

        mock.assert_async().await;
        assert_eq!(answer, "  The answer [1].\n");
    }

    #[tokio::test]
    async fn surfaces_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("boom");
            })
            .await;

        let error = client_for(&server).complete("Question?").await.unwrap_err();
        assert!(matches!(error, LlmClientError::GenerationFailed(ref message) if message.contains("500")));
    }

    #[tokio::test]
    async fn rejects_incomplete_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).json_body(json!({ "response": "partial", "done": false }));
            })
            .await;

        let error = client_for(&server).complete("Question?").await.unwrap_err();
        assert!(matches!(error, LlmClientError::InvalidResponse(_)));
    }
}
