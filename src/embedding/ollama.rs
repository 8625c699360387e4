use super::{EmbeddingClient, EmbeddingClientError, build_http_client};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Embedding client for an Ollama runtime (`POST /api/embed`).
pub struct OllamaEmbeddingClient {
    http: Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbeddingClient {
    /// Construct a client for the runtime at `base_url`.
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, EmbeddingClientError> {
        Ok(Self {
            http: build_http_client("docqa/embed", timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embed", self.base_url)
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let response = self
            .http
            .post(self.endpoint())
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|error| {
                tracing::error!(provider = "ollama", error = %error, "Embedding request failed");
                EmbeddingClientError::GenerationFailed(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "Ollama endpoint {} returned 404 (is model '{}' pulled?)",
                self.endpoint(),
                self.model
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(provider = "ollama", %status, "Embedding provider returned an error");
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: EmbedResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;
        Ok(body.embeddings)
    }
}
