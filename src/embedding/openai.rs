use super::{EmbeddingClient, EmbeddingClientError, build_http_client};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Embedding client for the OpenAI-compatible `POST /v1/embeddings` endpoint.
pub struct OpenAiEmbeddingClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
    dimensions: Option<usize>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl OpenAiEmbeddingClient {
    /// Construct a client. `dimensions` is forwarded for models that support truncation.
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: String,
        dimensions: Option<usize>,
        timeout: Duration,
    ) -> Result<Self, EmbeddingClientError> {
        Ok(Self {
            http: build_http_client("docqa/embed", timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            dimensions: dimensions.filter(|_| model.starts_with("text-embedding-3")),
        })
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let response = self
            .http
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
                dimensions: self.dimensions,
            })
            .send()
            .await
            .map_err(|error| {
                tracing::error!(provider = "openai", error = %error, "Embedding request failed");
                EmbeddingClientError::GenerationFailed(format!("request failed: {error}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|error| error.error.message)
                .unwrap_or(body);
            tracing::error!(provider = "openai", %status, "Embedding provider returned an error");
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "OpenAI returned {status}: {detail}"
            )));
        }

        let body: EmbeddingResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::InvalidResponse(format!("failed to decode OpenAI response: {error}"))
        })?;

        let mut data = body.data;
        data.sort_by_key(|item| item.index.unwrap_or(usize::MAX));
        Ok(data.into_iter().map(|item| item.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    fn client_for(server: &MockServer, model: &str) -> OpenAiEmbeddingClient {
        OpenAiEmbeddingClient::new(
            &server.base_url(),
            model,
            "sk-test".into(),
            Some(3),
            Duration::from_secs(5),
        )
        .expect("client")
    }

    #[tokio::test]
    async fn orders_vectors_by_response_index() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/embeddings")
                    .header("authorization", "Bearer sk-test")
                    .json_body(json!({
                        "model": "text-embedding-3-small",
                        "input": ["first", "second"],
                        "dimensions": 3
                    }));
                then.status(200).json_body(json!({
                    "object": "list",
                    "data": [
                        { "object": "embedding", "index": 1, "embedding": [0.4, 0.5, 0.6] },
                        { "object": "embedding", "index": 0, "embedding": [0.1, 0.2, 0.3] }
                    ]
                }));
            })
            .await;

        let vectors = client_for(&server, "text-embedding-3-small")
            .generate_embeddings(&["first".to_string(), "second".to_string()])
            .await
            .expect("embeddings");

        mock.assert_async().await;
        assert_eq!(vectors, vec![vec![0.1, 0.2, 0.3], vec![0.4, 0.5, 0.6]]);
    }

    #[tokio::test]
    async fn extracts_provider_error_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/embeddings");
                then.status(401)
                    .json_body(json!({ "error": { "message": "Incorrect API key provided" } }));
            })
            .await;

        let error = client_for(&server, "text-embedding-ada-002")
            .generate_embeddings(&["first".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            EmbeddingClientError::GenerationFailed(ref message)
                if message.contains("401") && message.contains("Incorrect API key")
        ));
    }
}
