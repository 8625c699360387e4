//! Embedding client abstraction, provider adapters, and the contract-enforcing [`Embedder`].

mod local;
mod ollama;
mod openai;

pub use local::LocalEmbeddingClient;
pub use ollama::OllamaEmbeddingClient;
pub use openai::OpenAiEmbeddingClient;

use crate::config::{Config, EmbeddingProvider};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by embedding providers or by the batch contract checks.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Provider responded with a body that could not be decoded.
    #[error("Malformed embedding response: {0}")]
    InvalidResponse(String),
    /// Caller supplied an empty batch or an empty text.
    #[error("Embedding input must contain at least one non-empty text")]
    EmptyInput,
    /// Provider returned a different number of vectors than texts.
    #[error("Embedding provider returned {actual} vectors for {expected} texts")]
    CountMismatch {
        /// Number of texts submitted.
        expected: usize,
        /// Number of vectors received.
        actual: usize,
    },
    /// Provider returned a zero-length vector.
    #[error("Embedding provider returned an empty vector")]
    EmptyVector,
    /// Vectors in one batch disagree on their length.
    #[error("Embedding provider returned vectors of differing lengths")]
    InconsistentDimensions,
    /// Returned embedding dimension does not match configuration.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension configured for the index.
        expected: usize,
        /// Dimension produced by the provider.
        actual: usize,
    },
}

/// Interface implemented by embedding backends.
///
/// Implementations perform the network call only; batch-shape validation lives in [`Embedder`].
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied text.
    async fn generate_embeddings(
        &self,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Contract-enforcing wrapper around an [`EmbeddingClient`].
#[derive(Clone)]
pub struct Embedder {
    client: Arc<dyn EmbeddingClient>,
    dimension: usize,
}

impl Embedder {
    /// Wrap `client`, expecting every vector to have `dimension` components.
    pub fn new(client: Arc<dyn EmbeddingClient>, dimension: usize) -> Self {
        Self { client, dimension }
    }

    /// Configured vector dimensionality.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed a batch of texts, one vector per text in input order.
    pub async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() || texts.iter().any(|text| text.is_empty()) {
            return Err(EmbeddingClientError::EmptyInput);
        }

        tracing::debug!(batch_size = texts.len(), "Generating embeddings");
        let vectors = self.client.generate_embeddings(texts).await?;
        validate_batch(&vectors, texts.len(), self.dimension)?;
        Ok(vectors)
    }

    /// Embed a single query string.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        let mut vectors = self.embed_many(&[text.to_string()]).await?;
        vectors.pop().ok_or(EmbeddingClientError::CountMismatch {
            expected: 1,
            actual: 0,
        })
    }
}

fn validate_batch(
    vectors: &[Vec<f32>],
    expected_count: usize,
    expected_dimension: usize,
) -> Result<(), EmbeddingClientError> {
    if vectors.len() != expected_count {
        return Err(EmbeddingClientError::CountMismatch {
            expected: expected_count,
            actual: vectors.len(),
        });
    }

    let Some(first) = vectors.first() else {
        return Err(EmbeddingClientError::CountMismatch {
            expected: expected_count,
            actual: 0,
        });
    };
    let length = first.len();
    if length == 0 || vectors.iter().any(Vec::is_empty) {
        return Err(EmbeddingClientError::EmptyVector);
    }
    if vectors.iter().any(|vector| vector.len() != length) {
        return Err(EmbeddingClientError::InconsistentDimensions);
    }
    if length != expected_dimension {
        return Err(EmbeddingClientError::DimensionMismatch {
            expected: expected_dimension,
            actual: length,
        });
    }
    Ok(())
}

/// Build the embedding client selected by configuration.
pub fn get_embedding_client(config: &Config) -> Result<Arc<dyn EmbeddingClient>, EmbeddingClientError> {
    let timeout = Duration::from_secs(config.http_timeout_secs);
    let client: Arc<dyn EmbeddingClient> = match config.embedding_provider {
        EmbeddingProvider::Ollama => Arc::new(OllamaEmbeddingClient::new(
            &config.embedding_url,
            &config.embedding_model,
            timeout,
        )?),
        EmbeddingProvider::OpenAI => Arc::new(OpenAiEmbeddingClient::new(
            &config.embedding_url,
            &config.embedding_model,
            config.embedding_api_key.clone().unwrap_or_default(),
            Some(config.embedding_dimension),
            timeout,
        )?),
        EmbeddingProvider::Local => Arc::new(LocalEmbeddingClient::new(config.embedding_dimension)),
    };
    tracing::info!(
        provider = ?config.embedding_provider,
        model = %config.embedding_model,
        dimension = config.embedding_dimension,
        "Embedding client initialized"
    );
    Ok(client)
}

pub(crate) fn build_http_client(
    user_agent: &str,
    timeout: Duration,
) -> Result<reqwest::Client, EmbeddingClientError> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .map_err(|error| EmbeddingClientError::GenerationFailed(format!("failed to build HTTP client: {error}")))
}
