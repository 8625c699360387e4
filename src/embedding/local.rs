use super::{EmbeddingClient, EmbeddingClientError};
use async_trait::async_trait;

/// Deterministic offline embedding client.
///
/// Folds the UTF-8 bytes of each text into a fixed number of slots and L2-normalizes the result.
/// Useful for development without a model server; similarity is lexical at best.
pub struct LocalEmbeddingClient {
    dimension: usize,
}

impl LocalEmbeddingClient {
    /// Construct a client producing vectors of `dimension` components.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(text: &str, dimension: usize) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; dimension];

        for (idx, byte) in text.bytes().enumerate() {
            let position = idx % dimension;
            embedding[position] += f32::from(byte) / 255.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingClient for LocalEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if self.dimension == 0 {
            return Err(EmbeddingClientError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }

        Ok(texts
            .iter()
            .map(|text| Self::encode(text, self.dimension))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn produces_normalized_vectors_of_configured_dimension() {
        let client = LocalEmbeddingClient::new(16);
        let vectors = client
            .generate_embeddings(&["hello world".to_string(), "other".to_string()])
            .await
            .expect("vectors");
        assert_eq!(vectors.len(), 2);
        for vector in &vectors {
            assert_eq!(vector.len(), 16);
            let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[tokio::test]
    async fn is_deterministic() {
        let client = LocalEmbeddingClient::new(8);
        let first = client.generate_embeddings(&["same".to_string()]).await.unwrap();
        let second = client.generate_embeddings(&["same".to_string()]).await.unwrap();
        assert_eq!(first, second);
    }
}
