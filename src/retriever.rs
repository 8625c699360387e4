//! Question-to-context retrieval.

use crate::embedding::{Embedder, EmbeddingClientError};
use crate::vector_store::{VectorStore, VectorStoreError};
use std::sync::Arc;
use thiserror::Error;

/// Number of matches requested when no override is configured.
pub const DEFAULT_TOP_K: usize = 3;

/// Errors propagated from retrieval dependencies.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Embedding the question failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// Searching the index failed.
    #[error(transparent)]
    VectorStore(#[from] VectorStoreError),
}

/// Turns a question into the texts of its most relevant stored chunks.
#[derive(Clone)]
pub struct Retriever {
    embedder: Embedder,
    store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl Retriever {
    /// Build a retriever requesting `top_k` matches per question.
    pub fn new(embedder: Embedder, store: Arc<dyn VectorStore>, top_k: usize) -> Self {
        Self {
            embedder,
            store,
            top_k: top_k.max(1),
        }
    }

    /// Relevant chunk texts in descending relevance; empty when nothing usable matched.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<String>, RetrievalError> {
        let vector = self.embedder.embed_one(question).await?;
        let matches = self.store.search(&vector, self.top_k).await?;
        let match_count = matches.len();

        let texts: Vec<String> = matches
            .iter()
            .filter_map(|hit| hit.text().map(str::to_string))
            .collect();

        tracing::debug!(
            top_k = self.top_k,
            matches = match_count,
            usable = texts.len(),
            "Retrieved context"
        );
        Ok(texts)
    }
}
