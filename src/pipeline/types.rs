//! Outcome and error types for the pipeline orchestrator.

use crate::{
    answer::AnswerError, chunking::ChunkingError, embedding::EmbeddingClientError,
    pipeline::validation::ValidationError, retriever::RetrievalError,
    vector_store::VectorStoreError,
};
use serde::Serialize;
use thiserror::Error;

/// Errors emitted by the index and answer operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Request failed boundary validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Chunking step failed to segment the document.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed to produce vectors.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Vector store interaction failed.
    #[error("Vector store request failed: {0}")]
    VectorStore(#[from] VectorStoreError),
    /// Answer generation failed.
    #[error("Failed to generate answer: {0}")]
    Answer(#[from] AnswerError),
    /// Embedding produced a different number of vectors than chunks.
    #[error("Chunk/vector count mismatch: {chunks} chunks, {vectors} vectors")]
    ChunkVectorMismatch {
        /// Number of chunks sent for embedding.
        chunks: usize,
        /// Number of vectors returned.
        vectors: usize,
    },
}

impl PipelineError {
    /// Whether the caller caused the failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<RetrievalError> for PipelineError {
    fn from(error: RetrievalError) -> Self {
        match error {
            RetrievalError::Embedding(inner) => Self::Embedding(inner),
            RetrievalError::VectorStore(inner) => Self::VectorStore(inner),
        }
    }
}

/// Result of indexing one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexOutcome {
    /// Human-readable summary.
    pub message: String,
    /// Chunks produced from the document.
    pub chunk_count: usize,
    /// Records written to the store.
    pub record_count: usize,
    /// Wall-clock duration in milliseconds.
    pub duration: u64,
}

/// Result of answering one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    /// Generated answer, or the canned reply when nothing relevant was found.
    pub answer: String,
    /// Context chunks passed to the model; zero for the canned reply.
    pub chunks_retrieved: usize,
    /// Wall-clock duration in milliseconds.
    pub duration: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_validation_is_a_client_error() {
        let validation = PipelineError::from(ValidationError::Missing { field: "question" });
        assert!(validation.is_client_error());
        assert!(!PipelineError::from(ChunkingError::EmptyInput).is_client_error());
        assert!(!PipelineError::ChunkVectorMismatch { chunks: 2, vectors: 1 }.is_client_error());
    }

    #[test]
    fn outcomes_serialize_in_camel_case() {
        let outcome = AnswerOutcome {
            answer: "a".into(),
            chunks_retrieved: 0,
            duration: 12,
        };
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({ "answer": "a", "chunksRetrieved": 0, "duration": 12 })
        );
    }
}
