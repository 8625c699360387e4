//! Vector store abstraction, record types, and backends.
//!
//! The pipeline talks to a [`VectorStore`]; production deployments use [`QdrantService`] and
//! development or tests can run on [`InMemoryVectorStore`].

pub mod ids;
pub mod memory;
pub mod qdrant;

pub use ids::{ContentHashIds, IdGenerator, RandomIds, SequentialIds, id_generator_for};
pub use memory::InMemoryVectorStore;
pub use qdrant::{IndexSettings, QdrantService};

use crate::config::{Config, VectorStoreBackend};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;

/// Errors returned while interacting with a vector store.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid vector store URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The configured index does not exist.
    #[error("Index '{0}' not found")]
    IndexNotFound(String),
    /// The store responded with an unexpected status code.
    #[error("Unexpected vector store response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the store.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// A vector does not match the index dimensionality.
    #[error("Vector dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality declared by the index.
        expected: usize,
        /// Length of the offending vector.
        actual: usize,
    },
}

/// Metadata persisted alongside every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordMetadata {
    /// Chunk text.
    pub text: String,
    /// RFC 3339 timestamp of the indexing request.
    pub timestamp: String,
}

impl RecordMetadata {
    /// Metadata as a JSON object, the shape stores return in search matches.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("text".into(), Value::String(self.text.clone()));
        map.insert("timestamp".into(), Value::String(self.timestamp.clone()));
        map
    }
}

/// A persisted `(id, vector, metadata)` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Identifier, unique within one upsert call; reuse overwrites.
    pub id: String,
    /// Embedding vector.
    pub values: Vec<f32>,
    /// Stored metadata.
    pub metadata: RecordMetadata,
}

/// A similarity match returned by [`VectorStore::search`].
#[derive(Debug, Clone)]
pub struct SearchMatch {
    /// Identifier of the matched record.
    pub id: String,
    /// Similarity score; higher is more similar.
    pub score: f32,
    /// Metadata stored with the record.
    pub metadata: Map<String, Value>,
}

impl SearchMatch {
    /// The stored chunk text, when present and non-empty.
    pub fn text(&self) -> Option<&str> {
        self.metadata
            .get("text")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
    }
}

/// Persistence and similarity search over embedding records.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store `records`, returning how many were written.
    async fn upsert(&self, records: Vec<Record>) -> Result<usize, VectorStoreError>;

    /// Return up to `top_k` matches ordered by descending similarity.
    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchMatch>, VectorStoreError>;
}

/// Build the store selected by configuration, preparing the index when needed.
pub async fn build_vector_store(config: &Config) -> Result<Arc<dyn VectorStore>, VectorStoreError> {
    match config.vector_store {
        VectorStoreBackend::Qdrant => {
            let service = QdrantService::new(
                &config.qdrant_url,
                config.qdrant_api_key.clone(),
                IndexSettings::from_config(config),
                Duration::from_secs(config.http_timeout_secs),
            )?;
            service.ensure_index().await?;
            Ok(Arc::new(service))
        }
        VectorStoreBackend::Memory => {
            tracing::warn!("Using in-memory vector store; indexed data is lost on restart");
            Ok(Arc::new(
                InMemoryVectorStore::new(config.embedding_dimension)
                    .with_score_threshold(config.retrieval_score_threshold),
            ))
        }
    }
}

/// Current timestamp formatted for record metadata.
pub fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

pub(crate) fn check_dimensions<'a, I>(vectors: I, expected: usize) -> Result<(), VectorStoreError>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    match vectors.into_iter().find(|vector| vector.len() != expected) {
        Some(vector) => Err(VectorStoreError::DimensionMismatch {
            expected,
            actual: vector.len(),
        }),
        None => Ok(()),
    }
}
