//! Pipeline service composing chunking, embedding, storage, retrieval, and generation.

use crate::{
    answer::{AnswerError, AnswerGenerator},
    chunking::TextChunker,
    config::Config,
    embedding::{Embedder, get_embedding_client},
    llm::{LanguageModel, get_llm_client},
    metrics::{MetricsSnapshot, PipelineMetrics},
    pipeline::{
        types::{AnswerOutcome, IndexOutcome, PipelineError},
        validation::{AnswerQuestionRequest, IndexDocumentRequest},
    },
    retriever::Retriever,
    vector_store::{
        IdGenerator, Record, RecordMetadata, VectorStore, build_vector_store,
        current_timestamp_rfc3339, id_generator_for,
    },
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Reply returned when retrieval finds nothing to ground an answer on.
pub const NOT_FOUND_ANSWER: &str =
    "I couldn't find any relevant information in the indexed documents to answer your question.";

const INDEXED_MESSAGE: &str = "Document indexed successfully";

/// Coordinates the index and answer flows.
///
/// Holds only long-lived clients and immutable settings, so one instance is shared through an
/// `Arc` by the HTTP surface and the CLI. Steps within a request run strictly in sequence.
pub struct PipelineService {
    chunker: TextChunker,
    embedder: Embedder,
    store: Arc<dyn VectorStore>,
    retriever: Retriever,
    generator: AnswerGenerator,
    ids: Arc<dyn IdGenerator>,
    metrics: Arc<PipelineMetrics>,
}

/// Abstraction over the pipeline used by external surfaces.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Chunk, embed, and store a document.
    async fn index_document(
        &self,
        request: IndexDocumentRequest,
    ) -> Result<IndexOutcome, PipelineError>;

    /// Answer a question from indexed content.
    async fn answer_question(
        &self,
        request: AnswerQuestionRequest,
    ) -> Result<AnswerOutcome, PipelineError>;

    /// Retrieve the current metrics snapshot.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl PipelineService {
    /// Assemble a service from already-built components.
    pub fn new(
        chunker: TextChunker,
        embedder: Embedder,
        store: Arc<dyn VectorStore>,
        model: Arc<dyn LanguageModel>,
        ids: Arc<dyn IdGenerator>,
        top_k: usize,
    ) -> Self {
        let retriever = Retriever::new(embedder.clone(), store.clone(), top_k);
        Self {
            chunker,
            embedder,
            store,
            retriever,
            generator: AnswerGenerator::new(model),
            ids,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Build every component from configuration and prepare the index.
    pub async fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let chunker = TextChunker::new(config.chunk_size, config.chunk_overlap)?;
        let embedder = Embedder::new(get_embedding_client(config)?, config.embedding_dimension);
        let model = get_llm_client(config).map_err(AnswerError::from)?;
        tracing::debug!(index = %config.qdrant_index_name, "Preparing vector store");
        let store = build_vector_store(config).await?;
        tracing::info!(
            store = ?config.vector_store,
            chunk_size = config.chunk_size,
            chunk_overlap = config.chunk_overlap,
            top_k = config.retrieval_top_k,
            "Pipeline ready"
        );

        Ok(Self::new(
            chunker,
            embedder,
            store,
            model,
            id_generator_for(config.record_id_strategy),
            config.retrieval_top_k,
        ))
    }

    /// Chunk, embed, and store a document.
    pub async fn index_document(
        &self,
        request: IndexDocumentRequest,
    ) -> Result<IndexOutcome, PipelineError> {
        let started = Instant::now();
        let characters = request.document_text().chars().count();
        tracing::info!(characters, "Indexing document");

        match self.run_index(request.document_text()).await {
            Ok((chunk_count, record_count)) => {
                let duration = elapsed_ms(started);
                self.metrics.record_document(record_count as u64);
                tracing::info!(
                    chunks = chunk_count,
                    records = record_count,
                    elapsed_ms = duration,
                    "Document indexed"
                );
                Ok(IndexOutcome {
                    message: INDEXED_MESSAGE.to_string(),
                    chunk_count,
                    record_count,
                    duration,
                })
            }
            Err(error) => {
                tracing::error!(
                    error = %error,
                    elapsed_ms = elapsed_ms(started),
                    "Document indexing failed"
                );
                Err(error)
            }
        }
    }

    async fn run_index(&self, text: &str) -> Result<(usize, usize), PipelineError> {
        let chunks = self.chunker.split(text)?;
        let vectors = self.embedder.embed_many(&chunks).await?;
        if vectors.len() != chunks.len() {
            return Err(PipelineError::ChunkVectorMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }

        let timestamp = current_timestamp_rfc3339();
        let chunk_count = chunks.len();
        let records: Vec<Record> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(text, values)| Record {
                id: self.ids.next_id(&text),
                values,
                metadata: RecordMetadata {
                    text,
                    timestamp: timestamp.clone(),
                },
            })
            .collect();

        let record_count = self.store.upsert(records).await?;
        Ok((chunk_count, record_count))
    }

    /// Answer a question, replying with [`NOT_FOUND_ANSWER`] when nothing relevant is stored.
    pub async fn answer_question(
        &self,
        request: AnswerQuestionRequest,
    ) -> Result<AnswerOutcome, PipelineError> {
        let started = Instant::now();
        tracing::info!(characters = request.question().chars().count(), "Answering question");

        match self.run_answer(request.question()).await {
            Ok((answer, chunks_retrieved)) => {
                let duration = elapsed_ms(started);
                self.metrics.record_answer(chunks_retrieved > 0);
                tracing::info!(
                    chunks_retrieved,
                    elapsed_ms = duration,
                    "Question answered"
                );
                Ok(AnswerOutcome {
                    answer,
                    chunks_retrieved,
                    duration,
                })
            }
            Err(error) => {
                tracing::error!(
                    error = %error,
                    elapsed_ms = elapsed_ms(started),
                    "Question answering failed"
                );
                Err(error)
            }
        }
    }

    async fn run_answer(&self, question: &str) -> Result<(String, usize), PipelineError> {
        let context = self.retriever.retrieve(question).await?;
        if context.is_empty() {
            tracing::info!("No relevant chunks found");
            return Ok((NOT_FOUND_ANSWER.to_string(), 0));
        }

        let answer = self.generator.generate(question, &context).await?;
        Ok((answer, context.len()))
    }

    /// Return the current pipeline metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl PipelineApi for PipelineService {
    async fn index_document(
        &self,
        request: IndexDocumentRequest,
    ) -> Result<IndexOutcome, PipelineError> {
        PipelineService::index_document(self, request).await
    }

    async fn answer_question(
        &self,
        request: AnswerQuestionRequest,
    ) -> Result<AnswerOutcome, PipelineError> {
        PipelineService::answer_question(self, request).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        PipelineService::metrics_snapshot(self)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
