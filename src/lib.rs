#![deny(missing_docs)]

//! Core library for docqa: retrieval-augmented question answering over indexed documents.

/// Grounded prompt assembly and answer generation.
pub mod answer;
/// HTTP routing and REST handlers.
pub mod api;
/// Character-budget document chunking.
pub mod chunking;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Language-model client abstraction and adapters.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// Index and answer orchestration.
pub mod pipeline;
/// Question-to-context retrieval.
pub mod retriever;
/// Vector store abstraction and backends.
pub mod vector_store;
