//! Qdrant vector store integration over the REST API.

pub mod client;
pub(crate) mod types;

pub use client::{IndexSettings, QdrantService};
