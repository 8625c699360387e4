//! Process-local vector store using cosine similarity.

use super::{Record, SearchMatch, VectorStore, VectorStoreError, check_dimensions};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// An in-memory vector store for development and tests.
///
/// Records keep insertion order, so equal scores are returned oldest first.
#[derive(Debug)]
pub struct InMemoryVectorStore {
    dimension: usize,
    score_threshold: Option<f32>,
    state: RwLock<Records>,
}

/// Records in insertion order plus an id to position index.
#[derive(Debug, Default)]
struct Records {
    ordered: Vec<Record>,
    positions: HashMap<String, usize>,
}

impl Records {
    fn insert(&mut self, record: Record) {
        match self.positions.get(&record.id) {
            Some(&position) => self.ordered[position] = record,
            None => {
                self.positions.insert(record.id.clone(), self.ordered.len());
                self.ordered.push(record);
            }
        }
    }
}

impl InMemoryVectorStore {
    /// Create an empty store for vectors of `dimension` components.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            score_threshold: None,
            state: RwLock::new(Records::default()),
        }
    }

    /// Drop matches scoring below `threshold`.
    pub fn with_score_threshold(mut self, threshold: Option<f32>) -> Self {
        self.score_threshold = threshold;
        self
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.state.read().await.ordered.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.ordered.is_empty()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, records: Vec<Record>) -> Result<usize, VectorStoreError> {
        check_dimensions(records.iter().map(|record| record.values.as_slice()), self.dimension)?;

        let count = records.len();
        let mut state = self.state.write().await;
        for record in records {
            state.insert(record);
        }
        tracing::debug!(records = count, total = state.ordered.len(), "Records stored in memory");
        Ok(count)
    }

    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchMatch>, VectorStoreError> {
        check_dimensions([vector], self.dimension)?;

        let state = self.state.read().await;
        let mut scored: Vec<(f32, &Record)> = state
            .ordered
            .iter()
            .map(|record| (cosine_similarity(&record.values, vector), record))
            .filter(|(score, _)| self.score_threshold.is_none_or(|threshold| *score >= threshold))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(score, record)| SearchMatch {
                id: record.id.clone(),
                score,
                metadata: record.metadata.to_map(),
            })
            .collect())
    }
}
