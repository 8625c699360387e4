//! Record identifier strategies.
//!
//! Qdrant accepts only UUIDs or unsigned integers as point ids, so every strategy renders a
//! hyphenated UUID string.

use crate::config::RecordIdStrategy;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Assigns identifiers to records at index time.
pub trait IdGenerator: Send + Sync {
    /// Identifier for the record holding `text`.
    fn next_id(&self, text: &str) -> String;
}

/// Random UUIDv4 per record; repeated indexing creates new records.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&self, _text: &str) -> String {
        Uuid::new_v4().to_string()
    }
}

/// UUID derived from the SHA-256 of the text; identical chunks share one record.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentHashIds;

impl IdGenerator for ContentHashIds {
    fn next_id(&self, text: &str) -> String {
        let digest = Sha256::digest(text.as_bytes());
        let mut bytes = [0_u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        Uuid::from_bytes(bytes).to_string()
    }
}

/// Monotonic counter rendered as a UUID; deterministic across runs.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    /// Start counting at `start`.
    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self, _text: &str) -> String {
        let value = self.next.fetch_add(1, Ordering::Relaxed);
        Uuid::from_u128(u128::from(value)).to_string()
    }
}

/// Generator matching the configured strategy.
pub fn id_generator_for(strategy: RecordIdStrategy) -> Arc<dyn IdGenerator> {
    match strategy {
        RecordIdStrategy::Random => Arc::new(RandomIds),
        RecordIdStrategy::ContentHash => Arc::new(ContentHashIds),
    }
}
