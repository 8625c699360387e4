use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing indexing and answering activity.
///
/// Counters are observational only; nothing in the pipeline branches on them.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_indexed: AtomicU64,
    chunks_indexed: AtomicU64,
    questions_answered: AtomicU64,
    questions_without_context: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an indexed document and the number of records stored for it.
    pub fn record_document(&self, record_count: u64) {
        self.documents_indexed.fetch_add(1, Ordering::Relaxed);
        self.chunks_indexed
            .fetch_add(record_count, Ordering::Relaxed);
    }

    /// Record an answered question; `with_context` is false for "not found" replies.
    pub fn record_answer(&self, with_context: bool) {
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
        if !with_context {
            self.questions_without_context
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_indexed: self.documents_indexed.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
            questions_without_context: self.questions_without_context.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Number of documents indexed since startup.
    pub documents_indexed: u64,
    /// Total records stored across all indexed documents.
    pub chunks_indexed: u64,
    /// Questions answered, including "not found" replies.
    pub questions_answered: u64,
    /// Questions answered without any retrieved context.
    pub questions_without_context: u64,
}
