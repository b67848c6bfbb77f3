use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    rows_processed: AtomicU64,
    batches_committed: AtomicU64,
    tables_synced: AtomicU64,
    tables_failed: AtomicU64,
}

/// Counters shared between a run and the table syncs it drives.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub rows_processed: u64,
    pub batches_committed: u64,
    pub tables_synced: u64,
    pub tables_failed: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_batch(&self, rows: u64) {
        self.inner.rows_processed.fetch_add(rows, Ordering::Relaxed);
        self.inner.batches_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn table_synced(&self) {
        self.inner.tables_synced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn table_failed(&self) {
        self.inner.tables_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rows_processed: self.inner.rows_processed.load(Ordering::Relaxed),
            batches_committed: self.inner.batches_committed.load(Ordering::Relaxed),
            tables_synced: self.inner.tables_synced.load(Ordering::Relaxed),
            tables_failed: self.inner.tables_failed.load(Ordering::Relaxed),
        }
    }
}
