use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing sync activity.
#[derive(Default)]
pub struct SyncMetrics {
    documents_upserted: AtomicU64,
    content_deleted: AtomicU64,
    items_skipped: AtomicU64,
    batch_pages: AtomicU64,
}

impl SyncMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record documents accepted by a provider upsert.
    pub fn record_upsert(&self, document_count: u64) {
        self.documents_upserted
            .fetch_add(document_count, Ordering::Relaxed);
    }

    /// Record content identifiers submitted for deletion.
    pub fn record_delete(&self, content_count: u64) {
        self.content_deleted
            .fetch_add(content_count, Ordering::Relaxed);
    }

    /// Record content items dropped by criteria or missing from the store.
    pub fn record_skipped(&self, item_count: u64) {
        self.items_skipped.fetch_add(item_count, Ordering::Relaxed);
    }

    /// Record a completed batch-job page.
    pub fn record_batch_page(&self) {
        self.batch_pages.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_upserted: self.documents_upserted.load(Ordering::Relaxed),
            content_deleted: self.content_deleted.load(Ordering::Relaxed),
            items_skipped: self.items_skipped.load(Ordering::Relaxed),
            batch_pages: self.batch_pages.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of sync counters used for reporting.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents written to the provider since startup (chunks count individually).
    pub documents_upserted: u64,
    /// Content identifiers submitted for deletion since startup.
    pub content_deleted: u64,
    /// Content items skipped because of criteria or missing content.
    pub items_skipped: u64,
    /// Batch-job pages completed since startup.
    pub batch_pages: u64,
}
