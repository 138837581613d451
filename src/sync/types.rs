//! Errors, reports, and inbound events for the sync orchestrator.

use crate::content::{ContentId, ContentItem, ContentStoreError};
use crate::provider::{ProviderError, ProviderResponse};
use crate::settings::{IndexId, SettingsError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised by an incremental cycle or a provider passthrough.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Provider rejected a write; the message is the provider's own.
    #[error("Provider write to index '{index}' failed: {source}")]
    Provider {
        /// Provider index name.
        index: String,
        /// Underlying provider failure.
        #[source]
        source: ProviderError,
    },
    /// Content store could not list content.
    #[error("Content store request failed: {0}")]
    Content(#[from] ContentStoreError),
    /// No index definition carries the requested id.
    #[error("Index definition {0} not found")]
    IndexNotFound(IndexId),
}

/// Errors returned by a batch-job page.
#[derive(Debug, Error)]
pub enum BatchError {
    /// No index definition carries the requested id. Raised before any provider call.
    #[error("Index definition {0} not found")]
    IndexNotFound(IndexId),
    /// Batch size must be at least one.
    #[error("Batch size must be greater than zero (got {0})")]
    InvalidBatchSize(usize),
    /// The page aborted; earlier pages remain applied.
    #[error("Batch page at offset {offset} failed: {source}")]
    PageFailed {
        /// Offset of the failed page.
        offset: usize,
        /// Matching content count, zero when listing itself failed.
        total: usize,
        /// Progress achieved by the pages before this one.
        completion_percent: f64,
        /// Underlying failure.
        #[source]
        source: SyncError,
    },
}

/// Errors raised while assembling the sync service from configuration.
#[derive(Debug, Error)]
pub enum ServiceInitError {
    /// Index definitions could not be loaded.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// Content snapshots could not be loaded.
    #[error(transparent)]
    Content(#[from] ContentStoreError),
    /// Search provider could not be constructed.
    #[error("Failed to initialize search provider: {0}")]
    Provider(#[from] ProviderError),
}

/// Outcome of one incremental cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IncrementalReport {
    /// Content ids upserted, keyed by provider index name.
    pub indexed: BTreeMap<String, Vec<ContentId>>,
    /// Content ids removed from every index.
    pub deleted: Vec<ContentId>,
    /// Content ids requested for indexing that produced nothing anywhere.
    pub skipped: Vec<ContentId>,
    /// Provider acknowledgements for every write in the cycle.
    pub provider_response: ProviderResponse,
}

/// Outcome of one batch-job page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    /// Content ids that passed criteria and were submitted on this page.
    #[serde(rename = "indexedIDs")]
    pub indexed_ids: Vec<ContentId>,
    /// Offset this page started at.
    pub offset: usize,
    /// Content ids fetched for this page.
    pub processed: usize,
    /// Matching content count across all pages.
    #[serde(rename = "totalCount")]
    pub total: usize,
    /// `(offset + processed) / total * 100`, clamped to `[0, 100]`; 100 when nothing matches.
    #[serde(rename = "completionPercent")]
    pub completion_percent: f64,
    /// Provider acknowledgements for this page.
    #[serde(rename = "providerResponse")]
    pub provider_response: ProviderResponse,
}

impl BatchReport {
    /// Whether no further pages remain.
    pub fn is_complete(&self) -> bool {
        self.next_offset() >= self.total
    }

    /// Offset the caller should request next.
    pub fn next_offset(&self) -> usize {
        self.offset + self.processed
    }
}

/// Content change raised by the CMS layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ContentEvent {
    /// Item created or updated.
    Saved {
        /// Current state of the item.
        item: ContentItem,
        /// Whether the item existed before this save.
        #[serde(default)]
        is_update: bool,
    },
    /// Item removed from the CMS.
    Deleted {
        /// Identifier of the removed item.
        id: ContentId,
    },
}

/// Percentage of `total` covered by `done`, rounded to two decimals.
///
/// Only reaches 100 once `done >= total`; partial progress is capped at 99.99.
pub(crate) fn completion_percent(done: usize, total: usize) -> f64 {
    if done >= total {
        return 100.0;
    }
    let percent = done as f64 / total as f64 * 100.0;
    ((percent * 100.0).round() / 100.0).clamp(0.0, 99.99)
}
