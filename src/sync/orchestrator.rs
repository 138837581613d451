//! Drains collected changes into the search provider and drives paginated reindex jobs.

use super::types::{
    BatchError, BatchReport, IncrementalReport, SyncError, completion_percent,
};
use crate::collector::{ChangeCollector, ChangeSet};
use crate::content::{ContentId, ContentItem, ContentQuery, ContentStore};
use crate::criteria::{CriteriaChain, CriteriaPolicy};
use crate::metrics::SyncMetrics;
use crate::provider::{
    IndexSettings, ProviderResponse, SearchProvider, SearchQuery, UpsertOptions,
};
use crate::settings::{IndexDefinition, IndexId};
use crate::transform::{Document, DocumentTransformer};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Explicitly constructed sync core owning one provider and a snapshot of index definitions.
///
/// The orchestrator keeps no state between calls: incremental cycles consume their collector,
/// and every batch page is self-contained given its offset.
pub struct SyncOrchestrator {
    provider: Arc<dyn SearchProvider>,
    content: Arc<dyn ContentStore>,
    indexes: Vec<IndexDefinition>,
    policy: CriteriaPolicy,
    criteria: CriteriaChain,
    transformer: DocumentTransformer,
    metrics: Arc<SyncMetrics>,
    upsert_options: UpsertOptions,
}

impl SyncOrchestrator {
    /// Build an orchestrator using the standard criteria chain for `policy`.
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        content: Arc<dyn ContentStore>,
        indexes: Vec<IndexDefinition>,
        policy: CriteriaPolicy,
        transformer: DocumentTransformer,
    ) -> Self {
        let criteria = CriteriaChain::standard(&policy);
        Self {
            provider,
            content,
            indexes,
            policy,
            criteria,
            transformer,
            metrics: Arc::new(SyncMetrics::new()),
            upsert_options: UpsertOptions::default(),
        }
    }

    /// Replace the criteria chain.
    pub fn with_criteria(mut self, criteria: CriteriaChain) -> Self {
        self.criteria = criteria;
        self
    }

    /// Share an existing metrics registry.
    pub fn with_metrics(mut self, metrics: Arc<SyncMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Options passed to every upsert.
    pub fn with_upsert_options(mut self, options: UpsertOptions) -> Self {
        self.upsert_options = options;
        self
    }

    /// Mutable access to the criteria chain for registering extra predicates.
    pub fn criteria_mut(&mut self) -> &mut CriteriaChain {
        &mut self.criteria
    }

    /// Index definitions in the current snapshot.
    pub fn indexes(&self) -> &[IndexDefinition] {
        &self.indexes
    }

    /// Look up a definition by id.
    pub fn index(&self, index_id: IndexId) -> Option<&IndexDefinition> {
        self.indexes.iter().find(|index| index.id == index_id)
    }

    /// Metrics registry updated by every cycle.
    pub fn metrics(&self) -> &Arc<SyncMetrics> {
        &self.metrics
    }

    /// Route a save into the collector.
    ///
    /// An item admitted by any index is queued for indexing. An update excluded everywhere is
    /// queued for deletion so it leaves the provider; a new item excluded everywhere is ignored.
    pub fn content_saved(
        &self,
        collector: &mut ChangeCollector,
        item: &ContentItem,
        is_update: bool,
    ) {
        let admitted = self
            .indexes
            .iter()
            .any(|index| self.criteria.should_index(item, index));

        if admitted {
            collector.mark_for_index(item.id);
        } else if is_update {
            tracing::debug!(
                content_id = item.id,
                status = %item.status,
                "Updated item no longer indexable; queued for delete"
            );
            collector.mark_for_delete(item.id);
        } else {
            tracing::debug!(content_id = item.id, "New item not indexable; ignored");
        }
    }

    /// Route a deletion into the collector.
    pub fn content_deleted(&self, collector: &mut ChangeCollector, id: ContentId) {
        collector.mark_for_delete(id);
    }

    /// Close a unit of work and apply its changes.
    pub async fn end_of_unit_of_work(
        &self,
        collector: ChangeCollector,
    ) -> Result<IncrementalReport, SyncError> {
        self.sync_changes(collector.drain()).await
    }

    /// Apply a drained change set to every index.
    ///
    /// Per index, every `to_index` id is deleted first so stale chunks vanish, then the items
    /// that pass criteria are upserted. `to_delete` ids are then removed from every index.
    pub async fn sync_changes(&self, changes: ChangeSet) -> Result<IncrementalReport, SyncError> {
        let mut report = IncrementalReport::default();
        if changes.is_empty() {
            return Ok(report);
        }

        let to_index: Vec<ContentId> = changes.to_index.iter().copied().collect();
        let to_delete: Vec<ContentId> = changes.to_delete.iter().copied().collect();
        let items = self.load_items(&to_index).await;
        let mut submitted = BTreeSet::new();

        for index in &self.indexes {
            if !to_index.is_empty() {
                report
                    .provider_response
                    .merge(self.provider.delete_by_content_ids(&index.name, &to_index).await);
            }

            let (documents, indexed_ids) = self.prepare(index, &items);
            let response = self.upsert(index, documents).await?;
            report.provider_response.merge(response);
            submitted.extend(indexed_ids.iter().copied());
            report.indexed.insert(index.name.clone(), indexed_ids);
        }

        if !to_delete.is_empty() {
            for index in &self.indexes {
                report
                    .provider_response
                    .merge(self.provider.delete_by_content_ids(&index.name, &to_delete).await);
            }
            self.metrics.record_delete(to_delete.len() as u64);
        }

        report.skipped = to_index
            .iter()
            .copied()
            .filter(|id| !submitted.contains(id))
            .collect();
        report.deleted = to_delete;

        tracing::info!(
            indexes = self.indexes.len(),
            indexed = submitted.len(),
            skipped = report.skipped.len(),
            deleted = report.deleted.len(),
            "Incremental sync complete"
        );
        Ok(report)
    }

    /// Run one page of a full reindex.
    ///
    /// Unknown ids and zero batch sizes fail before any provider call. Offset 0 clears the
    /// index. A provider failure aborts the page and reports the progress earlier pages made.
    pub async fn run_index_batch(
        &self,
        index_id: IndexId,
        batch_size: usize,
        offset: usize,
    ) -> Result<BatchReport, BatchError> {
        let index = self
            .index(index_id)
            .ok_or(BatchError::IndexNotFound(index_id))?;
        if batch_size == 0 {
            return Err(BatchError::InvalidBatchSize(batch_size));
        }

        let query = ContentQuery {
            content_types: self.policy.content_types_for(index),
            statuses: self.policy.allowed_statuses.clone(),
            limit: batch_size,
            offset,
        };
        let page = self
            .content
            .query_ids(&query)
            .await
            .map_err(|err| page_failed(offset, 0, err.into()))?;

        let mut provider_response = ProviderResponse::default();
        if offset == 0 {
            let cleared = self
                .provider
                .clear_index(&index.name)
                .await
                .map_err(|source| {
                    tracing::error!(index = %index.name, error = %source, "Failed to clear index");
                    page_failed(
                        offset,
                        page.total,
                        SyncError::Provider {
                            index: index.name.clone(),
                            source,
                        },
                    )
                })?;
            provider_response.merge(cleared);
        } else if !page.ids.is_empty() {
            provider_response.merge(self.provider.delete_by_content_ids(&index.name, &page.ids).await);
        }

        let items = self.load_items(&page.ids).await;
        let (documents, indexed_ids) = self.prepare(index, &items);
        let written = self
            .upsert(index, documents)
            .await
            .map_err(|err| page_failed(offset, page.total, err))?;
        provider_response.merge(written);

        let processed = page.ids.len();
        let report = BatchReport {
            indexed_ids,
            offset,
            processed,
            total: page.total,
            completion_percent: completion_percent(offset + processed, page.total),
            provider_response,
        };
        self.metrics.record_batch_page();

        tracing::info!(
            index = %index.name,
            offset,
            batch_size,
            processed,
            indexed = report.indexed_ids.len(),
            total = report.total,
            completion = report.completion_percent,
            "Batch page indexed"
        );
        Ok(report)
    }

    /// Push settings derived from one definition to the provider.
    pub async fn configure_index(&self, index_id: IndexId) -> Result<ProviderResponse, SyncError> {
        let index = self
            .index(index_id)
            .ok_or(SyncError::IndexNotFound(index_id))?;
        self.configure(index).await
    }

    /// Push settings for every definition.
    pub async fn configure_all(&self) -> Result<ProviderResponse, SyncError> {
        let mut response = ProviderResponse::default();
        for index in &self.indexes {
            response.merge(self.configure(index).await?);
        }
        Ok(response)
    }

    /// Query one index through the provider.
    pub async fn search(
        &self,
        index_id: IndexId,
        query: &SearchQuery,
    ) -> Result<Vec<Document>, SyncError> {
        let index = self
            .index(index_id)
            .ok_or(SyncError::IndexNotFound(index_id))?;
        self.provider
            .search(&index.name, query)
            .await
            .map_err(|source| SyncError::Provider {
                index: index.name.clone(),
                source,
            })
    }

    async fn configure(&self, index: &IndexDefinition) -> Result<ProviderResponse, SyncError> {
        let settings = IndexSettings::from_definition(index);
        self.provider
            .configure(&index.name, &settings)
            .await
            .map_err(|source| {
                tracing::error!(index = %index.name, error = %source, "Failed to configure index");
                SyncError::Provider {
                    index: index.name.clone(),
                    source,
                }
            })
    }

    async fn upsert(
        &self,
        index: &IndexDefinition,
        documents: Vec<Document>,
    ) -> Result<ProviderResponse, SyncError> {
        if documents.is_empty() {
            return Ok(ProviderResponse::default());
        }

        let count = documents.len();
        let response = self
            .provider
            .upsert(&index.name, documents, &self.upsert_options)
            .await
            .map_err(|source| {
                tracing::error!(
                    index = %index.name,
                    provider = self.provider.name(),
                    documents = count,
                    error = %source,
                    "Failed to upsert documents"
                );
                SyncError::Provider {
                    index: index.name.clone(),
                    source,
                }
            })?;
        self.metrics.record_upsert(count as u64);
        tracing::debug!(index = %index.name, documents = count, "Documents upserted");
        Ok(response)
    }

    /// Fetch items, skipping any that are missing or cannot be read.
    async fn load_items(&self, ids: &[ContentId]) -> Vec<ContentItem> {
        let mut items = Vec::with_capacity(ids.len());
        for &id in ids {
            match self.content.fetch(id).await {
                Ok(Some(item)) => items.push(item),
                Ok(None) => {
                    tracing::debug!(content_id = id, "Content missing; skipped");
                    self.metrics.record_skipped(1);
                }
                Err(error) => {
                    tracing::warn!(content_id = id, error = %error, "Content unreadable; skipped");
                    self.metrics.record_skipped(1);
                }
            }
        }
        items
    }

    /// Documents for items passing criteria, plus the ids that produced them.
    fn prepare(
        &self,
        index: &IndexDefinition,
        items: &[ContentItem],
    ) -> (Vec<Document>, Vec<ContentId>) {
        let mut documents = Vec::new();
        let mut ids = Vec::new();
        for item in items {
            if !self.criteria.should_index(item, index) {
                self.metrics.record_skipped(1);
                continue;
            }
            let produced = self.transformer.transform(item, index);
            if produced.is_empty() {
                self.metrics.record_skipped(1);
                continue;
            }
            ids.push(item.id);
            documents.extend(produced);
        }
        (documents, ids)
    }
}

fn page_failed(offset: usize, total: usize, source: SyncError) -> BatchError {
    BatchError::PageFailed {
        offset,
        total,
        completion_percent: if total == 0 {
            0.0
        } else {
            completion_percent(offset, total)
        },
        source,
    }
}
