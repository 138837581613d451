//! Service facade shared by the HTTP server and the reindex CLI.

use super::orchestrator::SyncOrchestrator;
use super::types::{
    BatchError, BatchReport, ContentEvent, IncrementalReport, ServiceInitError, SyncError,
};
use crate::algolia::AlgoliaProvider;
use crate::collector::ChangeCollector;
use crate::config::{Config, SearchProviderKind};
use crate::content::InMemoryContentStore;
use crate::criteria::CriteriaPolicy;
use crate::metrics::MetricsSnapshot;
use crate::provider::{MemoryProvider, ProviderResponse, SearchProvider, SearchQuery};
use crate::settings::{IndexDefinition, IndexId, load_index_definitions};
use crate::transform::{Document, DocumentTransformer, TransformSettings};
use async_trait::async_trait;
use std::sync::Arc;

/// Operations exposed to outer surfaces (HTTP, CLI).
#[async_trait]
pub trait SyncApi: Send + Sync {
    /// Apply one unit of work worth of content events, then drain it.
    async fn apply_events(
        &self,
        events: Vec<ContentEvent>,
    ) -> Result<IncrementalReport, SyncError>;

    /// Run one batch-job page; `None` selects the configured batch size and offset 0.
    async fn run_index_batch(
        &self,
        index_id: IndexId,
        batch_size: Option<usize>,
        offset: Option<usize>,
    ) -> Result<BatchReport, BatchError>;

    /// Push provider settings derived from one index definition.
    async fn configure_index(&self, index_id: IndexId) -> Result<ProviderResponse, SyncError>;

    /// Query one index.
    async fn search(
        &self,
        index_id: IndexId,
        query: SearchQuery,
    ) -> Result<Vec<Document>, SyncError>;

    /// Index definitions currently loaded.
    fn indexes(&self) -> Vec<IndexDefinition>;

    /// Current sync counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Sync service backed by the in-process content store.
///
/// Events update the store before the orchestrator drains them, so the store always reflects
/// the CMS state the cycle indexes.
pub struct SyncService {
    orchestrator: SyncOrchestrator,
    store: Arc<InMemoryContentStore>,
    default_batch_size: usize,
}

impl SyncService {
    /// Wrap an orchestrator that reads from `store`.
    pub fn new(
        orchestrator: SyncOrchestrator,
        store: Arc<InMemoryContentStore>,
        default_batch_size: usize,
    ) -> Self {
        Self {
            orchestrator,
            store,
            default_batch_size: default_batch_size.max(1),
        }
    }

    /// Assemble the provider, content store, and index definitions described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, ServiceInitError> {
        let indexes = load_index_definitions(&config.index_definitions_path, &config.site_url)?;
        let store = match &config.content_dir {
            Some(dir) => InMemoryContentStore::load_dir(dir)?,
            None => InMemoryContentStore::new(),
        };
        let store = Arc::new(store);

        let provider: Arc<dyn SearchProvider> = match config.search_provider {
            SearchProviderKind::Algolia => Arc::new(AlgoliaProvider::from_config(config)?),
            SearchProviderKind::Memory => Arc::new(MemoryProvider::new()),
        };
        tracing::info!(
            provider = provider.name(),
            indexes = indexes.len(),
            content_items = store.len(),
            "Sync service initialized"
        );

        let transformer = DocumentTransformer::new(TransformSettings {
            site_url: config.site_url.clone(),
            chunk_word_threshold: config.chunk_word_threshold,
        });
        let orchestrator = SyncOrchestrator::new(
            provider,
            store.clone(),
            indexes,
            CriteriaPolicy::from_config(config),
            transformer,
        );
        Ok(Self::new(orchestrator, store, config.default_batch_size))
    }

    /// Underlying orchestrator.
    pub fn orchestrator(&self) -> &SyncOrchestrator {
        &self.orchestrator
    }

    /// Content store the service writes events into.
    pub fn store(&self) -> &Arc<InMemoryContentStore> {
        &self.store
    }
}

#[async_trait]
impl SyncApi for SyncService {
    async fn apply_events(
        &self,
        events: Vec<ContentEvent>,
    ) -> Result<IncrementalReport, SyncError> {
        let mut collector = ChangeCollector::new();
        for event in events {
            match event {
                ContentEvent::Saved { item, is_update } => {
                    self.orchestrator
                        .content_saved(&mut collector, &item, is_update);
                    self.store.put(item);
                }
                ContentEvent::Deleted { id } => {
                    self.store.remove(id);
                    self.orchestrator.content_deleted(&mut collector, id);
                }
            }
        }
        self.orchestrator.end_of_unit_of_work(collector).await
    }

    async fn run_index_batch(
        &self,
        index_id: IndexId,
        batch_size: Option<usize>,
        offset: Option<usize>,
    ) -> Result<BatchReport, BatchError> {
        self.orchestrator
            .run_index_batch(
                index_id,
                batch_size.unwrap_or(self.default_batch_size),
                offset.unwrap_or(0),
            )
            .await
    }

    async fn configure_index(&self, index_id: IndexId) -> Result<ProviderResponse, SyncError> {
        self.orchestrator.configure_index(index_id).await
    }

    async fn search(
        &self,
        index_id: IndexId,
        query: SearchQuery,
    ) -> Result<Vec<Document>, SyncError> {
        self.orchestrator.search(index_id, &query).await
    }

    fn indexes(&self) -> Vec<IndexDefinition> {
        self.orchestrator.indexes().to_vec()
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.orchestrator.metrics().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Author, ContentItem};
    use time::OffsetDateTime;

    fn service() -> (SyncService, Arc<MemoryProvider>) {
        let provider = Arc::new(MemoryProvider::new());
        let store = Arc::new(InMemoryContentStore::new());
        let orchestrator = SyncOrchestrator::new(
            provider.clone(),
            store.clone(),
            vec![IndexDefinition {
                id: 1,
                slug: "main".into(),
                name: "site_main".into(),
                content_types: vec!["post".into()],
                taxonomies: vec![],
                custom_fields: vec![],
                searchable_attributes: vec![],
                facet_attributes: vec![],
                distinct_attribute: None,
            }],
            CriteriaPolicy::default(),
            DocumentTransformer::new(TransformSettings::new("https://example.com")),
        );
        (SyncService::new(orchestrator, store, 100), provider)
    }

    fn post(id: u64, status: &str) -> ContentItem {
        ContentItem {
            id,
            content_type: "post".into(),
            status: status.into(),
            title: format!("Post {id}"),
            body: "Body text.".into(),
            excerpt: None,
            author: Author::default(),
            published_at: OffsetDateTime::UNIX_EPOCH,
            modified_at: OffsetDateTime::UNIX_EPOCH,
            taxonomies: Default::default(),
            thumbnail_url: None,
            custom_fields: Default::default(),
            permalink: None,
            password: None,
            omit_from_index: false,
        }
    }

    #[tokio::test]
    async fn apply_events_indexes_then_unpublish_removes() {
        let (service, provider) = service();

        service
            .apply_events(vec![ContentEvent::Saved {
                item: post(1, "publish"),
                is_update: false,
            }])
            .await
            .expect("first cycle");
        assert_eq!(provider.count_for("site_main", 1), 1);
        assert_eq!(service.store().len(), 1);

        let report = service
            .apply_events(vec![ContentEvent::Saved {
                item: post(1, "draft"),
                is_update: true,
            }])
            .await
            .expect("second cycle");
        assert_eq!(report.deleted, vec![1]);
        assert_eq!(provider.count_for("site_main", 1), 0);
    }

    #[tokio::test]
    async fn save_then_delete_in_one_cycle_only_deletes() {
        let (service, provider) = service();
        let report = service
            .apply_events(vec![
                ContentEvent::Saved {
                    item: post(42, "publish"),
                    is_update: false,
                },
                ContentEvent::Deleted { id: 42 },
            ])
            .await
            .expect("cycle");

        assert!(report.indexed["site_main"].is_empty());
        assert_eq!(report.deleted, vec![42]);
        assert_eq!(provider.len("site_main"), 0);
        assert!(service.store().is_empty());
    }

    #[tokio::test]
    async fn run_index_batch_applies_defaults() {
        let (service, _) = service();
        service.store().put(post(1, "publish"));
        let report = service
            .run_index_batch(1, None, None)
            .await
            .expect("page");
        assert_eq!(report.offset, 0);
        assert_eq!(report.indexed_ids, vec![1]);
        assert!(report.is_complete());
        assert_eq!(service.metrics_snapshot().batch_pages, 1);
    }
}
