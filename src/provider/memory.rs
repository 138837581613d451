//! Process-local provider used for development runs and tests.

use super::{IndexSettings, ProviderError, ProviderResponse, SearchProvider, SearchQuery, UpsertOptions};
use crate::content::ContentId;
use crate::transform::Document;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

#[derive(Default)]
struct IndexState {
    records: HashMap<String, Document>,
    settings: Option<IndexSettings>,
}

/// Search provider that keeps every index in process memory.
///
/// Writes apply synchronously, so a delete issued right after an upsert is observed at once.
#[derive(Default)]
pub struct MemoryProvider {
    indexes: Mutex<HashMap<String, IndexState>>,
    next_task: AtomicU64,
}

impl MemoryProvider {
    /// Create a provider with no indexes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of an index's records ordered by content id, then chunk position.
    pub fn documents(&self, index_name: &str) -> Vec<Document> {
        let indexes = self.indexes.lock().unwrap_or_else(PoisonError::into_inner);
        let mut documents: Vec<Document> = indexes
            .get(index_name)
            .map(|state| state.records.values().cloned().collect())
            .unwrap_or_default();
        documents.sort_by_key(sort_key);
        documents
    }

    /// Number of records in an index.
    pub fn len(&self, index_name: &str) -> usize {
        self.indexes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index_name)
            .map(|state| state.records.len())
            .unwrap_or(0)
    }

    /// Number of records carrying the given content id.
    pub fn count_for(&self, index_name: &str, content_id: ContentId) -> usize {
        self.indexes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index_name)
            .map(|state| {
                state
                    .records
                    .values()
                    .filter(|document| document.content_id == content_id)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Distinct content ids present in an index.
    pub fn content_ids(&self, index_name: &str) -> BTreeSet<ContentId> {
        self.indexes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index_name)
            .map(|state| {
                state
                    .records
                    .values()
                    .map(|document| document.content_id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Settings last pushed for an index.
    pub fn settings(&self, index_name: &str) -> Option<IndexSettings> {
        self.indexes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index_name)
            .and_then(|state| state.settings.clone())
    }

    fn task(&self) -> u64 {
        self.next_task.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl SearchProvider for MemoryProvider {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn upsert(
        &self,
        index_name: &str,
        documents: Vec<Document>,
        _options: &UpsertOptions,
    ) -> Result<ProviderResponse, ProviderError> {
        if documents.is_empty() {
            return Ok(ProviderResponse::default());
        }

        let mut indexes = self.indexes.lock().unwrap_or_else(PoisonError::into_inner);
        let state = indexes.entry(index_name.to_string()).or_default();
        let mut object_ids = Vec::with_capacity(documents.len());
        for mut document in documents {
            let object_id = document
                .object_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            document.object_id = Some(object_id.clone());
            state.records.insert(object_id.clone(), document);
            object_ids.push(object_id);
        }
        drop(indexes);

        Ok(ProviderResponse {
            task_ids: vec![self.task()],
            object_ids,
        })
    }

    async fn delete_by_content_ids(
        &self,
        index_name: &str,
        content_ids: &[ContentId],
    ) -> ProviderResponse {
        if content_ids.is_empty() {
            return ProviderResponse::default();
        }

        let targets: BTreeSet<ContentId> = content_ids.iter().copied().collect();
        let mut indexes = self.indexes.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(state) = indexes.get_mut(index_name) else {
            return ProviderResponse::default();
        };

        let doomed: Vec<String> = state
            .records
            .iter()
            .filter(|(_, document)| targets.contains(&document.content_id))
            .map(|(object_id, _)| object_id.clone())
            .collect();
        for object_id in &doomed {
            state.records.remove(object_id);
        }
        drop(indexes);

        if doomed.is_empty() {
            return ProviderResponse::default();
        }
        ProviderResponse {
            task_ids: vec![self.task()],
            object_ids: doomed,
        }
    }

    async fn search(
        &self,
        index_name: &str,
        query: &SearchQuery,
    ) -> Result<Vec<Document>, ProviderError> {
        let needle = query.text.trim().to_lowercase();
        let mut hits: Vec<Document> = self
            .documents(index_name)
            .into_iter()
            .filter(|document| matches_text(document, &needle))
            .filter(|document| {
                query.content_types.is_empty()
                    || document
                        .str_field("type")
                        .is_some_and(|kind| query.content_types.iter().any(|wanted| wanted == kind))
            })
            .filter(|document| {
                query
                    .taxonomy_terms
                    .iter()
                    .all(|(slug, terms)| has_any_term(document, slug, terms))
            })
            .collect();

        if query.distinct {
            let mut seen = BTreeSet::new();
            hits.retain(|document| seen.insert(document.content_id));
        }

        Ok(hits
            .into_iter()
            .skip(query.page.saturating_mul(query.hits_per_page))
            .take(query.hits_per_page)
            .collect())
    }

    async fn clear_index(&self, index_name: &str) -> Result<ProviderResponse, ProviderError> {
        self.indexes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(index_name.to_string())
            .or_default()
            .records
            .clear();
        Ok(ProviderResponse {
            task_ids: vec![self.task()],
            object_ids: Vec::new(),
        })
    }

    async fn configure(
        &self,
        index_name: &str,
        settings: &IndexSettings,
    ) -> Result<ProviderResponse, ProviderError> {
        self.indexes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(index_name.to_string())
            .or_default()
            .settings = Some(settings.clone());
        Ok(ProviderResponse {
            task_ids: vec![self.task()],
            object_ids: Vec::new(),
        })
    }
}

fn sort_key(document: &Document) -> (ContentId, u64) {
    (
        document.content_id,
        document
            .fields
            .get("chunkIndex")
            .and_then(Value::as_u64)
            .unwrap_or(0),
    )
}

fn matches_text(document: &Document, needle: &str) -> bool {
    needle.is_empty()
        || ["title", "content", "excerpt"].iter().any(|field| {
            document
                .str_field(field)
                .is_some_and(|value| value.to_lowercase().contains(needle))
        })
}

fn has_any_term(document: &Document, slug: &str, terms: &[String]) -> bool {
    terms.is_empty()
        || document
            .fields
            .get("taxonomy")
            .and_then(|taxonomy| taxonomy.get(slug))
            .and_then(Value::as_array)
            .is_some_and(|assigned| {
                assigned
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|name| terms.iter().any(|term| term == name))
            })
}
