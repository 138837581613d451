//! Content store boundary and the in-process store used by the binaries and tests.

use super::{ContentId, ContentItem};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use walkdir::WalkDir;

/// Errors raised while reading content from the CMS side.
#[derive(Debug, Error)]
pub enum ContentStoreError {
    /// Snapshot file or directory could not be read.
    #[error("Failed to read content from {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Snapshot file did not contain valid content JSON.
    #[error("Invalid content snapshot {path}: {source}")]
    Parse {
        /// Path that failed.
        path: PathBuf,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },
    /// Backing store refused or failed the request.
    #[error("Content store unavailable: {0}")]
    Unavailable(String),
}

/// Page request for indexable content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentQuery {
    /// Content types to include.
    pub content_types: Vec<String>,
    /// Statuses an item may carry to be returned.
    pub statuses: Vec<String>,
    /// Maximum number of identifiers returned.
    pub limit: usize,
    /// Number of matching identifiers to skip.
    pub offset: usize,
}

/// One page of identifiers plus the total number of matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentPage {
    /// Identifiers in ascending order.
    pub ids: Vec<ContentId>,
    /// Number of items matching the query across all pages.
    pub total: usize,
}

/// Read access to CMS content.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch a single item, returning `None` when it no longer exists.
    async fn fetch(&self, id: ContentId) -> Result<Option<ContentItem>, ContentStoreError>;

    /// List matching identifiers in a stable order so that offsets are resumable.
    async fn query_ids(&self, query: &ContentQuery) -> Result<ContentPage, ContentStoreError>;
}

/// Content store held in process memory, keyed and ordered by identifier.
#[derive(Default)]
pub struct InMemoryContentStore {
    items: RwLock<BTreeMap<ContentId, ContentItem>>,
}

impl InMemoryContentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given items.
    pub fn from_items(items: impl IntoIterator<Item = ContentItem>) -> Self {
        let store = Self::new();
        for item in items {
            store.put(item);
        }
        store
    }

    /// Load every `*.json` file below `dir`. Each file holds one item or an array of items.
    pub fn load_dir(dir: &Path) -> Result<Self, ContentStoreError> {
        let store = Self::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|err| ContentStoreError::Io {
                path: dir.to_path_buf(),
                source: err
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            })?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some("json")
            {
                continue;
            }

            let raw = std::fs::read_to_string(path).map_err(|source| ContentStoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let value: serde_json::Value =
                serde_json::from_str(&raw).map_err(|source| ContentStoreError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?;
            let items: Vec<ContentItem> = if value.is_array() {
                serde_json::from_value(value)
            } else {
                serde_json::from_value(value).map(|item| vec![item])
            }
            .map_err(|source| ContentStoreError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

            for item in items {
                store.put(item);
            }
        }

        tracing::info!(dir = %dir.display(), items = store.len(), "Loaded content snapshots");
        Ok(store)
    }

    /// Insert or replace an item.
    pub fn put(&self, item: ContentItem) {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(item.id, item);
    }

    /// Remove an item, returning it when present.
    pub fn remove(&self, id: ContentId) -> Option<ContentItem> {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn fetch(&self, id: ContentId) -> Result<Option<ContentItem>, ContentStoreError> {
        Ok(self
            .items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned())
    }

    async fn query_ids(&self, query: &ContentQuery) -> Result<ContentPage, ContentStoreError> {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        let matching: Vec<ContentId> = items
            .values()
            .filter(|item| query.statuses.iter().any(|status| status == &item.status))
            .filter(|item| {
                query
                    .content_types
                    .iter()
                    .any(|content_type| content_type == &item.content_type)
            })
            .map(|item| item.id)
            .collect();

        Ok(ContentPage {
            total: matching.len(),
            ids: matching
                .into_iter()
                .skip(query.offset)
                .take(query.limit)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Author;
    use time::OffsetDateTime;

    fn item(id: ContentId, content_type: &str, status: &str) -> ContentItem {
        ContentItem {
            id,
            content_type: content_type.into(),
            status: status.into(),
            title: format!("Item {id}"),
            body: String::new(),
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
    async fn query_ids_pages_matching_items_in_id_order() {
        let store = InMemoryContentStore::from_items(vec![
            item(5, "post", "publish"),
            item(1, "post", "publish"),
            item(3, "page", "publish"),
            item(2, "post", "draft"),
            item(4, "product", "publish"),
        ]);

        let query = ContentQuery {
            content_types: vec!["post".into(), "page".into()],
            statuses: vec!["publish".into()],
            limit: 2,
            offset: 0,
        };
        let first = store.query_ids(&query).await.expect("page");
        assert_eq!(first.ids, vec![1, 3]);
        assert_eq!(first.total, 3);

        let second = store
            .query_ids(&ContentQuery { offset: 2, ..query })
            .await
            .expect("page");
        assert_eq!(second.ids, vec![5]);
        assert_eq!(second.total, 3);

        let with_drafts = store
            .query_ids(&ContentQuery {
                content_types: vec!["post".into()],
                statuses: vec!["publish".into(), "draft".into()],
                limit: 10,
                offset: 0,
            })
            .await
            .expect("page");
        assert_eq!(with_drafts.ids, vec![1, 2, 5]);
    }

    #[tokio::test]
    async fn put_and_remove_update_fetch() {
        let store = InMemoryContentStore::new();
        store.put(item(9, "post", "publish"));
        assert!(store.fetch(9).await.expect("fetch").is_some());
        assert!(store.remove(9).is_some());
        assert!(store.fetch(9).await.expect("fetch").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn load_dir_reads_single_and_array_snapshots() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("one.json"),
            serde_json::to_string(&item(1, "post", "publish")).expect("json"),
        )
        .expect("write");
        std::fs::write(
            dir.path().join("many.json"),
            serde_json::to_string(&vec![item(2, "page", "publish"), item(3, "post", "draft")])
                .expect("json"),
        )
        .expect("write");
        std::fs::write(dir.path().join("notes.txt"), "ignored").expect("write");

        let store = InMemoryContentStore::load_dir(dir.path()).expect("load");
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn load_dir_reports_invalid_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("broken.json"), "{ not json").expect("write");
        let error = InMemoryContentStore::load_dir(dir.path())
            .err()
            .expect("parse error");
        assert!(matches!(error, ContentStoreError::Parse { .. }));
    }
}
