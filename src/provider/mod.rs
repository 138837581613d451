//! Search provider capability boundary.
//!
//! Every backend implements [`SearchProvider`]. Writes (`upsert`, `clear_index`, `configure`)
//! surface failures as [`ProviderError`] so the orchestrator can abort the cycle or page;
//! `delete_by_content_ids` is best-effort cleanup and never fails.

mod memory;

pub use memory::MemoryProvider;

use crate::content::ContentId;
use crate::settings::IndexDefinition;
use crate::transform::{CONTENT_ID_FIELD, Document};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Number of hits per page when a search query does not specify one.
pub const DEFAULT_HITS_PER_PAGE: usize = 20;

/// Errors returned by search providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Backend selected without the credentials it needs.
    #[error("Provider credentials are not configured")]
    MissingCredentials,
    /// Base URL failed to parse or normalize.
    #[error("Invalid provider URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider responded with a non-success status; `body` carries its message.
    #[error("Unexpected provider response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Raw response body.
        body: String,
    },
    /// Request or response payload was malformed.
    #[error("Malformed provider payload: {0}")]
    Decode(String),
    /// Provider task did not reach the published state in time.
    #[error("Provider task {task_id} still pending after {attempts} checks")]
    TaskTimeout {
        /// Task identifier returned by the write.
        task_id: u64,
        /// Number of status checks performed.
        attempts: u32,
    },
}

/// Options applied to an upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOptions {
    /// Block until the provider reports the write as applied.
    #[serde(default)]
    pub wait_for_task: bool,
}

/// Provider acknowledgement for a write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Asynchronous task identifiers issued by the provider.
    #[serde(default, rename = "taskIDs")]
    pub task_ids: Vec<u64>,
    /// Object identifiers touched by the write.
    #[serde(default, rename = "objectIDs")]
    pub object_ids: Vec<String>,
}

impl ProviderResponse {
    /// Fold another acknowledgement into this one.
    pub fn merge(&mut self, other: ProviderResponse) {
        self.task_ids.extend(other.task_ids);
        self.object_ids.extend(other.object_ids);
    }

    /// Whether the acknowledgement references no task or object.
    pub fn is_empty(&self) -> bool {
        self.task_ids.is_empty() && self.object_ids.is_empty()
    }
}

/// Query passed through to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Full-text query string.
    pub text: String,
    /// Restrict hits to these content types.
    pub content_types: Vec<String>,
    /// Restrict hits to these term names, keyed by taxonomy slug.
    pub taxonomy_terms: BTreeMap<String, Vec<String>>,
    /// Hits per page.
    pub hits_per_page: usize,
    /// Zero-based page number.
    pub page: usize,
    /// Collapse chunks of the same content into a single hit.
    pub distinct: bool,
}

impl SearchQuery {
    /// Query with default paging and distinct enabled.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            text: String::new(),
            content_types: Vec::new(),
            taxonomy_terms: BTreeMap::new(),
            hits_per_page: DEFAULT_HITS_PER_PAGE,
            page: 0,
            distinct: true,
        }
    }
}

/// Provider-side index configuration derived from an [`IndexDefinition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSettings {
    /// Attributes searched, in ranking order.
    pub searchable_attributes: Vec<String>,
    /// Attributes usable as facets or filters.
    pub attributes_for_faceting: Vec<String>,
    /// Attribute used to collapse records at query time.
    pub attribute_for_distinct: String,
    /// Whether distinct collapsing is on by default.
    pub distinct: bool,
}

impl IndexSettings {
    /// Derive settings, filling provider defaults where the definition leaves knobs empty.
    ///
    /// `contentID` is always filterable because delete-by-content-id browses on it.
    pub fn from_definition(definition: &IndexDefinition) -> Self {
        let searchable_attributes = if definition.searchable_attributes.is_empty() {
            ["title", "unordered(content)", "excerpt", "author"]
                .into_iter()
                .map(str::to_string)
                .chain(
                    definition
                        .taxonomies
                        .iter()
                        .map(|slug| format!("taxonomy.{slug}")),
                )
                .collect()
        } else {
            definition.searchable_attributes.clone()
        };

        let mut attributes_for_faceting = if definition.facet_attributes.is_empty() {
            std::iter::once("type".to_string())
                .chain(
                    definition
                        .taxonomies
                        .iter()
                        .map(|slug| format!("taxonomy.{slug}")),
                )
                .collect()
        } else {
            definition.facet_attributes.clone()
        };
        let content_filter = format!("filterOnly({CONTENT_ID_FIELD})");
        if !attributes_for_faceting.contains(&content_filter) {
            attributes_for_faceting.push(content_filter);
        }

        Self {
            searchable_attributes,
            attributes_for_faceting,
            attribute_for_distinct: definition
                .distinct_attribute
                .clone()
                .filter(|attribute| !attribute.trim().is_empty())
                .unwrap_or_else(|| CONTENT_ID_FIELD.to_string()),
            distinct: true,
        }
    }
}

/// Capability interface implemented once per search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Write documents. A document carrying an existing object id overwrites that record.
    async fn upsert(
        &self,
        index_name: &str,
        documents: Vec<Document>,
        options: &UpsertOptions,
    ) -> Result<ProviderResponse, ProviderError>;

    /// Remove every record whose `contentID` is listed, resolving chunked records first.
    ///
    /// Failures are logged and yield an empty response.
    async fn delete_by_content_ids(
        &self,
        index_name: &str,
        content_ids: &[ContentId],
    ) -> ProviderResponse;

    /// Run a query and return matching documents.
    async fn search(
        &self,
        index_name: &str,
        query: &SearchQuery,
    ) -> Result<Vec<Document>, ProviderError>;

    /// Remove every record from the index.
    async fn clear_index(&self, index_name: &str) -> Result<ProviderResponse, ProviderError>;

    /// Push searchable, facet, and distinct configuration.
    async fn configure(
        &self,
        index_name: &str,
        settings: &IndexSettings,
    ) -> Result<ProviderResponse, ProviderError>;
}
