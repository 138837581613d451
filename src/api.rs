//! HTTP surface for the search sync core.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /content/events` – Apply a unit of work (saved/deleted content events) and drain it
//!   into every configured index. Returns the incremental report.
//! - `POST /indexes/:id/run-indexer` – Run one page of a full reindex. Query parameters
//!   `batch_size` (default from configuration) and `offset` (default `0`). Offset `0` clears the
//!   index first. Returns `{ indexedIDs, totalCount, completionPercent, providerResponse }`.
//! - `POST /indexes/:id/configure` – Push searchable/facet/distinct settings for one index.
//! - `GET /indexes` – List the loaded index definitions.
//! - `GET /indexes/:id/search` – Query an index (`query`, `type`, `taxonomy`, `page`,
//!   `hits_per_page`, `distinct`).
//! - `GET /metrics` – Observe sync counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Failures return `{ "error": "<message>" }` carrying the provider's own message.

use crate::metrics::MetricsSnapshot;
use crate::provider::{DEFAULT_HITS_PER_PAGE, ProviderResponse, SearchQuery};
use crate::settings::{IndexDefinition, IndexId};
use crate::sync::{BatchError, BatchReport, ContentEvent, IncrementalReport, SyncApi, SyncError};
use crate::transform::Document;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Build the HTTP router exposing the sync API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: SyncApi + 'static,
{
    Router::new()
        .route("/content/events", post(apply_events::<S>))
        .route("/indexes", get(list_indexes::<S>))
        .route("/indexes/:id/run-indexer", post(run_indexer::<S>))
        .route("/indexes/:id/configure", post(configure_index::<S>))
        .route("/indexes/:id/search", get(search_index::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Request body for `POST /content/events`.
#[derive(Deserialize)]
struct EventsRequest {
    /// Events raised by the CMS during one unit of work, in order.
    events: Vec<ContentEvent>,
}

/// Apply a unit of work and drain it.
async fn apply_events<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<EventsRequest>,
) -> Result<Json<IncrementalReport>, AppError>
where
    S: SyncApi,
{
    let event_count = request.events.len();
    let report = service.apply_events(request.events).await?;
    tracing::info!(
        events = event_count,
        deleted = report.deleted.len(),
        skipped = report.skipped.len(),
        "Content events applied"
    );
    Ok(Json(report))
}

/// Query parameters for `POST /indexes/:id/run-indexer`.
#[derive(Deserialize)]
struct RunIndexerParams {
    #[serde(default)]
    batch_size: Option<usize>,
    #[serde(default)]
    offset: Option<usize>,
}

/// Run one reindex page.
async fn run_indexer<S>(
    State(service): State<Arc<S>>,
    Path(index_id): Path<IndexId>,
    Query(params): Query<RunIndexerParams>,
) -> Result<Json<BatchReport>, AppError>
where
    S: SyncApi,
{
    let report = service
        .run_index_batch(index_id, params.batch_size, params.offset)
        .await?;
    Ok(Json(report))
}

/// Push provider settings for one index.
async fn configure_index<S>(
    State(service): State<Arc<S>>,
    Path(index_id): Path<IndexId>,
) -> Result<Json<ProviderResponse>, AppError>
where
    S: SyncApi,
{
    Ok(Json(service.configure_index(index_id).await?))
}

/// Response body for `GET /indexes`.
#[derive(Serialize)]
struct IndexesResponse {
    indexes: Vec<IndexDefinition>,
}

/// List loaded index definitions.
async fn list_indexes<S>(State(service): State<Arc<S>>) -> Json<IndexesResponse>
where
    S: SyncApi,
{
    Json(IndexesResponse {
        indexes: service.indexes(),
    })
}

/// Query parameters for `GET /indexes/:id/search`.
#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    query: String,
    /// Comma-separated content types.
    #[serde(default, rename = "type")]
    content_types: Option<String>,
    /// Comma-separated `taxonomy:term` pairs.
    #[serde(default)]
    taxonomy: Option<String>,
    #[serde(default)]
    page: Option<usize>,
    #[serde(default)]
    hits_per_page: Option<usize>,
    #[serde(default)]
    distinct: Option<bool>,
}

impl SearchParams {
    fn into_query(self) -> SearchQuery {
        let content_types = self
            .content_types
            .as_deref()
            .map(split_csv)
            .unwrap_or_default();

        let mut taxonomy_terms: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for pair in self.taxonomy.as_deref().map(split_csv).unwrap_or_default() {
            if let Some((slug, term)) = pair.split_once(':') {
                taxonomy_terms
                    .entry(slug.trim().to_string())
                    .or_default()
                    .push(term.trim().to_string());
            }
        }

        SearchQuery {
            text: self.query,
            content_types,
            taxonomy_terms,
            hits_per_page: self.hits_per_page.unwrap_or(DEFAULT_HITS_PER_PAGE).max(1),
            page: self.page.unwrap_or(0),
            distinct: self.distinct.unwrap_or(true),
        }
    }
}

/// Response body for `GET /indexes/:id/search`.
#[derive(Serialize)]
struct SearchResponse {
    hits: Vec<Document>,
}

/// Search one index.
async fn search_index<S>(
    State(service): State<Arc<S>>,
    Path(index_id): Path<IndexId>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError>
where
    S: SyncApi,
{
    let hits = service.search(index_id, params.into_query()).await?;
    Ok(Json(SearchResponse { hits }))
}

/// Return the sync counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: SyncApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "content_events",
                method: "POST",
                path: "/content/events",
                description: "Apply saved/deleted content events as one unit of work and sync them to every index.",
                request_example: Some(json!({
                    "events": [
                        { "event": "saved", "is_update": true, "item": {
                            "id": 7, "type": "post", "status": "publish", "title": "Hello",
                            "body": "<p>Body</p>",
                            "published_at": "2024-05-01T10:00:00Z",
                            "modified_at": "2024-05-01T10:00:00Z"
                        } },
                        { "event": "deleted", "id": 8 }
                    ]
                })),
            },
            CommandDescriptor {
                name: "run_indexer",
                method: "POST",
                path: "/indexes/{id}/run-indexer?batch_size=100&offset=0",
                description: "Run one page of a full reindex. Offset 0 clears the index. Repeat with the next offset until completionPercent reaches 100.",
                request_example: None,
            },
            CommandDescriptor {
                name: "configure_index",
                method: "POST",
                path: "/indexes/{id}/configure",
                description: "Push searchable, facet, and distinct settings derived from the index definition.",
                request_example: None,
            },
            CommandDescriptor {
                name: "list_indexes",
                method: "GET",
                path: "/indexes",
                description: "Return the loaded index definitions.",
                request_example: None,
            },
            CommandDescriptor {
                name: "search",
                method: "GET",
                path: "/indexes/{id}/search?query=text&type=post,page&taxonomy=category:News",
                description: "Query an index. Chunked records collapse per content unless distinct=false.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return sync counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

enum AppError {
    Sync(SyncError),
    Batch(BatchError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Sync(error) => {
                let status = match error {
                    SyncError::IndexNotFound(_) => StatusCode::NOT_FOUND,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, Json(json!({ "error": error.to_string() }))).into_response()
            }
            AppError::Batch(error) => {
                let (status, body) = match &error {
                    BatchError::IndexNotFound(_) => (
                        StatusCode::NOT_FOUND,
                        json!({ "error": error.to_string() }),
                    ),
                    BatchError::InvalidBatchSize(_) => (
                        StatusCode::BAD_REQUEST,
                        json!({ "error": error.to_string() }),
                    ),
                    BatchError::PageFailed {
                        offset,
                        total,
                        completion_percent,
                        ..
                    } => (
                        StatusCode::BAD_GATEWAY,
                        json!({
                            "error": error.to_string(),
                            "offset": offset,
                            "totalCount": total,
                            "completionPercent": completion_percent,
                        }),
                    ),
                };
                tracing::warn!(status = %status, error = %error, "Batch request failed");
                (status, Json(body)).into_response()
            }
        }
    }
}

impl From<SyncError> for AppError {
    fn from(inner: SyncError) -> Self {
        Self::Sync(inner)
    }
}

impl From<BatchError> for AppError {
    fn from(inner: BatchError) -> Self {
        Self::Batch(inner)
    }
}
