//! HTTP client implementing [`SearchProvider`] against the Algolia REST API.

use super::browser::stream_object_ids;
use super::filters::{CONTENT_ID_FILTER_GROUP, build_search_filter, content_id_filters};
use super::types::{
    BatchAction, BatchOperation, BatchRequest, BatchResponse, QueryRequest, QueryResponse,
    TaskAck, TaskStatus,
};
use crate::config::{AlgoliaCredentials, Config};
use crate::content::ContentId;
use crate::provider::{
    IndexSettings, ProviderError, ProviderResponse, SearchProvider, SearchQuery, UpsertOptions,
};
use crate::transform::Document;
use async_trait::async_trait;
use futures_util::{pin_mut, stream::StreamExt};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;

/// Upper bound on operations sent in one batch call.
const MAX_BATCH_OPERATIONS: usize = 1000;

/// How long to wait for a write task to be published.
#[derive(Debug, Clone, Copy)]
pub struct TaskPolling {
    /// Maximum status checks.
    pub attempts: u32,
    /// Pause between checks.
    pub interval: Duration,
}

impl Default for TaskPolling {
    fn default() -> Self {
        Self {
            attempts: 50,
            interval: Duration::from_millis(200),
        }
    }
}

/// Algolia-backed search provider.
pub struct AlgoliaProvider {
    pub(crate) client: Client,
    pub(crate) base_url: Url,
    app_id: String,
    api_key: String,
    task_polling: TaskPolling,
}

impl AlgoliaProvider {
    /// Construct a provider from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        let credentials = config
            .algolia
            .as_ref()
            .ok_or(ProviderError::MissingCredentials)?;
        Self::new(credentials, Duration::from_secs(config.provider_timeout_secs))
    }

    /// Construct a provider with explicit credentials and a per-request timeout.
    pub fn new(credentials: &AlgoliaCredentials, timeout: Duration) -> Result<Self, ProviderError> {
        if credentials.app_id.trim().is_empty() || credentials.admin_api_key.is_empty() {
            return Err(ProviderError::MissingCredentials);
        }

        let client = Client::builder()
            .user_agent(concat!("searchsync/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        let raw_base = credentials
            .base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}.algolia.net", credentials.app_id));
        let base_url = normalize_base_url(&raw_base).map_err(ProviderError::InvalidUrl)?;

        tracing::debug!(
            url = %base_url,
            app_id = %credentials.app_id,
            timeout_secs = timeout.as_secs(),
            "Initialized Algolia HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            app_id: credentials.app_id.clone(),
            api_key: credentials.admin_api_key.clone(),
            task_polling: TaskPolling::default(),
        })
    }

    /// Override how long writes wait for task publication.
    pub fn with_task_polling(mut self, task_polling: TaskPolling) -> Self {
        self.task_polling = task_polling;
        self
    }

    /// Poll a task until Algolia reports it published.
    pub async fn wait_for_task(&self, index_name: &str, task_id: u64) -> Result<(), ProviderError> {
        let task = task_id.to_string();
        let url = self.endpoint(index_name, &["task", task.as_str()])?;
        let attempts = self.task_polling.attempts.max(1);

        for attempt in 1..=attempts {
            let response = self.request(Method::GET, url.clone()).send().await?;
            let TaskStatus { status } = read_json(response).await?;
            if status == "published" {
                tracing::debug!(index = index_name, task_id, attempt, "Algolia task published");
                return Ok(());
            }
            if attempt < attempts {
                tokio::time::sleep(self.task_polling.interval).await;
            }
        }

        Err(ProviderError::TaskTimeout { task_id, attempts })
    }

    pub(crate) fn endpoint(&self, index_name: &str, tail: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| ProviderError::InvalidUrl(self.base_url.to_string()))?;
            segments
                .pop_if_empty()
                .extend(["1", "indexes", index_name])
                .extend(tail);
        }
        Ok(url)
    }

    pub(crate) fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("X-Algolia-Application-Id", &self.app_id)
            .header("X-Algolia-API-Key", &self.api_key)
    }

    async fn send_batch(
        &self,
        index_name: &str,
        operations: &[BatchOperation],
    ) -> Result<BatchResponse, ProviderError> {
        let response = self
            .request(Method::POST, self.endpoint(index_name, &["batch"])?)
            .json(&BatchRequest {
                requests: operations,
            })
            .send()
            .await?;
        read_json(response).await
    }

    async fn resolve_object_ids(
        &self,
        index_name: &str,
        content_ids: &[ContentId],
    ) -> Result<Vec<String>, ProviderError> {
        let mut object_ids = Vec::new();
        for filters in content_id_filters(content_ids, CONTENT_ID_FILTER_GROUP) {
            let stream = stream_object_ids(self, index_name, filters);
            pin_mut!(stream);
            while let Some(object_id) = stream.next().await {
                object_ids.push(object_id?);
            }
        }
        Ok(object_ids)
    }
}

#[async_trait]
impl SearchProvider for AlgoliaProvider {
    fn name(&self) -> &'static str {
        "algolia"
    }

    async fn upsert(
        &self,
        index_name: &str,
        documents: Vec<Document>,
        options: &UpsertOptions,
    ) -> Result<ProviderResponse, ProviderError> {
        if documents.is_empty() {
            return Ok(ProviderResponse::default());
        }

        let operations = documents
            .iter()
            .map(|document| {
                let action = if document.object_id.is_some() {
                    BatchAction::UpdateObject
                } else {
                    BatchAction::AddObject
                };
                serde_json::to_value(document)
                    .map(|body| BatchOperation { action, body })
                    .map_err(|err| ProviderError::Decode(err.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut response = ProviderResponse::default();
        for chunk in operations.chunks(MAX_BATCH_OPERATIONS) {
            response.merge(self.send_batch(index_name, chunk).await?.into());
        }

        if options.wait_for_task {
            for task_id in &response.task_ids {
                self.wait_for_task(index_name, *task_id).await?;
            }
        }

        tracing::debug!(
            index = index_name,
            documents = operations.len(),
            tasks = response.task_ids.len(),
            "Algolia records saved"
        );
        Ok(response)
    }

    async fn delete_by_content_ids(
        &self,
        index_name: &str,
        content_ids: &[ContentId],
    ) -> ProviderResponse {
        if content_ids.is_empty() {
            return ProviderResponse::default();
        }

        let object_ids = match self.resolve_object_ids(index_name, content_ids).await {
            Ok(object_ids) => object_ids,
            Err(error) => {
                tracing::warn!(
                    index = index_name,
                    content_ids = content_ids.len(),
                    error = %error,
                    "Failed to resolve records for deletion"
                );
                return ProviderResponse::default();
            }
        };

        if object_ids.is_empty() {
            tracing::debug!(
                index = index_name,
                content_ids = content_ids.len(),
                "No records matched content ids"
            );
            return ProviderResponse::default();
        }

        let operations: Vec<BatchOperation> = object_ids
            .into_iter()
            .map(|object_id| BatchOperation {
                action: BatchAction::DeleteObject,
                body: json!({ "objectID": object_id }),
            })
            .collect();

        let mut response = ProviderResponse::default();
        for chunk in operations.chunks(MAX_BATCH_OPERATIONS) {
            match self.send_batch(index_name, chunk).await {
                Ok(batch) => response.merge(batch.into()),
                Err(error) => {
                    tracing::warn!(
                        index = index_name,
                        records = chunk.len(),
                        error = %error,
                        "Failed to delete records"
                    );
                    break;
                }
            }
        }

        tracing::debug!(
            index = index_name,
            content_ids = content_ids.len(),
            records = response.object_ids.len(),
            "Algolia records deleted"
        );
        response
    }

    async fn search(
        &self,
        index_name: &str,
        query: &SearchQuery,
    ) -> Result<Vec<Document>, ProviderError> {
        let body = QueryRequest {
            query: query.text.clone(),
            filters: build_search_filter(query),
            hits_per_page: query.hits_per_page,
            page: query.page,
            distinct: query.distinct,
        };
        let response = self
            .request(Method::POST, self.endpoint(index_name, &["query"])?)
            .json(&body)
            .send()
            .await?;
        let QueryResponse { hits } = read_json(response).await?;

        Ok(hits
            .into_iter()
            .filter_map(|mut hit| {
                hit.retain(|key, _| !key.starts_with('_'));
                serde_json::from_value::<Document>(Value::Object(hit))
                    .inspect_err(|err| {
                        tracing::debug!(index = index_name, error = %err, "Skipping foreign hit");
                    })
                    .ok()
            })
            .collect())
    }

    async fn clear_index(&self, index_name: &str) -> Result<ProviderResponse, ProviderError> {
        let response = self
            .request(Method::POST, self.endpoint(index_name, &["clear"])?)
            .send()
            .await?;
        let TaskAck { task_id } = read_json(response).await?;
        tracing::info!(index = index_name, task_id, "Algolia index cleared");
        Ok(ProviderResponse {
            task_ids: vec![task_id],
            object_ids: Vec::new(),
        })
    }

    async fn configure(
        &self,
        index_name: &str,
        settings: &IndexSettings,
    ) -> Result<ProviderResponse, ProviderError> {
        let response = self
            .request(Method::PUT, self.endpoint(index_name, &["settings"])?)
            .json(settings)
            .send()
            .await?;
        let TaskAck { task_id } = read_json(response).await?;
        tracing::info!(
            index = index_name,
            task_id,
            facets = settings.attributes_for_faceting.len(),
            "Algolia settings pushed"
        );
        Ok(ProviderResponse {
            task_ids: vec![task_id],
            object_ids: Vec::new(),
        })
    }
}

impl From<BatchResponse> for ProviderResponse {
    fn from(batch: BatchResponse) -> Self {
        Self {
            task_ids: vec![batch.task_id],
            object_ids: batch.object_ids,
        }
    }
}

/// Decode a successful response, or turn a failing one into [`ProviderError::UnexpectedStatus`].
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        });
    }
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|err| ProviderError::Decode(err.to_string()))
}

fn normalize_base_url(url: &str) -> Result<Url, String> {
    let mut parsed = Url::parse(url).map_err(|err| err.to_string())?;
    if parsed.cannot_be_a_base() {
        return Err(format!("{url} cannot be used as a base URL"));
    }
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{
        Method::{GET, POST, PUT},
        MockServer,
    };
    use serde_json::Map;

    fn provider(server: &MockServer) -> AlgoliaProvider {
        let credentials = AlgoliaCredentials {
            app_id: "APP".into(),
            admin_api_key: "secret".into(),
            search_api_key: None,
            base_url: Some(server.base_url()),
        };
        AlgoliaProvider::new(&credentials, Duration::from_secs(5)).expect("provider")
    }

    fn document(content_id: ContentId, title: &str) -> Document {
        let mut fields = Map::new();
        fields.insert("title".into(), json!(title));
        Document::new(content_id, fields)
    }

    #[test]
    fn endpoint_encodes_index_names() {
        let credentials = AlgoliaCredentials {
            app_id: "APP".into(),
            admin_api_key: "secret".into(),
            search_api_key: None,
            base_url: None,
        };
        let provider =
            AlgoliaProvider::new(&credentials, Duration::from_secs(1)).expect("provider");
        let url = provider
            .endpoint("site main", &["batch"])
            .expect("endpoint");
        assert_eq!(url.as_str(), "https://app.algolia.net/1/indexes/site%20main/batch");
    }

    #[test]
    fn new_rejects_missing_credentials() {
        let credentials = AlgoliaCredentials {
            app_id: " ".into(),
            admin_api_key: String::new(),
            search_api_key: None,
            base_url: None,
        };
        assert!(matches!(
            AlgoliaProvider::new(&credentials, Duration::from_secs(1)),
            Err(ProviderError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn upsert_posts_batch_with_credentials() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/1/indexes/site_main/batch")
                    .header("x-algolia-application-id", "APP")
                    .header("x-algolia-api-key", "secret")
                    .body_contains("\"action\":\"addObject\"")
                    .body_contains("\"contentID\":7");
                then.status(200)
                    .json_body(json!({ "taskID": 11, "objectIDs": ["abc"] }));
            })
            .await;

        let response = provider(&server)
            .upsert("site_main", vec![document(7, "Hello")], &UpsertOptions::default())
            .await
            .expect("upsert");

        mock.assert();
        assert_eq!(response.task_ids, vec![11]);
        assert_eq!(response.object_ids, vec!["abc".to_string()]);
    }

    #[tokio::test]
    async fn upsert_with_object_id_updates_and_waits_for_task() {
        let server = MockServer::start_async().await;
        let batch = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/1/indexes/site_main/batch")
                    .body_contains("\"action\":\"updateObject\"")
                    .body_contains("\"objectID\":\"abc\"");
                then.status(200)
                    .json_body(json!({ "taskID": 12, "objectIDs": ["abc"] }));
            })
            .await;
        let task = server
            .mock_async(|when, then| {
                when.method(GET).path("/1/indexes/site_main/task/12");
                then.status(200)
                    .json_body(json!({ "status": "published", "pendingTask": false }));
            })
            .await;

        let mut existing = document(7, "Hello again");
        existing.object_id = Some("abc".into());
        provider(&server)
            .upsert(
                "site_main",
                vec![existing],
                &UpsertOptions {
                    wait_for_task: true,
                },
            )
            .await
            .expect("upsert");

        batch.assert();
        task.assert();
    }

    #[tokio::test]
    async fn upsert_failure_carries_provider_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/1/indexes/site_main/batch");
                then.status(400)
                    .json_body(json!({ "message": "Record at the position 0 is too big", "status": 400 }));
            })
            .await;

        let error = provider(&server)
            .upsert("site_main", vec![document(7, "Hello")], &UpsertOptions::default())
            .await
            .expect_err("upsert should fail");

        assert!(matches!(
            error,
            ProviderError::UnexpectedStatus { status: 400, .. }
        ));
        assert!(error.to_string().contains("(400)"));
        assert!(error.to_string().contains("is too big"));
    }

    #[tokio::test]
    async fn delete_by_content_ids_browses_then_deletes() {
        let server = MockServer::start_async().await;
        let first_page = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/1/indexes/site_main/browse")
                    .body_contains("contentID:7 OR contentID:8")
                    .body_contains("\"attributesToRetrieve\":[\"objectID\"]");
                then.status(200).json_body(json!({
                    "hits": [{ "objectID": "a" }, { "objectID": "b" }],
                    "cursor": "next-page"
                }));
            })
            .await;
        let second_page = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/1/indexes/site_main/browse")
                    .body_contains("\"cursor\":\"next-page\"");
                then.status(200)
                    .json_body(json!({ "hits": [{ "objectID": "c" }] }));
            })
            .await;
        let delete = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/1/indexes/site_main/batch")
                    .json_body(json!({
                        "requests": [
                            { "action": "deleteObject", "body": { "objectID": "a" } },
                            { "action": "deleteObject", "body": { "objectID": "b" } },
                            { "action": "deleteObject", "body": { "objectID": "c" } }
                        ]
                    }));
                then.status(200)
                    .json_body(json!({ "taskID": 5, "objectIDs": ["a", "b", "c"] }));
            })
            .await;

        let response = provider(&server)
            .delete_by_content_ids("site_main", &[7, 8])
            .await;

        first_page.assert();
        second_page.assert();
        delete.assert();
        assert_eq!(response.task_ids, vec![5]);
        assert_eq!(response.object_ids.len(), 3);
    }

    #[tokio::test]
    async fn delete_by_content_ids_swallows_browse_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/1/indexes/site_main/browse");
                then.status(503).body("unavailable");
            })
            .await;
        let delete = server
            .mock_async(|when, then| {
                when.method(POST).path("/1/indexes/site_main/batch");
                then.status(200).json_body(json!({ "taskID": 1, "objectIDs": [] }));
            })
            .await;

        let response = provider(&server)
            .delete_by_content_ids("site_main", &[7])
            .await;

        assert!(response.is_empty());
        delete.assert_hits(0);
    }

    #[tokio::test]
    async fn configure_puts_settings() {
        let server = MockServer::start_async().await;
        let settings = IndexSettings {
            searchable_attributes: vec!["title".into()],
            attributes_for_faceting: vec!["type".into(), "filterOnly(contentID)".into()],
            attribute_for_distinct: "contentID".into(),
            distinct: true,
        };
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/1/indexes/site_main/settings")
                    .json_body(json!({
                        "searchableAttributes": ["title"],
                        "attributesForFaceting": ["type", "filterOnly(contentID)"],
                        "attributeForDistinct": "contentID",
                        "distinct": true
                    }));
                then.status(200)
                    .json_body(json!({ "taskID": 3, "updatedAt": "2024-05-01T10:00:00Z" }));
            })
            .await;

        let response = provider(&server)
            .configure("site_main", &settings)
            .await
            .expect("configure");

        mock.assert();
        assert_eq!(response.task_ids, vec![3]);
    }

    #[tokio::test]
    async fn clear_index_posts_clear() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/1/indexes/site_main/clear");
                then.status(200)
                    .json_body(json!({ "taskID": 9, "updatedAt": "2024-05-01T10:00:00Z" }));
            })
            .await;

        let response = provider(&server).clear_index("site_main").await.expect("clear");

        mock.assert();
        assert_eq!(response.task_ids, vec![9]);
    }

    #[tokio::test]
    async fn search_sends_filters_and_strips_internal_attributes() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/1/indexes/site_main/query")
                    .body_contains("\"query\":\"rust\"")
                    .body_contains("\"filters\":\"type:\\\"post\\\"\"")
                    .body_contains("\"distinct\":true");
                then.status(200).json_body(json!({
                    "hits": [
                        {
                            "objectID": "a",
                            "contentID": 7,
                            "title": "Rust",
                            "_highlightResult": { "title": { "value": "<em>Rust</em>" } }
                        },
                        { "objectID": "foreign", "title": "No content id" }
                    ],
                    "nbHits": 2
                }));
            })
            .await;

        let mut query = SearchQuery::new("rust");
        query.content_types = vec!["post".into()];
        let hits = provider(&server)
            .search("site_main", &query)
            .await
            .expect("search");

        mock.assert();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].object_id.as_deref(), Some("a"));
        assert_eq!(hits[0].content_id, 7);
        assert!(!hits[0].fields.contains_key("_highlightResult"));
    }

    #[tokio::test]
    async fn wait_for_task_gives_up_after_bounded_attempts() {
        let server = MockServer::start_async().await;
        let task = server
            .mock_async(|when, then| {
                when.method(GET).path("/1/indexes/site_main/task/4");
                then.status(200).json_body(json!({ "status": "notPublished" }));
            })
            .await;

        let error = provider(&server)
            .with_task_polling(TaskPolling {
                attempts: 3,
                interval: Duration::from_millis(1),
            })
            .wait_for_task("site_main", 4)
            .await
            .expect_err("task should time out");

        task.assert_hits(3);
        assert!(matches!(
            error,
            ProviderError::TaskTimeout {
                task_id: 4,
                attempts: 3
            }
        ));
    }
}
