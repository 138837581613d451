//! Wire types for the Algolia REST API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Serialize)]
pub(crate) struct BatchRequest<'a> {
    pub(crate) requests: &'a [BatchOperation],
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchOperation {
    pub(crate) action: BatchAction,
    pub(crate) body: Value,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum BatchAction {
    AddObject,
    UpdateObject,
    DeleteObject,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatchResponse {
    #[serde(rename = "taskID")]
    pub(crate) task_id: u64,
    #[serde(rename = "objectIDs", default)]
    pub(crate) object_ids: Vec<String>,
}

/// Acknowledgement returned by `clear` and `settings`.
#[derive(Debug, Deserialize)]
pub(crate) struct TaskAck {
    #[serde(rename = "taskID")]
    pub(crate) task_id: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TaskStatus {
    pub(crate) status: String,
}

/// First browse page carries the filter; later pages only the cursor.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BrowseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) filters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) attributes_to_retrieve: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) hits_per_page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BrowseResponse {
    #[serde(default)]
    pub(crate) hits: Vec<BrowseHit>,
    #[serde(default)]
    pub(crate) cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BrowseHit {
    #[serde(rename = "objectID")]
    pub(crate) object_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryRequest {
    pub(crate) query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) filters: Option<String>,
    pub(crate) hits_per_page: usize,
    pub(crate) page: usize,
    pub(crate) distinct: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub(crate) hits: Vec<Map<String, Value>>,
}
