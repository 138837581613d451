//! Content records read from the CMS and the store boundary the sync core consumes.

mod store;

pub use store::{ContentPage, ContentQuery, ContentStore, ContentStoreError, InMemoryContentStore};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Identifier of a content item in the CMS. Doubles as the `contentID` document key.
pub type ContentId = u64;

/// Status assigned to publicly visible content.
pub const PUBLISHED_STATUS: &str = "publish";

/// A single unit of indexable content owned by the CMS.
///
/// The sync core only reads these records; every field mirrors what the CMS exposes for a
/// post-like entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// CMS identifier.
    pub id: ContentId,
    /// Content type tag (`post`, `page`, custom types).
    #[serde(rename = "type")]
    pub content_type: String,
    /// Workflow status (`publish`, `draft`, `private`, ...).
    pub status: String,
    /// Title, possibly containing markup.
    pub title: String,
    /// Rendered body, possibly containing markup.
    #[serde(default)]
    pub body: String,
    /// Optional hand-written summary.
    #[serde(default)]
    pub excerpt: Option<String>,
    /// Author of the item.
    #[serde(default)]
    pub author: Author,
    /// Publication timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    /// Last modification timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub modified_at: OffsetDateTime,
    /// Terms keyed by taxonomy slug.
    #[serde(default)]
    pub taxonomies: BTreeMap<String, Vec<Term>>,
    /// Featured image URL.
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Arbitrary custom fields keyed by field name.
    #[serde(default)]
    pub custom_fields: BTreeMap<String, Value>,
    /// Public permalink, when the CMS already resolved one.
    #[serde(default)]
    pub permalink: Option<String>,
    /// Viewer password protecting the item, if any.
    #[serde(default)]
    pub password: Option<String>,
    /// Editor flag excluding the item from every index.
    #[serde(default)]
    pub omit_from_index: bool,
}

impl ContentItem {
    /// Whether a viewer credential is needed to read the item.
    pub fn requires_credential(&self) -> bool {
        self.password
            .as_deref()
            .is_some_and(|password| !password.is_empty())
    }

    /// Term names assigned under the given taxonomy.
    pub fn term_names(&self, taxonomy: &str) -> Vec<String> {
        self.taxonomies
            .get(taxonomy)
            .map(|terms| terms.iter().map(|term| term.name.clone()).collect())
            .unwrap_or_default()
    }
}

/// Author reference carried by a content item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// CMS user identifier.
    #[serde(default)]
    pub id: u64,
    /// Human-readable display name.
    #[serde(default)]
    pub display_name: String,
}

/// Taxonomy term attached to a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    /// Machine slug.
    pub slug: String,
    /// Display name.
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_minimal_snapshot() {
        let item: ContentItem = serde_json::from_value(json!({
            "id": 7,
            "type": "post",
            "status": "publish",
            "title": "Hello",
            "published_at": "2024-05-01T10:00:00Z",
            "modified_at": "2024-05-02T10:00:00Z"
        }))
        .expect("content item");

        assert_eq!(item.id, 7);
        assert_eq!(item.content_type, "post");
        assert!(item.body.is_empty());
        assert!(!item.requires_credential());
        assert!(!item.omit_from_index);
    }

    #[test]
    fn empty_password_does_not_require_credential() {
        let mut item: ContentItem = serde_json::from_value(json!({
            "id": 1,
            "type": "post",
            "status": "publish",
            "title": "Locked",
            "password": "",
            "published_at": "2024-05-01T10:00:00Z",
            "modified_at": "2024-05-01T10:00:00Z"
        }))
        .expect("content item");
        assert!(!item.requires_credential());

        item.password = Some("hunter2".into());
        assert!(item.requires_credential());
    }

    #[test]
    fn term_names_follow_taxonomy() {
        let item: ContentItem = serde_json::from_value(json!({
            "id": 3,
            "type": "post",
            "status": "publish",
            "title": "Tagged",
            "published_at": "2024-05-01T10:00:00Z",
            "modified_at": "2024-05-01T10:00:00Z",
            "taxonomies": {
                "category": [{ "slug": "news", "name": "News" }],
                "post_tag": [{ "slug": "rust", "name": "Rust" }, { "slug": "sync", "name": "Sync" }]
            }
        }))
        .expect("content item");

        assert_eq!(item.term_names("category"), vec!["News".to_string()]);
        assert_eq!(item.term_names("post_tag").len(), 2);
        assert!(item.term_names("missing").is_empty());
    }
}
