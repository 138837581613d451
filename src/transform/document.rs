//! Provider-agnostic documents and the transformer that derives them from content items.

use crate::content::{ContentId, ContentItem};
use crate::settings::IndexDefinition;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::chunking::{DEFAULT_CHUNK_WORD_THRESHOLD, chunk_text};
use super::sanitize::{to_plain_text, truncate_words};

/// Field carrying the content identifier shared by every chunk of one item.
pub const CONTENT_ID_FIELD: &str = "contentID";

const EXCERPT_WORDS: usize = 55;

/// Provider-facing record derived from a content item.
///
/// Serializes flat: `objectID` (when assigned), `contentID`, then every named field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Synthetic identifier assigned by the provider on upsert.
    #[serde(rename = "objectID", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    /// Stable content identifier used for dedup and delete.
    #[serde(rename = "contentID")]
    pub content_id: ContentId,
    /// Remaining named fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    /// Create a document without a provider object id.
    pub fn new(content_id: ContentId, fields: Map<String, Value>) -> Self {
        Self {
            object_id: None,
            content_id,
            fields,
        }
    }

    /// Borrow a string field.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

/// Inputs the transformer needs beyond the content item itself.
#[derive(Debug, Clone)]
pub struct TransformSettings {
    /// Public site URL used for fallback canonical links.
    pub site_url: String,
    /// Words per chunk before a body is split.
    pub chunk_word_threshold: usize,
}

impl TransformSettings {
    /// Settings with the default chunk threshold.
    pub fn new(site_url: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into(),
            chunk_word_threshold: DEFAULT_CHUNK_WORD_THRESHOLD,
        }
    }
}

/// Converts content items into one or more provider documents.
#[derive(Debug, Clone)]
pub struct DocumentTransformer {
    settings: TransformSettings,
}

impl DocumentTransformer {
    /// Build a transformer from explicit settings.
    pub fn new(settings: TransformSettings) -> Self {
        Self { settings }
    }

    /// Configured chunk threshold.
    pub fn chunk_word_threshold(&self) -> usize {
        self.settings.chunk_word_threshold
    }

    /// Transform an item for the given index.
    ///
    /// Long bodies produce one document per chunk, all sharing `contentID`. An item whose title
    /// and body are both empty once markup is stripped yields no documents.
    pub fn transform(&self, item: &ContentItem, index: &IndexDefinition) -> Vec<Document> {
        let title = to_plain_text(&item.title);
        let body = to_plain_text(&item.body);
        if title.is_empty() && body.is_empty() {
            tracing::debug!(
                content_id = item.id,
                index = %index.name,
                "Skipping item with nothing to index"
            );
            return Vec::new();
        }

        let base = self.base_fields(item, index, &title, &body);
        let chunks = chunk_text(&body, self.settings.chunk_word_threshold);

        if chunks.len() <= 1 {
            let mut fields = base;
            fields.insert("content".into(), Value::String(body));
            return vec![Document::new(item.id, fields)];
        }

        let chunk_count = chunks.len();
        tracing::debug!(
            content_id = item.id,
            index = %index.name,
            chunks = chunk_count,
            threshold = self.settings.chunk_word_threshold,
            "Chunked long-form body"
        );
        chunks
            .into_iter()
            .enumerate()
            .map(|(position, chunk)| {
                let mut fields = base.clone();
                fields.insert("content".into(), Value::String(chunk.text()));
                fields.insert("chunkIndex".into(), Value::from(position));
                fields.insert("chunkCount".into(), Value::from(chunk_count));
                Document::new(item.id, fields)
            })
            .collect()
    }

    fn base_fields(
        &self,
        item: &ContentItem,
        index: &IndexDefinition,
        title: &str,
        body: &str,
    ) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("title".into(), Value::String(title.to_string()));
        fields.insert(
            "excerpt".into(),
            Value::String(
                item.excerpt
                    .as_deref()
                    .map(to_plain_text)
                    .filter(|excerpt| !excerpt.is_empty())
                    .unwrap_or_else(|| truncate_words(body, EXCERPT_WORDS)),
            ),
        );
        fields.insert("url".into(), Value::String(self.canonical_url(item)));
        fields.insert("type".into(), Value::String(item.content_type.clone()));
        fields.insert(
            "typeLabel".into(),
            Value::String(type_label(&item.content_type)),
        );
        fields.insert(
            "date".into(),
            Value::from(item.published_at.unix_timestamp()),
        );
        fields.insert(
            "modified".into(),
            Value::from(item.modified_at.unix_timestamp()),
        );

        let author = item.author.display_name.trim();
        if !author.is_empty() {
            fields.insert("author".into(), Value::String(author.to_string()));
        }

        if let Some(image) = item
            .thumbnail_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
        {
            fields.insert("image".into(), Value::String(image.to_string()));
        }

        let taxonomy: Map<String, Value> = index
            .taxonomies
            .iter()
            .filter_map(|slug| {
                let names = item.term_names(slug);
                (!names.is_empty()).then(|| (slug.clone(), Value::from(names)))
            })
            .collect();
        if !taxonomy.is_empty() {
            fields.insert("taxonomy".into(), Value::Object(taxonomy));
        }

        let meta: Map<String, Value> = index
            .custom_fields
            .iter()
            .filter_map(|key| {
                item.custom_fields
                    .get(key)
                    .filter(|value| is_primitive_or_array(value))
                    .map(|value| (key.clone(), value.clone()))
            })
            .collect();
        if !meta.is_empty() {
            fields.insert("meta".into(), Value::Object(meta));
        }

        fields
    }

    fn canonical_url(&self, item: &ContentItem) -> String {
        item.permalink
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!(
                    "{}/?p={}",
                    self.settings.site_url.trim_end_matches('/'),
                    item.id
                )
            })
    }
}

/// Human-readable label for a content type slug.
pub fn type_label(content_type: &str) -> String {
    match content_type {
        "post" => "Post".to_string(),
        "page" => "Page".to_string(),
        "attachment" => "Media".to_string(),
        other => other
            .split(['_', '-'])
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                chars
                    .next()
                    .map(|first| first.to_uppercase().chain(chars).collect::<String>())
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn is_primitive_or_array(value: &Value) -> bool {
    match value {
        Value::Null | Value::Object(_) => false,
        Value::Array(items) => items
            .iter()
            .all(|item| !matches!(item, Value::Object(_) | Value::Array(_))),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Author, Term};
    use serde_json::json;
    use std::collections::BTreeMap;
    use time::OffsetDateTime;

    fn index() -> IndexDefinition {
        IndexDefinition {
            id: 1,
            slug: "main".into(),
            name: "example-com_main".into(),
            content_types: vec!["post".into()],
            taxonomies: vec!["category".into(), "post_tag".into()],
            custom_fields: vec!["price".into(), "gallery".into()],
            searchable_attributes: vec![],
            facet_attributes: vec![],
            distinct_attribute: None,
        }
    }

    fn item(body: &str) -> ContentItem {
        let mut taxonomies = BTreeMap::new();
        taxonomies.insert(
            "category".to_string(),
            vec![Term {
                slug: "news".into(),
                name: "News".into(),
            }],
        );
        taxonomies.insert(
            "genre".to_string(),
            vec![Term {
                slug: "jazz".into(),
                name: "Jazz".into(),
            }],
        );
        let mut custom_fields = BTreeMap::new();
        custom_fields.insert("price".to_string(), json!(12.5));
        custom_fields.insert("gallery".to_string(), json!({ "nested": true }));
        custom_fields.insert("internal".to_string(), json!("hidden"));

        ContentItem {
            id: 7,
            content_type: "post".into(),
            status: "publish".into(),
            title: "<em>Hello</em> &amp; welcome".into(),
            body: body.into(),
            excerpt: None,
            author: Author {
                id: 3,
                display_name: "Ada Lovelace".into(),
            },
            published_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("ts"),
            modified_at: OffsetDateTime::from_unix_timestamp(1_700_000_600).expect("ts"),
            taxonomies,
            thumbnail_url: Some("https://example.com/img.png".into()),
            custom_fields,
            permalink: None,
            password: None,
            omit_from_index: false,
        }
    }

    fn transformer(threshold: usize) -> DocumentTransformer {
        DocumentTransformer::new(TransformSettings {
            site_url: "https://example.com/".into(),
            chunk_word_threshold: threshold,
        })
    }

    #[test]
    fn short_item_yields_one_unchunked_document() {
        let documents = transformer(1000).transform(&item("<p>Short body. Done.</p>"), &index());
        assert_eq!(documents.len(), 1);
        let document = &documents[0];

        assert_eq!(document.content_id, 7);
        assert!(document.object_id.is_none());
        assert_eq!(document.str_field("title"), Some("Hello & welcome"));
        assert_eq!(document.str_field("content"), Some("Short body. Done."));
        assert_eq!(document.str_field("url"), Some("https://example.com/?p=7"));
        assert_eq!(document.str_field("typeLabel"), Some("Post"));
        assert_eq!(document.str_field("author"), Some("Ada Lovelace"));
        assert_eq!(document.str_field("image"), Some("https://example.com/img.png"));
        assert_eq!(document.fields["date"], json!(1_700_000_000));
        assert_eq!(document.fields["taxonomy"], json!({ "category": ["News"] }));
        assert_eq!(document.fields["meta"], json!({ "price": 12.5 }));
        assert!(!document.fields.contains_key("chunkIndex"));
    }

    #[test]
    fn long_item_yields_chunks_sharing_content_id() {
        let body = (0..280)
            .map(|index| format!("Sentence{index} {}.", vec!["word"; 9].join(" ")))
            .collect::<Vec<_>>()
            .join(" ");
        let documents = transformer(1000).transform(&item(&body), &index());

        assert_eq!(documents.len(), 3);
        for (position, document) in documents.iter().enumerate() {
            assert_eq!(document.content_id, 7);
            assert_eq!(document.fields["chunkIndex"], json!(position));
            assert_eq!(document.fields["chunkCount"], json!(3));
            assert_eq!(document.str_field("title"), Some("Hello & welcome"));
        }
    }

    #[test]
    fn empty_item_yields_nothing() {
        let mut empty = item("<p> </p>");
        empty.title = "<span></span>".into();
        assert!(transformer(1000).transform(&empty, &index()).is_empty());
    }

    #[test]
    fn permalink_wins_over_fallback_url() {
        let mut linked = item("Body.");
        linked.permalink = Some("https://example.com/hello/".into());
        let documents = transformer(1000).transform(&linked, &index());
        assert_eq!(documents[0].str_field("url"), Some("https://example.com/hello/"));
    }

    #[test]
    fn document_serializes_flat_record() {
        let mut fields = Map::new();
        fields.insert("title".into(), json!("Hi"));
        let mut document = Document::new(9, fields);
        assert_eq!(
            serde_json::to_value(&document).expect("json"),
            json!({ "contentID": 9, "title": "Hi" })
        );

        document.object_id = Some("abc".into());
        assert_eq!(
            serde_json::to_value(&document).expect("json"),
            json!({ "objectID": "abc", "contentID": 9, "title": "Hi" })
        );
    }

    #[test]
    fn type_label_title_cases_custom_types() {
        assert_eq!(type_label("page"), "Page");
        assert_eq!(type_label("case_study"), "Case Study");
        assert_eq!(type_label("event-listing"), "Event Listing");
    }
}
