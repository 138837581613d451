//! Index definitions read from the external settings store.
//!
//! Definitions are administrator-owned. The sync core receives them as an immutable snapshot
//! and never writes them back.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Identifier of an index definition in the settings store.
pub type IndexId = u64;

/// Errors raised while loading index definitions.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Definitions file could not be read.
    #[error("Failed to read index definitions from {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Definitions file was not valid JSON for the expected shape.
    #[error("Invalid index definitions in {path}: {source}")]
    Parse {
        /// Path that failed.
        path: PathBuf,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },
    /// Two definitions share an identifier.
    #[error("Duplicate index definition id {0}")]
    DuplicateId(IndexId),
}

/// Named configuration describing what belongs in one provider-side index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Settings-store identifier.
    pub id: IndexId,
    /// Administrator-facing slug.
    pub slug: String,
    /// Provider index name. Opaque to the sync core.
    #[serde(default)]
    pub name: String,
    /// Included content types, in priority order. Empty means the global indexable set.
    #[serde(default)]
    pub content_types: Vec<String>,
    /// Taxonomy slugs whose term names are copied into documents.
    #[serde(default)]
    pub taxonomies: Vec<String>,
    /// Custom-field keys copied into documents under `meta`.
    #[serde(default)]
    pub custom_fields: Vec<String>,
    /// Provider searchable attributes. Empty selects the defaults.
    #[serde(default)]
    pub searchable_attributes: Vec<String>,
    /// Provider facet attributes. Empty derives them from type and taxonomies.
    #[serde(default)]
    pub facet_attributes: Vec<String>,
    /// Attribute used to collapse chunked records at query time.
    #[serde(default)]
    pub distinct_attribute: Option<String>,
}

impl IndexDefinition {
    /// Whether the definition restricts content types explicitly.
    pub fn declares_content_types(&self) -> bool {
        !self.content_types.is_empty()
    }
}

/// Load definitions from a JSON array file, deriving missing provider names from `site_url`.
pub fn load_index_definitions(
    path: &Path,
    site_url: &str,
) -> Result<Vec<IndexDefinition>, SettingsError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut definitions: Vec<IndexDefinition> =
        serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut seen = BTreeSet::new();
    for definition in &mut definitions {
        if !seen.insert(definition.id) {
            return Err(SettingsError::DuplicateId(definition.id));
        }
        if definition.name.trim().is_empty() {
            definition.name = derive_index_name(site_url, &definition.slug);
        }
    }

    tracing::info!(
        path = %path.display(),
        indexes = definitions.len(),
        "Loaded index definitions"
    );
    Ok(definitions)
}

/// Derive a provider index name from the site host and an index slug.
///
/// The result is lower-case; characters outside `[a-z0-9_-]` become `-` and dash runs collapse.
pub fn derive_index_name(site_url: &str, slug: &str) -> String {
    let host = reqwest::Url::parse(site_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| site_url.to_string());
    let slug = if slug.trim().is_empty() {
        "search"
    } else {
        slug
    };
    sanitize_title(&format!("{host}_{slug}"))
}

fn sanitize_title(raw: &str) -> String {
    let mut sanitized = String::with_capacity(raw.len());
    for ch in raw.trim().to_lowercase().chars() {
        let mapped = if ch.is_ascii_alphanumeric() || ch == '_' {
            ch
        } else {
            '-'
        };
        if mapped == '-' && sanitized.ends_with('-') {
            continue;
        }
        sanitized.push(mapped);
    }
    sanitized.trim_matches('-').to_string()
}
