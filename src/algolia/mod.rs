//! Algolia search provider.

/// Streaming helpers for browse pagination.
pub mod browser;
pub mod client;
pub mod filters;
mod types;

pub use client::{AlgoliaProvider, TaskPolling};
pub use filters::{build_search_filter, content_id_filters};
