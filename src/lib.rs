#![deny(missing_docs)]

//! Core library for the searchsync CMS-to-search-index synchronizer.

/// Algolia REST adapter.
pub mod algolia;
/// HTTP routing and REST handlers.
pub mod api;
/// Per-request change collection.
pub mod collector;
/// Environment-driven configuration management.
pub mod config;
/// Content items and the content store abstraction.
pub mod content;
/// Indexing criteria predicates.
pub mod criteria;
/// Structured logging and tracing setup.
pub mod logging;
/// Sync metrics helpers.
pub mod metrics;
/// Search provider abstraction and the in-memory backend.
pub mod provider;
/// Index definitions.
pub mod settings;
/// Sync orchestration and the service facade.
pub mod sync;
/// Content-to-document transformation.
pub mod transform;
