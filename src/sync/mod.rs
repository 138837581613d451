//! Sync core: incremental cycles, paginated reindex jobs, and the service facade.

mod orchestrator;
mod service;
pub mod types;

pub use orchestrator::SyncOrchestrator;
pub use service::{SyncApi, SyncService};
pub use types::{
    BatchError, BatchReport, ContentEvent, IncrementalReport, ServiceInitError, SyncError,
};
