//! Per-cycle accumulation of content changes.

use crate::content::ContentId;
use serde::Serialize;
use std::collections::BTreeSet;

/// Identifiers drained from a collector at the end of a cycle.
///
/// The two sets are disjoint: an id marked for both ends up in `to_delete` only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    /// Content to (re)index.
    pub to_index: BTreeSet<ContentId>,
    /// Content to remove from every index.
    pub to_delete: BTreeSet<ContentId>,
}

impl ChangeSet {
    /// Whether the cycle produced no work.
    pub fn is_empty(&self) -> bool {
        self.to_index.is_empty() && self.to_delete.is_empty()
    }
}

/// Collects index and delete intents during one unit of work.
///
/// A fresh collector is created per cycle and consumed by [`ChangeCollector::drain`], so
/// nothing carries over between cycles.
#[derive(Debug, Default)]
pub struct ChangeCollector {
    to_index: BTreeSet<ContentId>,
    to_delete: BTreeSet<ContentId>,
}

impl ChangeCollector {
    /// Start an empty cycle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue content for indexing. Repeated marks are ignored.
    pub fn mark_for_index(&mut self, id: ContentId) {
        self.to_index.insert(id);
    }

    /// Queue content for deletion. Repeated marks are ignored.
    pub fn mark_for_delete(&mut self, id: ContentId) {
        self.to_delete.insert(id);
    }

    /// Whether nothing has been marked yet.
    pub fn is_empty(&self) -> bool {
        self.to_index.is_empty() && self.to_delete.is_empty()
    }

    /// End the cycle, resolving ids marked both ways in favour of deletion.
    pub fn drain(self) -> ChangeSet {
        let Self {
            mut to_index,
            to_delete,
        } = self;
        to_index.retain(|id| !to_delete.contains(id));
        ChangeSet {
            to_index,
            to_delete,
        }
    }
}
