//! Standard indexing predicates.

use super::{IndexingDecision, IndexingPredicate};
use crate::content::ContentItem;
use crate::settings::IndexDefinition;

/// Excludes items whose type the index does not admit.
///
/// An index without an explicit type list admits the global indexable set.
#[derive(Debug, Clone)]
pub struct ContentTypePredicate {
    global_types: Vec<String>,
}

impl ContentTypePredicate {
    /// Predicate with the given global type set.
    pub fn new(global_types: Vec<String>) -> Self {
        Self { global_types }
    }
}

impl IndexingPredicate for ContentTypePredicate {
    fn name(&self) -> &'static str {
        "content_type"
    }

    fn evaluate(
        &self,
        current: IndexingDecision,
        item: &ContentItem,
        index: &IndexDefinition,
    ) -> IndexingDecision {
        let admitted = if index.declares_content_types() {
            &index.content_types
        } else {
            &self.global_types
        };
        if admitted.iter().any(|kind| kind == &item.content_type) {
            current
        } else {
            IndexingDecision::Exclude
        }
    }
}

/// Excludes items whose status is not allowed.
#[derive(Debug, Clone)]
pub struct StatusPredicate {
    allowed: Vec<String>,
}

impl StatusPredicate {
    /// Predicate admitting the given statuses.
    pub fn new(allowed: Vec<String>) -> Self {
        Self { allowed }
    }
}

impl IndexingPredicate for StatusPredicate {
    fn name(&self) -> &'static str {
        "status"
    }

    fn evaluate(
        &self,
        current: IndexingDecision,
        item: &ContentItem,
        _index: &IndexDefinition,
    ) -> IndexingDecision {
        if self.allowed.iter().any(|status| status == &item.status) {
            current
        } else {
            IndexingDecision::Exclude
        }
    }
}

/// Excludes items that need a viewer credential.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessRestrictionPredicate;

impl IndexingPredicate for AccessRestrictionPredicate {
    fn name(&self) -> &'static str {
        "access_restriction"
    }

    fn evaluate(
        &self,
        current: IndexingDecision,
        item: &ContentItem,
        _index: &IndexDefinition,
    ) -> IndexingDecision {
        if item.requires_credential() {
            IndexingDecision::Exclude
        } else {
            current
        }
    }
}

/// Excludes items an editor flagged for omission.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualOmissionPredicate;

impl IndexingPredicate for ManualOmissionPredicate {
    fn name(&self) -> &'static str {
        "manual_omission"
    }

    fn evaluate(
        &self,
        current: IndexingDecision,
        item: &ContentItem,
        _index: &IndexDefinition,
    ) -> IndexingDecision {
        if item.omit_from_index {
            IndexingDecision::Exclude
        } else {
            current
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{index, item};
    use super::*;

    #[test]
    fn content_type_uses_index_list_or_global_set() {
        let predicate = ContentTypePredicate::new(vec!["post".into()]);
        let undecided = IndexingDecision::Undecided;

        assert_eq!(
            predicate.evaluate(undecided, &item("page", "publish"), &index(&["page"])),
            undecided
        );
        assert_eq!(
            predicate.evaluate(undecided, &item("page", "publish"), &index(&[])),
            IndexingDecision::Exclude
        );
        assert_eq!(
            predicate.evaluate(undecided, &item("post", "publish"), &index(&[])),
            undecided
        );
    }

    #[test]
    fn status_admits_configured_statuses() {
        let predicate = StatusPredicate::new(vec!["publish".into(), "private".into()]);
        let definition = index(&[]);
        assert_eq!(
            predicate.evaluate(IndexingDecision::Include, &item("post", "private"), &definition),
            IndexingDecision::Include
        );
        assert_eq!(
            predicate.evaluate(IndexingDecision::Include, &item("post", "draft"), &definition),
            IndexingDecision::Exclude
        );
    }

    #[test]
    fn manual_omission_excludes_flagged_items() {
        let mut flagged = item("post", "publish");
        flagged.omit_from_index = true;
        assert_eq!(
            ManualOmissionPredicate.evaluate(IndexingDecision::Undecided, &flagged, &index(&[])),
            IndexingDecision::Exclude
        );
    }
}
