//! Indexing criteria: an ordered, extensible chain of predicates deciding whether an item
//! belongs in an index.
//!
//! Each predicate sees the decision so far and returns a possibly-updated one. The first
//! `Exclude` ends evaluation; a chain that finishes without one yields `Include`.

mod predicates;

pub use predicates::{
    AccessRestrictionPredicate, ContentTypePredicate, ManualOmissionPredicate, StatusPredicate,
};

use crate::config::Config;
use crate::content::{ContentItem, PUBLISHED_STATUS};
use crate::settings::IndexDefinition;

/// Content types that never reach an index through the global type set.
pub const IGNORED_CONTENT_TYPES: &[&str] = &[
    "attachment",
    "revision",
    "nav_menu_item",
    "custom_css",
    "customize_changeset",
    "oembed_cache",
    "user_request",
    "wp_block",
    "wp_template",
    "wp_template_part",
    "wp_global_styles",
    "wp_navigation",
];

/// Tri-state verdict threaded through the predicate chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexingDecision {
    /// No predicate has ruled yet.
    #[default]
    Undecided,
    /// Item should be indexed.
    Include,
    /// Item must not be indexed.
    Exclude,
}

impl IndexingDecision {
    /// Whether the decision is a definitive exclusion.
    pub fn is_excluded(self) -> bool {
        self == Self::Exclude
    }
}

/// A single rule in the criteria chain.
pub trait IndexingPredicate: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Return the updated decision for `item` against `index`.
    fn evaluate(
        &self,
        current: IndexingDecision,
        item: &ContentItem,
        index: &IndexDefinition,
    ) -> IndexingDecision;
}

/// Global inputs to the standard predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriteriaPolicy {
    /// Types indexable when a definition lists none.
    pub indexable_content_types: Vec<String>,
    /// Types removed from the global set.
    pub ignored_content_types: Vec<String>,
    /// Statuses admitted into an index.
    pub allowed_statuses: Vec<String>,
}

impl Default for CriteriaPolicy {
    fn default() -> Self {
        Self {
            indexable_content_types: vec!["post".into(), "page".into()],
            ignored_content_types: IGNORED_CONTENT_TYPES
                .iter()
                .map(|kind| kind.to_string())
                .collect(),
            allowed_statuses: vec![PUBLISHED_STATUS.into()],
        }
    }
}

impl CriteriaPolicy {
    /// Build the policy from runtime configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            indexable_content_types: config.indexable_content_types.clone(),
            allowed_statuses: config.indexable_statuses.clone(),
            ..Self::default()
        }
    }

    /// Global indexable types minus the ignored ones.
    pub fn global_content_types(&self) -> Vec<String> {
        self.indexable_content_types
            .iter()
            .filter(|kind| !self.ignored_content_types.contains(kind))
            .cloned()
            .collect()
    }

    /// Types an index admits: its own list when declared, otherwise the global set.
    pub fn content_types_for(&self, index: &IndexDefinition) -> Vec<String> {
        if index.declares_content_types() {
            index.content_types.clone()
        } else {
            self.global_content_types()
        }
    }
}

/// Ordered predicate chain.
#[derive(Default)]
pub struct CriteriaChain {
    predicates: Vec<Box<dyn IndexingPredicate>>,
}

impl CriteriaChain {
    /// Empty chain; every item is included.
    pub fn new() -> Self {
        Self::default()
    }

    /// Type, status, access-restriction, and manual-omission checks, in that order.
    pub fn standard(policy: &CriteriaPolicy) -> Self {
        let mut chain = Self::new();
        chain
            .register(ContentTypePredicate::new(policy.global_content_types()))
            .register(StatusPredicate::new(policy.allowed_statuses.clone()))
            .register(AccessRestrictionPredicate)
            .register(ManualOmissionPredicate);
        chain
    }

    /// Append a predicate to the end of the chain.
    pub fn register(&mut self, predicate: impl IndexingPredicate + 'static) -> &mut Self {
        self.predicates.push(Box::new(predicate));
        self
    }

    /// Insert a predicate at `position`, clamped to the chain length.
    pub fn insert(
        &mut self,
        position: usize,
        predicate: impl IndexingPredicate + 'static,
    ) -> &mut Self {
        let position = position.min(self.predicates.len());
        self.predicates.insert(position, Box::new(predicate));
        self
    }

    /// Predicate names in evaluation order.
    pub fn names(&self) -> Vec<&'static str> {
        self.predicates.iter().map(|predicate| predicate.name()).collect()
    }

    /// Evaluate the chain for one item and index.
    pub fn evaluate(&self, item: &ContentItem, index: &IndexDefinition) -> IndexingDecision {
        let mut decision = IndexingDecision::Undecided;
        for predicate in &self.predicates {
            decision = predicate.evaluate(decision, item, index);
            if decision.is_excluded() {
                tracing::trace!(
                    content_id = item.id,
                    index = %index.name,
                    predicate = predicate.name(),
                    "Item excluded"
                );
                return IndexingDecision::Exclude;
            }
        }
        IndexingDecision::Include
    }

    /// Whether the item should be indexed.
    pub fn should_index(&self, item: &ContentItem, index: &IndexDefinition) -> bool {
        !self.evaluate(item, index).is_excluded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Author;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::OffsetDateTime;

    pub(super) fn item(content_type: &str, status: &str) -> ContentItem {
        ContentItem {
            id: 1,
            content_type: content_type.into(),
            status: status.into(),
            title: "Title".into(),
            body: "Body.".into(),
            excerpt: None,
            author: Author::default(),
            published_at: OffsetDateTime::UNIX_EPOCH,
            modified_at: OffsetDateTime::UNIX_EPOCH,
            taxonomies: Default::default(),
            thumbnail_url: None,
            custom_fields: Default::default(),
            permalink: None,
            password: None,
            omit_from_index: false,
        }
    }

    pub(super) fn index(content_types: &[&str]) -> IndexDefinition {
        IndexDefinition {
            id: 1,
            slug: "main".into(),
            name: "site_main".into(),
            content_types: content_types.iter().map(|kind| kind.to_string()).collect(),
            taxonomies: vec![],
            custom_fields: vec![],
            searchable_attributes: vec![],
            facet_attributes: vec![],
            distinct_attribute: None,
        }
    }

    struct Spy {
        calls: Arc<AtomicUsize>,
        verdict: IndexingDecision,
    }

    impl IndexingPredicate for Spy {
        fn name(&self) -> &'static str {
            "spy"
        }

        fn evaluate(
            &self,
            current: IndexingDecision,
            _item: &ContentItem,
            _index: &IndexDefinition,
        ) -> IndexingDecision {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.verdict == IndexingDecision::Undecided {
                current
            } else {
                self.verdict
            }
        }
    }

    fn spy(verdict: IndexingDecision) -> (Spy, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Spy {
                calls: calls.clone(),
                verdict,
            },
            calls,
        )
    }

    #[test]
    fn exclude_short_circuits_remaining_predicates() {
        let (first, first_calls) = spy(IndexingDecision::Exclude);
        let (second, second_calls) = spy(IndexingDecision::Include);
        let (third, third_calls) = spy(IndexingDecision::Undecided);

        let mut chain = CriteriaChain::new();
        chain.register(first).register(second).register(third);

        assert_eq!(
            chain.evaluate(&item("post", "publish"), &index(&["post"])),
            IndexingDecision::Exclude
        );
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn include_does_not_stop_later_exclusions() {
        let (first, _) = spy(IndexingDecision::Include);
        let (second, second_calls) = spy(IndexingDecision::Exclude);

        let mut chain = CriteriaChain::new();
        chain.register(first).register(second);

        assert!(!chain.should_index(&item("post", "publish"), &index(&["post"])));
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_chain_includes() {
        assert_eq!(
            CriteriaChain::new().evaluate(&item("post", "draft"), &index(&[])),
            IndexingDecision::Include
        );
    }

    #[test]
    fn standard_chain_order_and_insertion() {
        let mut chain = CriteriaChain::standard(&CriteriaPolicy::default());
        assert_eq!(
            chain.names(),
            vec!["content_type", "status", "access_restriction", "manual_omission"]
        );

        let (custom, _) = spy(IndexingDecision::Undecided);
        chain.insert(1, custom);
        chain.insert(99, ManualOmissionPredicate);
        assert_eq!(chain.names()[1], "spy");
        assert_eq!(chain.names().len(), 6);
    }

    #[test]
    fn protected_and_unpublished_items_are_excluded_despite_matching_type() {
        let chain = CriteriaChain::standard(&CriteriaPolicy::default());
        let definition = index(&["post"]);

        let mut protected = item("post", "publish");
        protected.password = Some("secret".into());
        assert_eq!(chain.evaluate(&protected, &definition), IndexingDecision::Exclude);

        let draft = item("post", "draft");
        assert_eq!(chain.evaluate(&draft, &definition), IndexingDecision::Exclude);

        assert_eq!(
            chain.evaluate(&item("post", "publish"), &definition),
            IndexingDecision::Include
        );
    }

    #[test]
    fn policy_falls_back_to_global_types_without_ignored_ones() {
        let policy = CriteriaPolicy {
            indexable_content_types: vec!["post".into(), "revision".into(), "product".into()],
            ..CriteriaPolicy::default()
        };
        assert_eq!(
            policy.content_types_for(&index(&[])),
            vec!["post".to_string(), "product".to_string()]
        );
        assert_eq!(
            policy.content_types_for(&index(&["page"])),
            vec!["page".to_string()]
        );
    }
}
