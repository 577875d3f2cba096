//! `AutoIndexManager` (spec.md §4.8): watches per-`(attribute, op)` query
//! counters and auto-creates an index once a threshold is crossed, subject
//! to a total-index cap.

use std::collections::HashMap;

use crate::attribute::Attribute;
use crate::index::tokenize::TokenizationPipeline;
use crate::index::{HashIndex, Index, IndexKind, IndexRegistry, InvertedIndex, NavigableIndex};
use crate::predicate::Op;

use super::advisor::index_kind_for_op;
use super::pattern_tracker::QueryPatternTracker;

/// Builds a fresh `Box<dyn Attribute>` for an attribute registered with
/// [`AutoIndexManager::register_attribute`]. `Attribute` is not `Clone`, so a
/// factory closure is how a new instance gets constructed on demand.
pub type AttributeFactory = Box<dyn Fn() -> Box<dyn Attribute> + Send + Sync>;

/// Options controlling [`AutoIndexManager`] behavior.
#[derive(Debug, Clone, Copy)]
pub struct AutoIndexOptions {
    /// Number of queries on `(attribute, op)` before an index is created.
    pub threshold: u64,
    /// Never auto-create past this many total registered indexes.
    pub max_indexes: usize,
}

impl Default for AutoIndexOptions {
    fn default() -> Self {
        Self { threshold: 100, max_indexes: 50 }
    }
}

/// Watches query traffic on pre-registered attributes and auto-creates
/// indexes in `registry` once traffic crosses `threshold`.
pub struct AutoIndexManager {
    options: AutoIndexOptions,
    factories: HashMap<String, AttributeFactory>,
    counters: HashMap<(String, Op), u64>,
    created: HashMap<String, IndexKind>,
    on_index_created: Option<Box<dyn Fn(&str, IndexKind) + Send + Sync>>,
}

impl AutoIndexManager {
    #[must_use]
    pub fn new(options: AutoIndexOptions) -> Self {
        Self {
            options,
            factories: HashMap::new(),
            counters: HashMap::new(),
            created: HashMap::new(),
            on_index_created: None,
        }
    }

    /// Registers `attribute` as eligible for auto-indexing, with a factory
    /// producing the `Attribute` extractor each time an index is created.
    pub fn register_attribute(&mut self, attribute: &str, factory: AttributeFactory) {
        self.factories.insert(attribute.to_string(), factory);
    }

    /// Sets the hook fired after an index is auto-created.
    pub fn on_index_created(&mut self, hook: impl Fn(&str, IndexKind) + Send + Sync + 'static) {
        self.on_index_created = Some(Box::new(hook));
    }

    /// Call on every executed leaf query; may create an index in `registry`
    /// and reports the creation back to `tracker`.
    pub fn record_query(&mut self, attribute: &str, op: Op, registry: &mut IndexRegistry, tracker: &mut QueryPatternTracker) {
        if self.created.contains_key(attribute) {
            return;
        }
        let Some(kind) = index_kind_for_op(op) else { return };
        let count = self.counters.entry((attribute.to_string(), op)).or_insert(0);
        *count += 1;
        if *count < self.options.threshold {
            return;
        }
        if registry.attributes().len() >= self.options.max_indexes {
            return;
        }
        let Some(factory) = self.factories.get(attribute) else { return };

        let index: Box<dyn Index> = match kind {
            IndexKind::Hash => Box::new(HashIndex::new(factory())),
            IndexKind::Navigable => Box::new(NavigableIndex::new(factory())),
            IndexKind::Inverted => Box::new(InvertedIndex::new(factory(), TokenizationPipeline::search())),
        };
        registry.register(index);
        self.created.insert(attribute.to_string(), kind);
        tracker.update_index_status(attribute, op, true);
        if let Some(hook) = &self.on_index_created {
            hook(attribute, kind);
        }
    }

    #[must_use]
    pub fn created_indexes(&self) -> &HashMap<String, IndexKind> {
        &self.created
    }
}
