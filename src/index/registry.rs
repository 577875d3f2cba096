//! `IndexRegistry` (spec.md §4.5.f): `attributeName -> ordered list of
//! indexes`. Dispatches record lifecycle events to every registered index
//! and finds the cheapest index able to answer a given operator.

use std::collections::HashMap;

use crate::predicate::Op;
use crate::value::Value;

use super::Index;

/// Registers indexes per attribute and routes record mutations and query
/// planning lookups to them.
#[derive(Default)]
pub struct IndexRegistry {
    by_attribute: HashMap<String, Vec<Box<dyn Index>>>,
}

impl IndexRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `index` under its own `attribute()`. A no-op if an index at
    /// the same memory address is already registered for that attribute
    /// (spec.md §4.5.f: "duplicate registration of the same index instance
    /// is a no-op").
    pub fn register(&mut self, index: Box<dyn Index>) {
        let attribute = index.attribute().to_string();
        let bucket = self.by_attribute.entry(attribute).or_default();
        let new_ptr = std::ptr::addr_of!(*index).cast::<()>();
        if bucket.iter().any(|existing| std::ptr::addr_of!(**existing).cast::<()>() == new_ptr) {
            return;
        }
        bucket.push(index);
    }

    /// Every index registered for `attribute`.
    #[must_use]
    pub fn indexes_for(&self, attribute: &str) -> &[Box<dyn Index>] {
        self.by_attribute.get(attribute).map_or(&[], Vec::as_slice)
    }

    /// The indexes registered for `attribute` that support `op`, sorted by
    /// retrieval cost ascending (spec.md §4.5.f). Empty if no index covers
    /// this attribute/op combination.
    #[must_use]
    pub fn find_best_index(&self, attribute: &str, op: Op) -> Vec<&Box<dyn Index>> {
        let mut candidates: Vec<&Box<dyn Index>> = self
            .indexes_for(attribute)
            .iter()
            .filter(|idx| idx.supports_query(op))
            .collect();
        candidates.sort_by_key(|idx| idx.retrieval_cost());
        candidates
    }

    /// The single cheapest index able to answer `op` over `attribute`, if any.
    #[must_use]
    pub fn best_index(&self, attribute: &str, op: Op) -> Option<&Box<dyn Index>> {
        self.find_best_index(attribute, op).into_iter().next()
    }

    /// Fans `add` out to every index (regardless of attribute).
    pub fn add(&mut self, key: &str, record: &Value) {
        for bucket in self.by_attribute.values_mut() {
            for index in bucket {
                index.add(key, record);
            }
        }
    }

    /// Fans `update` out to every index.
    pub fn update(&mut self, key: &str, old: &Value, new: &Value) {
        for bucket in self.by_attribute.values_mut() {
            for index in bucket {
                index.update(key, old, new);
            }
        }
    }

    /// Fans `remove` out to every index.
    pub fn remove(&mut self, key: &str, record: &Value) {
        for bucket in self.by_attribute.values_mut() {
            for index in bucket {
                index.remove(key, record);
            }
        }
    }

    /// Clears every registered index.
    pub fn clear(&mut self) {
        for bucket in self.by_attribute.values_mut() {
            for index in bucket {
                index.clear();
            }
        }
    }

    /// Every attribute name with at least one registered index.
    #[must_use]
    pub fn attributes(&self) -> Vec<&String> {
        self.by_attribute.keys().collect()
    }
}
