//! Index contract and implementations (spec.md §4.5): `HashIndex`,
//! `NavigableIndex`, `InvertedIndex`, `QuantizedNavigableIndex`, and the
//! `IndexRegistry` that dispatches queries to the cheapest matching index.

pub mod hash_index;
pub mod inverted_index;
pub mod navigable_index;
pub mod quantized_index;
pub mod registry;
pub mod tokenize;

pub use hash_index::HashIndex;
pub use inverted_index::InvertedIndex;
pub use navigable_index::NavigableIndex;
pub use quantized_index::{Quantizer, QuantizedNavigableIndex};
pub use registry::IndexRegistry;

use crate::predicate::{Op, Operand};
use crate::result_set::ResultSet;
use crate::value::Value;

/// One of the three index families named in spec.md §4.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Hash,
    Navigable,
    Inverted,
}

impl IndexKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Hash => "hash",
            IndexKind::Navigable => "navigable",
            IndexKind::Inverted => "inverted",
        }
    }
}

/// `{distinctValues, totalEntries, avgEntriesPerValue}` (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexStats {
    pub distinct_values: usize,
    pub total_entries: usize,
    pub avg_entries_per_value: f64,
}

impl IndexStats {
    #[must_use]
    pub fn compute(distinct_values: usize, total_entries: usize) -> Self {
        let avg_entries_per_value =
            if distinct_values == 0 { 0.0 } else { total_entries as f64 / distinct_values as f64 };
        Self { distinct_values, total_entries, avg_entries_per_value }
    }
}

/// The shared index contract every index kind implements (spec.md §4.5's
/// member table). `add`/`update`/`remove` are the record lifecycle hooks the
/// `IndexRegistry` fans out to on every map mutation.
pub trait Index: Send + Sync {
    /// One of `"hash" | "navigable" | "inverted"`.
    fn kind(&self) -> IndexKind;
    /// The attribute name this index is built over.
    fn attribute(&self) -> &str;
    /// Whether this index can answer a query using operator `op`.
    fn supports_query(&self, op: Op) -> bool;
    /// Constant retrieval cost used by the planner's cost model.
    fn retrieval_cost(&self) -> u32;
    /// Indexes `record` under `key`. Idempotent w.r.t. the same
    /// `(key, attrValue)` pair.
    fn add(&mut self, key: &str, record: &Value);
    /// Removes `old`'s attribute values for `key` and adds `new`'s. A no-op
    /// if the attribute value is unchanged.
    fn update(&mut self, key: &str, old: &Value, new: &Value);
    /// Reverses `add`; cleans up now-empty buckets.
    fn remove(&mut self, key: &str, record: &Value);
    /// Drops all indexed state.
    fn clear(&mut self);
    /// Returns the keys matching a single predicate leaf.
    fn retrieve(&self, op: Op, operand: &Operand) -> ResultSet;
    /// `{distinctValues, totalEntries, avgEntriesPerValue}`.
    fn stats(&self) -> IndexStats;
}
