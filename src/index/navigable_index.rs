//! `NavigableIndex` (spec.md §4.5.b): an ordered map over `attrValue`,
//! retrieval cost 40. Supports `eq`, `in`, `has`, `gt`, `gte`, `lt`, `lte`,
//! `between`. Range queries return a lazy [`ResultSet`] estimated at
//! `allKeys/2` until materialized.

use std::collections::{BTreeMap, BTreeSet};

use crate::attribute::Attribute;
use crate::predicate::{Op, Operand};
use crate::result_set::ResultSet;
use crate::value::{compare_values, Value};

use super::{Index, IndexKind, IndexStats};

const RETRIEVAL_COST: u32 = 40;

/// Sortable wrapper around [`Value`] so it can key a `BTreeMap` using the
/// sort comparator contract (spec.md §4.6 rule 5) rather than derived
/// `Ord` (which `Value` does not implement, since float/string/bool/null
/// comparisons need the contract's special-casing).
#[derive(Debug, Clone, PartialEq)]
struct SortKey(Value);

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        compare_values(&self.0, &other.0)
    }
}

/// Ordered index over an attribute's values, backed by a `BTreeMap<SortKey, _>`.
pub struct NavigableIndex {
    attribute: Box<dyn Attribute>,
    buckets: BTreeMap<SortKey, BTreeSet<String>>,
}

impl NavigableIndex {
    #[must_use]
    pub fn new(attribute: Box<dyn Attribute>) -> Self {
        Self { attribute, buckets: BTreeMap::new() }
    }

    /// The smallest indexed attribute value, if any.
    #[must_use]
    pub fn min_value(&self) -> Option<&Value> {
        self.buckets.keys().next().map(|k| &k.0)
    }

    /// The largest indexed attribute value, if any.
    #[must_use]
    pub fn max_value(&self) -> Option<&Value> {
        self.buckets.keys().next_back().map(|k| &k.0)
    }

    fn all_keys(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for bucket in self.buckets.values() {
            out.extend(bucket.iter().cloned());
        }
        out
    }

    fn keys_matching(&self, mut keep: impl FnMut(&Value) -> bool) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for (k, bucket) in &self.buckets {
            if keep(&k.0) {
                out.extend(bucket.iter().cloned());
            }
        }
        out
    }
}

impl Index for NavigableIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Navigable
    }

    fn attribute(&self) -> &str {
        self.attribute.name()
    }

    fn supports_query(&self, op: Op) -> bool {
        matches!(op, Op::Eq | Op::In | Op::Has | Op::Gt | Op::Gte | Op::Lt | Op::Lte | Op::Between)
    }

    fn retrieval_cost(&self) -> u32 {
        RETRIEVAL_COST
    }

    fn add(&mut self, key: &str, record: &Value) {
        for value in self.attribute.extract_many(record) {
            self.buckets.entry(SortKey(value)).or_default().insert(key.to_string());
        }
    }

    fn update(&mut self, key: &str, old: &Value, new: &Value) {
        let old_values = self.attribute.extract_many(old);
        let new_values = self.attribute.extract_many(new);
        if old_values == new_values {
            return;
        }
        self.remove(key, old);
        self.add(key, new);
    }

    fn remove(&mut self, key: &str, record: &Value) {
        for value in self.attribute.extract_many(record) {
            let sort_key = SortKey(value);
            if let Some(bucket) = self.buckets.get_mut(&sort_key) {
                bucket.remove(key);
                if bucket.is_empty() {
                    self.buckets.remove(&sort_key);
                }
            }
        }
    }

    fn clear(&mut self) {
        self.buckets.clear();
    }

    fn retrieve(&self, op: Op, operand: &Operand) -> ResultSet {
        match (op, operand) {
            (Op::Eq, Operand::Value(v)) => {
                ResultSet::materialized(self.buckets.get(&SortKey(v.clone())).cloned().unwrap_or_default())
            }
            (Op::In, Operand::Values(vs)) => {
                let mut out = BTreeSet::new();
                for v in vs {
                    if let Some(bucket) = self.buckets.get(&SortKey(v.clone())) {
                        out.extend(bucket.iter().cloned());
                    }
                }
                ResultSet::materialized(out)
            }
            (Op::Has, _) => ResultSet::materialized(self.all_keys()),
            (Op::Gt, Operand::Value(bound)) => {
                self.lazy_range(bound.clone(), |v, b| compare_values(v, b).is_gt())
            }
            (Op::Gte, Operand::Value(bound)) => {
                self.lazy_range(bound.clone(), |v, b| compare_values(v, b).is_ge())
            }
            (Op::Lt, Operand::Value(bound)) => {
                self.lazy_range(bound.clone(), |v, b| compare_values(v, b).is_lt())
            }
            (Op::Lte, Operand::Value(bound)) => {
                self.lazy_range(bound.clone(), |v, b| compare_values(v, b).is_le())
            }
            (Op::Between, Operand::Range { from, from_inclusive, to, to_inclusive }) => {
                let (from, to) = (from.clone(), to.clone());
                let (from_inclusive, to_inclusive) = (*from_inclusive, *to_inclusive);
                let all = self.all_keys().len();
                let estimate = (all / 2).max(usize::from(all > 0));
                let buckets: Vec<(Value, BTreeSet<String>)> =
                    self.buckets.iter().map(|(k, v)| (k.0.clone(), v.clone())).collect();
                ResultSet::lazy(estimate, move || {
                    let mut out = BTreeSet::new();
                    for (value, keys) in buckets {
                        let lower_ok = if from_inclusive {
                            compare_values(&value, &from).is_ge()
                        } else {
                            compare_values(&value, &from).is_gt()
                        };
                        let upper_ok = if to_inclusive {
                            compare_values(&value, &to).is_le()
                        } else {
                            compare_values(&value, &to).is_lt()
                        };
                        if lower_ok && upper_ok {
                            out.extend(keys);
                        }
                    }
                    out
                })
            }
            _ => ResultSet::empty(),
        }
    }

    fn stats(&self) -> IndexStats {
        let total_entries: usize = self.buckets.values().map(BTreeSet::len).sum();
        IndexStats::compute(self.buckets.len(), total_entries)
    }
}

impl NavigableIndex {
    fn lazy_range(&self, bound: Value, keep: impl Fn(&Value, &Value) -> bool + 'static) -> ResultSet {
        let all = self.all_keys().len();
        let estimate = (all / 2).max(usize::from(all > 0));
        let buckets: Vec<(Value, BTreeSet<String>)> =
            self.buckets.iter().map(|(k, v)| (k.0.clone(), v.clone())).collect();
        ResultSet::lazy(estimate, move || {
            let mut out = BTreeSet::new();
            for (value, keys) in buckets {
                if keep(&value, &bound) {
                    out.extend(keys);
                }
            }
            out
        })
    }
}
