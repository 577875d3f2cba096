//! `HashIndex` (spec.md §4.5.a): `attrValue -> Set<Key>`, retrieval cost 30.
//! Supports `eq`, `in`, `has`.

use std::collections::{BTreeMap, BTreeSet};

use crate::attribute::Attribute;
use crate::predicate::{Op, Operand};
use crate::result_set::ResultSet;
use crate::value::{Stringify, Value};

use super::{Index, IndexKind, IndexStats};

const RETRIEVAL_COST: u32 = 30;

/// Buckets keys by the stringified attribute value.
pub struct HashIndex {
    attribute: Box<dyn Attribute>,
    buckets: BTreeMap<String, BTreeSet<String>>,
}

impl HashIndex {
    #[must_use]
    pub fn new(attribute: Box<dyn Attribute>) -> Self {
        Self { attribute, buckets: BTreeMap::new() }
    }

    fn bucket_key(value: &Value) -> String {
        value.stringify()
    }
}

impl Index for HashIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Hash
    }

    fn attribute(&self) -> &str {
        self.attribute.name()
    }

    fn supports_query(&self, op: Op) -> bool {
        matches!(op, Op::Eq | Op::In | Op::Has)
    }

    fn retrieval_cost(&self) -> u32 {
        RETRIEVAL_COST
    }

    fn add(&mut self, key: &str, record: &Value) {
        for value in self.attribute.extract_many(record) {
            self.buckets.entry(Self::bucket_key(&value)).or_default().insert(key.to_string());
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
            let bucket_key = Self::bucket_key(&value);
            if let Some(bucket) = self.buckets.get_mut(&bucket_key) {
                bucket.remove(key);
                if bucket.is_empty() {
                    self.buckets.remove(&bucket_key);
                }
            }
        }
    }

    fn clear(&mut self) {
        self.buckets.clear();
    }

    fn retrieve(&self, op: Op, operand: &Operand) -> ResultSet {
        match (op, operand) {
            (Op::Eq, Operand::Value(v)) => ResultSet::materialized(
                self.buckets.get(&Self::bucket_key(v)).cloned().unwrap_or_default(),
            ),
            (Op::In, Operand::Values(vs)) => {
                let mut out = BTreeSet::new();
                for v in vs {
                    if let Some(bucket) = self.buckets.get(&Self::bucket_key(v)) {
                        out.extend(bucket.iter().cloned());
                    }
                }
                ResultSet::materialized(out)
            }
            (Op::Has, _) => {
                let mut out = BTreeSet::new();
                for bucket in self.buckets.values() {
                    out.extend(bucket.iter().cloned());
                }
                ResultSet::materialized(out)
            }
            _ => ResultSet::empty(),
        }
    }

    fn stats(&self) -> IndexStats {
        let total_entries: usize = self.buckets.values().map(BTreeSet::len).sum();
        IndexStats::compute(self.buckets.len(), total_entries)
    }
}
