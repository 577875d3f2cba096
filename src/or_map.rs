//! Observed-Remove Map (OR-Map) CRDT implementation.
//!
//! `ORMap<V>` is a conflict-free replicated data type that acts as a multimap:
//! each key holds a set of values, where each value instance is tracked by a
//! unique tag. Concurrent additions and removals are resolved with **add-wins**
//! semantics: if one node removes a value while another concurrently adds it
//! (with a different tag), the add survives after merge.
//!
//! # Storage model
//!
//! Internally, records are stored in a nested map:
//! `HashMap<String, HashMap<String, ORMapRecord<V>>>` (key -> tag -> record).
//! Removals place tags into a tombstone set (`HashSet<String>`). During merge,
//! the union of items minus the union of tombstones yields the converged state.
//!
//! # `MerkleTree` integration
//!
//! Every mutation to a key recomputes a deterministic entry hash from all active
//! records for that key and updates the internal [`ORMapMerkleTree`]. This enables
//! efficient delta synchronization between replicas.
//!
//! # TTL (Time-To-Live)
//!
//! Records can carry an optional TTL in milliseconds. A record is expired once
//! `timestamp.millis + ttl_ms <= now`. Expired records are filtered from
//! [`ORMap::get`] and [`ORMap::get_records`] but remain in storage until
//! explicitly removed or pruned.

use std::collections::{HashMap, HashSet};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::hash::fnv1a_hash;
use crate::hlc::{MergeKeyResult, ORMapRecord, Timestamp, HLC};
use crate::merkle::ORMapMerkleTree;
use crate::traits::{StructuralEq, ValueEq};
use crate::value::Stringify;

/// An Observed-Remove Map providing conflict-free convergence with add-wins semantics.
///
/// Keys are [`String`]s. Values are generic over `V` with bounds
/// `Clone + Serialize + DeserializeOwned + PartialEq + Stringify`.
///
/// # Examples
///
/// ```
/// use lattice_kv::hlc::{HLC, SystemClock};
/// use lattice_kv::or_map::ORMap;
/// use lattice_kv::Value;
///
/// let hlc = HLC::new("node-1".to_string(), Box::new(SystemClock));
/// let mut map: ORMap<Value> = ORMap::new(hlc);
///
/// map.add("user:1", Value::String("Alice".to_string()), None).unwrap();
/// let values = map.get("user:1");
/// assert_eq!(values.len(), 1);
/// ```
pub struct ORMap<V> {
    /// Key -> Tag -> Record. Stores all active (non-tombstoned) records.
    items: HashMap<String, HashMap<String, ORMapRecord<V>>>,
    /// Set of removed tags (tombstones).
    tombstones: HashSet<String>,
    /// Hybrid Logical Clock for timestamp/tag generation and causality tracking.
    hlc: HLC,
    /// Merkle tree for efficient delta synchronization.
    merkle_tree: ORMapMerkleTree,
    /// Value-equality hook used by [`ORMap::remove`] (spec.md §9).
    value_eq: Box<dyn ValueEq<V>>,
}

impl<V> ORMap<V>
where
    V: Clone + Serialize + DeserializeOwned + PartialEq + Stringify,
{
    /// Creates a new empty `ORMap` with the given HLC instance, using
    /// structural (`PartialEq`) value equality for [`ORMap::remove`].
    ///
    /// The HLC is used for timestamp and tag generation on [`add`](ORMap::add),
    /// causality tracking on [`merge`](ORMap::merge), and TTL expiry checks
    /// via its clock source.
    #[must_use]
    pub fn new(hlc: HLC) -> Self {
        Self::with_value_eq(hlc, Box::new(StructuralEq))
    }

    /// Creates a new empty `ORMap` with a caller-supplied [`ValueEq`] hook,
    /// for values where `PartialEq` is not a faithful notion of sameness
    /// (spec.md §9).
    #[must_use]
    pub fn with_value_eq(hlc: HLC, value_eq: Box<dyn ValueEq<V>>) -> Self {
        Self {
            items: HashMap::new(),
            tombstones: HashSet::new(),
            hlc,
            merkle_tree: ORMapMerkleTree::new(ORMapMerkleTree::default_depth()),
            value_eq,
        }
    }

    /// Adds a value to the set associated with the key.
    ///
    /// Generates a unique tag from the HLC timestamp (`"millis:counter:nodeId"` format).
    /// Returns a clone of the stored record.
    ///
    /// `ttl_ms`, if given, must be strictly positive; otherwise this returns
    /// [`CoreError::InvalidTtl`].
    pub fn add(
        &mut self,
        key: impl Into<String>,
        value: V,
        ttl_ms: Option<i64>,
    ) -> CoreResult<ORMapRecord<V>> {
        let ttl_ms = validate_ttl(ttl_ms)?;
        let key = key.into();
        let timestamp = self.hlc.now()?;
        let tag = HLC::to_string(&timestamp);

        let record = ORMapRecord {
            value,
            timestamp,
            tag,
            ttl_ms,
        };

        let key_map = self.items.entry(key.clone()).or_default();
        key_map.insert(record.tag.clone(), record.clone());

        self.update_merkle(&key);
        Ok(record)
    }

    /// Removes a specific value from the set associated with the key.
    ///
    /// Tombstones all currently observed tags whose value is equal to
    /// `value` under this map's [`ValueEq`] hook. Returns the list of tags
    /// that were removed.
    pub fn remove(&mut self, key: &str, value: &V) -> Vec<String> {
        let Some(key_map) = self.items.get_mut(key) else {
            return Vec::new();
        };

        // Find all tags with matching value
        let tags_to_remove: Vec<String> = key_map
            .iter()
            .filter(|(_, record)| self.value_eq.values_equal(&record.value, value))
            .map(|(tag, _)| tag.clone())
            .collect();

        // Tombstone and remove matching records
        for tag in &tags_to_remove {
            self.tombstones.insert(tag.clone());
            key_map.remove(tag);
        }

        // Clean up empty key maps
        if key_map.is_empty() {
            self.items.remove(key);
        }

        self.update_merkle(key);
        tags_to_remove
    }

    /// Returns all active values for a key.
    ///
    /// Filters out tombstoned and TTL-expired records. Returns references to
    /// the stored values.
    #[must_use]
    pub fn get(&self, key: &str) -> Vec<&V> {
        let Some(key_map) = self.items.get(key) else {
            return Vec::new();
        };

        let now = self.hlc.clock_source().now();
        let mut values = Vec::new();

        for (tag, record) in key_map {
            // Defensive: skip tombstoned tags (should not be in items, but be safe)
            if self.tombstones.contains(tag) {
                continue;
            }
            if is_expired(record, now) {
                continue;
            }
            values.push(&record.value);
        }

        values
    }

    /// Returns all active records for a key.
    ///
    /// Filters out tombstoned and TTL-expired records. Useful for persistence
    /// and synchronization.
    #[must_use]
    pub fn get_records(&self, key: &str) -> Vec<&ORMapRecord<V>> {
        let Some(key_map) = self.items.get(key) else {
            return Vec::new();
        };

        let now = self.hlc.clock_source().now();
        let mut records = Vec::new();

        for (tag, record) in key_map {
            // Defensive: skip tombstoned tags
            if self.tombstones.contains(tag) {
                continue;
            }
            if is_expired(record, now) {
                continue;
            }
            records.push(record);
        }

        records
    }

    /// Applies a record from a remote source.
    ///
    /// Returns `false` if the record's tag is already tombstoned (record rejected).
    /// Returns `true` if the record was applied. Always calls `hlc.update()` on
    /// the record's timestamp to maintain causality, ignoring overflow/drift
    /// errors (causality tracking must never block an apply).
    pub fn apply(&mut self, key: impl Into<String>, record: ORMapRecord<V>) -> bool {
        if self.tombstones.contains(&record.tag) {
            return false;
        }

        let key = key.into();

        let _ = self.hlc.update(&record.timestamp);

        let key_map = self.items.entry(key.clone()).or_default();
        key_map.insert(record.tag.clone(), record);

        self.update_merkle(&key);
        true
    }

    /// Applies a tombstone (deletion) from a remote source.
    ///
    /// Adds the tag to the tombstone set and removes the matching record from
    /// items if present. Updates the Merkle tree for the affected key.
    pub fn apply_tombstone(&mut self, tag: &str) {
        self.tombstones.insert(tag.to_string());

        // Find and remove matching record from items
        let mut affected_key: Option<String> = None;
        for (key, key_map) in &mut self.items {
            if key_map.remove(tag).is_some() {
                affected_key = Some(key.clone());
                break; // Tag is globally unique
            }
        }

        if let Some(key) = affected_key {
            if self.items.get(&key).is_some_and(HashMap::is_empty) {
                self.items.remove(&key);
            }
            self.update_merkle(&key);
        }
    }

    /// Merges state from another `ORMap`.
    ///
    /// Implements observed-remove semantics: union of items minus union of
    /// tombstones. Updates the HLC with each remote record's timestamp to
    /// maintain causality.
    pub fn merge(&mut self, other: &ORMap<V>) {
        let mut changed_keys: HashSet<String> = HashSet::new();

        // 1. Merge tombstones
        for tag in &other.tombstones {
            self.tombstones.insert(tag.clone());
        }

        // 2. Merge items
        for (key, other_key_map) in &other.items {
            let local_key_map = self.items.entry(key.clone()).or_default();

            for (tag, record) in other_key_map {
                // Only accept if not tombstoned
                if !self.tombstones.contains(tag) && !local_key_map.contains_key(tag) {
                    local_key_map.insert(tag.clone(), record.clone());
                    changed_keys.insert(key.clone());
                }
                // Always update causality
                let _ = self.hlc.update(&record.timestamp);
            }
        }

        // 3. Cleanup: remove any local items that are now tombstoned
        let keys: Vec<String> = self.items.keys().cloned().collect();
        for key in keys {
            if let Some(key_map) = self.items.get_mut(&key) {
                let tombstoned_tags: Vec<String> = key_map
                    .keys()
                    .filter(|tag| self.tombstones.contains(*tag))
                    .cloned()
                    .collect();

                for tag in tombstoned_tags {
                    key_map.remove(&tag);
                    changed_keys.insert(key.clone());
                }

                if key_map.is_empty() {
                    self.items.remove(&key);
                }
            }
        }

        // Update Merkle tree for changed keys
        for key in &changed_keys {
            self.update_merkle(key);
        }
    }

    /// Merges remote records for a specific key into local state.
    ///
    /// Implements observed-remove CRDT semantics for per-key Merkle synchronization.
    /// Applies tombstones first, then merges remote records (skipping tombstoned tags,
    /// adding new records, updating existing records if remote timestamp is newer).
    ///
    /// Returns a [`MergeKeyResult`] with counts of added and updated records.
    pub fn merge_key(
        &mut self,
        key: impl Into<String>,
        remote_records: Vec<ORMapRecord<V>>,
        remote_tombstones: &[String],
    ) -> MergeKeyResult {
        let key = key.into();
        let mut added: usize = 0;
        let mut updated: usize = 0;

        // 1. Apply remote tombstones
        for tag in remote_tombstones {
            self.tombstones.insert(tag.clone());
        }

        // 2. Get or create local key map
        let local_key_map = self.items.entry(key.clone()).or_default();

        // 3. Remove any local records that are now tombstoned
        let tombstoned_local: Vec<String> = local_key_map
            .keys()
            .filter(|tag| self.tombstones.contains(*tag))
            .cloned()
            .collect();
        for tag in tombstoned_local {
            local_key_map.remove(&tag);
        }

        // 4. Merge remote records
        for remote_record in remote_records {
            // Skip if tombstoned
            if self.tombstones.contains(&remote_record.tag) {
                // Still update causality
                let _ = self.hlc.update(&remote_record.timestamp);
                continue;
            }

            if let Some(local_record) = local_key_map.get(&remote_record.tag) {
                // Existing record: update if remote is newer
                if remote_record.timestamp > local_record.timestamp {
                    local_key_map.insert(remote_record.tag.clone(), remote_record.clone());
                    updated += 1;
                }
            } else {
                // New record: add it
                local_key_map.insert(remote_record.tag.clone(), remote_record.clone());
                added += 1;
            }

            // Always update causality
            let _ = self.hlc.update(&remote_record.timestamp);
        }

        // 5. Cleanup empty key map
        if local_key_map.is_empty() {
            self.items.remove(&key);
        }

        // 6. Update Merkle tree
        self.update_merkle(&key);

        MergeKeyResult { added, updated }
    }

    /// Prunes tombstones older than the given timestamp.
    ///
    /// Parses each tag as a timestamp string (`"millis:counter:nodeId"`) and removes
    /// it from the tombstone set if it is older than `older_than`. Tags that fail to
    /// parse are silently skipped (spec.md §7). Returns the tags that were pruned.
    pub fn prune(&mut self, older_than: &Timestamp) -> Vec<String> {
        let mut removed_tags = Vec::new();

        let to_remove: Vec<String> = self
            .tombstones
            .iter()
            .filter(|tag| {
                if let Ok(ts) = HLC::parse(tag) {
                    ts < *older_than
                } else {
                    false
                }
            })
            .cloned()
            .collect();

        for tag in to_remove {
            self.tombstones.remove(&tag);
            removed_tags.push(tag);
        }

        removed_tags
    }

    /// Clears all data, tombstones, and resets the Merkle tree.
    pub fn clear(&mut self) {
        self.items.clear();
        self.tombstones.clear();
        self.merkle_tree = ORMapMerkleTree::new(ORMapMerkleTree::default_depth());
    }

    /// Returns all keys that have active records.
    #[must_use]
    pub fn all_keys(&self) -> Vec<&String> {
        self.items.keys().collect()
    }

    /// Returns all tombstone tags.
    #[must_use]
    pub fn get_tombstones(&self) -> Vec<&String> {
        self.tombstones.iter().collect()
    }

    /// Checks if a tag is in the tombstone set.
    #[must_use]
    pub fn is_tombstoned(&self, tag: &str) -> bool {
        self.tombstones.contains(tag)
    }

    /// Returns a read-only reference to the internal [`ORMapMerkleTree`].
    #[must_use]
    pub fn merkle_tree(&self) -> &ORMapMerkleTree {
        &self.merkle_tree
    }

    // ---- Internal helpers ----

    /// Recomputes the Merkle tree entry for a key based on its current records.
    ///
    /// If the key has no records, the key is removed from the Merkle tree.
    /// Otherwise, the entry hash is recomputed and updated.
    fn update_merkle(&mut self, key: &str) {
        match self.items.get(key) {
            Some(key_map) if !key_map.is_empty() => {
                let entry_hash = Self::hash_entry(key, key_map);
                self.merkle_tree.update(key, entry_hash);
            }
            _ => {
                self.merkle_tree.remove(key);
            }
        }
    }

    /// Computes a deterministic hash for all records under a key (spec.md
    /// §4.4 "OR" entry hash): `"key:"+key`, then for each tag in **sorted
    /// order**, `tag + ":" + stringify(value) + ":" + timestamp.toString +
    /// (":ttl="+ttl_ms)?`, joined by `"|"`.
    fn hash_entry(key: &str, records: &HashMap<String, ORMapRecord<V>>) -> u32 {
        // Sort records by tag for deterministic ordering
        let mut sorted_tags: Vec<&String> = records.keys().collect();
        sorted_tags.sort();

        let mut parts = Vec::with_capacity(sorted_tags.len() + 1);
        parts.push(format!("key:{key}"));

        for tag in sorted_tags {
            let record = &records[tag];
            let value_str = record.value.stringify();

            let mut record_str = format!("{tag}:{value_str}:{}", record.timestamp);
            if let Some(ttl) = record.ttl_ms {
                use std::fmt::Write;
                let _ = write!(record_str, ":ttl={ttl}");
            }
            parts.push(record_str);
        }

        fnv1a_hash(&parts.join("|"))
    }
}

fn is_expired<V>(record: &ORMapRecord<V>, now: u64) -> bool {
    record
        .ttl_ms
        .is_some_and(|ttl| record.timestamp.millis + ttl <= now)
}

fn validate_ttl(ttl_ms: Option<i64>) -> CoreResult<Option<u64>> {
    match ttl_ms {
        None => Ok(None),
        Some(ms) if ms > 0 => Ok(Some(ms as u64)),
        Some(ms) => Err(CoreError::InvalidTtl { ttl_ms: ms }),
    }
}


/// Property-based tests using `proptest` for ORMap CRDT correctness verification.
#[cfg(test)]
mod proptests {
    use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::hlc::ClockSource;
    use crate::Value;

    /// Deterministic clock source for proptest.
    struct FixedClock {
        time: Arc<AtomicU64>,
    }

    impl FixedClock {
        fn new(initial: u64) -> (Self, Arc<AtomicU64>) {
            let time = Arc::new(AtomicU64::new(initial));
            (Self { time: time.clone() }, time)
        }
    }

    impl ClockSource for FixedClock {
        fn now(&self) -> u64 {
            self.time.load(AtomicOrdering::Relaxed)
        }
    }

    /// Creates an `ORMap<Value>` with a high fixed clock to avoid drift errors.
    fn make_proptest_map(node_id: &str) -> ORMap<Value> {
        let (clock, _) = FixedClock::new(u64::MAX / 2);
        let hlc = HLC::new(node_id.to_string(), Box::new(clock));
        ORMap::new(hlc)
    }

    /// Strategy for generating arbitrary `Value` variants (non-recursive for simplicity).
    fn arb_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            "[a-zA-Z0-9 ]{0,20}".prop_map(|s| Value::String(s)),
        ]
    }

    /// Strategy for generating a key string.
    fn arb_key() -> impl Strategy<Value = String> {
        "[a-z]{1,4}"
    }

    /// ORMap operation to apply to a replica.
    #[derive(Debug, Clone)]
    enum OrMapOp {
        Add(String, Value),
        Remove(String, Value),
    }

    /// Strategy for generating a sequence of ORMap operations.
    fn arb_ops(max_ops: usize) -> impl Strategy<Value = Vec<OrMapOp>> {
        proptest::collection::vec(
            prop_oneof![
                (arb_key(), arb_value()).prop_map(|(k, v)| OrMapOp::Add(k, v)),
                (arb_key(), arb_value()).prop_map(|(k, v)| OrMapOp::Remove(k, v)),
            ],
            1..=max_ops,
        )
    }

    /// Apply operations to an ORMap. Returns tags/tombstones produced.
    fn apply_ops(map: &mut ORMap<Value>, ops: &[OrMapOp]) {
        for op in ops {
            match op {
                OrMapOp::Add(key, value) => {
                    let _ = map.add(key.clone(), value.clone(), None);
                }
                OrMapOp::Remove(key, value) => {
                    map.remove(key, value);
                }
            }
        }
    }

    /// Collect all records and tombstones from an ORMap for merging into another.
    fn collect_state(map: &ORMap<Value>) -> (Vec<(String, ORMapRecord<Value>)>, Vec<String>) {
        let mut records = Vec::new();
        for key in map.all_keys() {
            if let Some(key_map) = map.items.get(key) {
                for (_, record) in key_map {
                    records.push((key.clone(), record.clone()));
                }
            }
        }
        let tombstones: Vec<String> = map.tombstones.iter().cloned().collect();
        (records, tombstones)
    }

    /// Get a deterministic sorted snapshot of all active values across all keys.
    fn snapshot(map: &ORMap<Value>) -> Vec<(String, Vec<String>)> {
        let mut result: Vec<(String, Vec<String>)> = Vec::new();
        let mut keys: Vec<&String> = map.all_keys();
        keys.sort();

        for key in keys {
            let mut vals: Vec<String> = map
                .get(key)
                .iter()
                .map(|v| format!("{v:?}"))
                .collect();
            vals.sort();
            result.push((key.clone(), vals));
        }
        result
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(30))]

        /// Convergence: N replicas receiving the same operations in different orders
        /// converge to identical state after full-map merge.
        /// This is the core CRDT property for ORMap.
        #[test]
        fn ormap_convergence_n_replicas(
            ops in arb_ops(6),
        ) {
            // Create 3 replicas
            let mut replica_a = make_proptest_map("node-A");
            let mut replica_b = make_proptest_map("node-B");
            let mut replica_c = make_proptest_map("node-C");

            // Each replica applies the same operations
            apply_ops(&mut replica_a, &ops);
            apply_ops(&mut replica_b, &ops);
            apply_ops(&mut replica_c, &ops);

            // After applying same ops independently, each replica has identical state
            // (same node starts, same clock, same ops => same tags and tombstones)
            // Now simulate cross-replica merge in different orders:

            // Create "convergence" replicas that receive all state
            let mut conv_ab = make_proptest_map("conv-AB");
            let mut conv_ba = make_proptest_map("conv-BA");

            // Merge A's state then B's state into conv_ab
            let (a_records, a_tombstones) = collect_state(&replica_a);
            let (b_records, b_tombstones) = collect_state(&replica_b);

            for (key, record) in &a_records {
                conv_ab.apply(key.clone(), record.clone());
            }
            for tag in &a_tombstones {
                conv_ab.apply_tombstone(tag);
            }
            for (key, record) in &b_records {
                conv_ab.apply(key.clone(), record.clone());
            }
            for tag in &b_tombstones {
                conv_ab.apply_tombstone(tag);
            }

            // Merge B's state then A's state into conv_ba (reverse order)
            for (key, record) in &b_records {
                conv_ba.apply(key.clone(), record.clone());
            }
            for tag in &b_tombstones {
                conv_ba.apply_tombstone(tag);
            }
            for (key, record) in &a_records {
                conv_ba.apply(key.clone(), record.clone());
            }
            for tag in &a_tombstones {
                conv_ba.apply_tombstone(tag);
            }

            // Both convergence replicas should have identical visible state
            let snap_ab = snapshot(&conv_ab);
            let snap_ba = snapshot(&conv_ba);
            prop_assert_eq!(
                snap_ab,
                snap_ba,
                "Convergence failed: merge order should not matter"
            );
        }

        /// Commutativity: merge(A, B) == merge(B, A) for any two ORMaps.
        #[test]
        fn ormap_merge_commutative(
            ops_a in arb_ops(4),
            ops_b in arb_ops(4),
        ) {
            let mut map_a = make_proptest_map("node-A");
            let mut map_b = make_proptest_map("node-B");

            apply_ops(&mut map_a, &ops_a);
            apply_ops(&mut map_b, &ops_b);

            // Order 1: merge B into A
            let mut merged_ab = make_proptest_map("node-AB");
            // First copy A's state
            let (a_records, a_tombstones) = collect_state(&map_a);
            for (key, record) in &a_records {
                merged_ab.apply(key.clone(), record.clone());
            }
            for tag in &a_tombstones {
                merged_ab.apply_tombstone(tag);
            }
            // Then merge B
            let (b_records, b_tombstones) = collect_state(&map_b);
            for (key, record) in &b_records {
                merged_ab.apply(key.clone(), record.clone());
            }
            for tag in &b_tombstones {
                merged_ab.apply_tombstone(tag);
            }

            // Order 2: merge A into B
            let mut merged_ba = make_proptest_map("node-BA");
            for (key, record) in &b_records {
                merged_ba.apply(key.clone(), record.clone());
            }
            for tag in &b_tombstones {
                merged_ba.apply_tombstone(tag);
            }
            for (key, record) in &a_records {
                merged_ba.apply(key.clone(), record.clone());
            }
            for tag in &a_tombstones {
                merged_ba.apply_tombstone(tag);
            }

            let snap_ab = snapshot(&merged_ab);
            let snap_ba = snapshot(&merged_ba);
            prop_assert_eq!(snap_ab, snap_ba, "Merge should be commutative");
        }

        /// Idempotence: merging the same state twice does not change the result.
        #[test]
        fn ormap_merge_idempotent(
            ops in arb_ops(5),
        ) {
            let mut source = make_proptest_map("node-src");
            apply_ops(&mut source, &ops);

            let mut target = make_proptest_map("node-tgt");

            // Merge source into target
            let (records, tombstones) = collect_state(&source);
            for (key, record) in &records {
                target.apply(key.clone(), record.clone());
            }
            for tag in &tombstones {
                target.apply_tombstone(tag);
            }

            let snap_first = snapshot(&target);

            // Merge source into target AGAIN
            for (key, record) in &records {
                target.apply(key.clone(), record.clone());
            }
            for tag in &tombstones {
                target.apply_tombstone(tag);
            }

            let snap_second = snapshot(&target);
            prop_assert_eq!(snap_first, snap_second, "Merge should be idempotent");
        }

        /// `ORMapRecord<Value>` round-trip through MsgPack preserves data.
        #[test]
        fn ormap_record_msgpack_roundtrip(
            value in arb_value(),
            millis in 1_u64..1_000_000_000_u64,
            counter in 0_u32..1000_u32,
            node_id in "[a-z]{1,8}",
        ) {
            let record = ORMapRecord {
                value,
                timestamp: Timestamp { millis, counter, node_id: node_id.clone() },
                tag: format!("{millis}:{counter}:{node_id}"),
                ttl_ms: None,
            };

            let bytes = rmp_serde::to_vec(&record).expect("serialize ORMapRecord<Value>");
            let decoded: ORMapRecord<Value> =
                rmp_serde::from_slice(&bytes).expect("deserialize ORMapRecord<Value>");
            prop_assert_eq!(record, decoded);
        }
    }
}
