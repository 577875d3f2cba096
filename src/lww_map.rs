//! Last-Write-Wins Map (LWW-Map) CRDT implementation.
//!
//! `LWWMap<V>` is a conflict-free replicated data type that resolves concurrent
//! writes by always keeping the entry with the highest [`Timestamp`]. It integrates
//! with [`MerkleTree`] for efficient delta synchronization.
//!
//! # Conflict resolution
//!
//! When two records compete for the same key, the one with the greater timestamp
//! wins. Timestamp ordering is: `millis` first, then `counter`, then `node_id`
//! (lexicographic). This provides total ordering across all nodes.
//!
//! # Tombstones
//!
//! Deletions are represented as tombstones (`value: None`) with a timestamp.
//! Tombstones participate in merge conflict resolution like any other record.
//! Use [`LWWMap::prune`] to garbage-collect old tombstones.
//!
//! # TTL (Time-To-Live)
//!
//! Records can carry an optional TTL in milliseconds. A record is expired once
//! `timestamp.millis + ttl_ms <= clock.now()`. [`LWWMap::get`] and
//! [`LWWMap::entries`] filter expired records; [`LWWMap::get_record`] does not --
//! it returns the raw stored record (including tombstones and expired records),
//! since anti-entropy sync needs the unfiltered state.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::hash::fnv1a_hash;
use crate::hlc::{HLC, LWWRecord, Timestamp};
use crate::merkle::MerkleTree;
use crate::value::Stringify;

/// A Last-Write-Wins Map providing conflict-free convergence.
///
/// Keys are [`String`]s. Values are generic over `V` with bounds
/// `Clone + Serialize + DeserializeOwned + PartialEq + Stringify`.
///
/// # Examples
///
/// ```
/// use lattice_kv::hlc::{HLC, SystemClock};
/// use lattice_kv::lww_map::LWWMap;
/// use lattice_kv::Value;
///
/// let hlc = HLC::new("node-1".to_string(), Box::new(SystemClock));
/// let mut map: LWWMap<Value> = LWWMap::new(hlc);
///
/// map.set("user:1", Value::String("Alice".to_string()), None).unwrap();
/// assert_eq!(map.get("user:1"), Some(&Value::String("Alice".to_string())));
/// ```
pub struct LWWMap<V> {
    data: HashMap<String, LWWRecord<V>>,
    hlc: HLC,
    merkle_tree: MerkleTree,
}

impl<V> LWWMap<V>
where
    V: Clone + Serialize + DeserializeOwned + PartialEq + Stringify,
{
    /// Creates a new empty `LWWMap` with the given HLC instance.
    ///
    /// The HLC is used for timestamp generation on `set()` and `remove()`,
    /// causality tracking on `merge()`, and TTL expiry checks via its clock source.
    #[must_use]
    pub fn new(hlc: HLC) -> Self {
        Self {
            data: HashMap::new(),
            hlc,
            merkle_tree: MerkleTree::new(MerkleTree::default_depth()),
        }
    }

    /// Stores a value with a new HLC timestamp.
    ///
    /// Generates a fresh timestamp from the internal HLC, stores the record,
    /// and updates the `MerkleTree`. Returns a clone of the stored record.
    ///
    /// `ttl_ms`, if given, must be strictly positive; otherwise this returns
    /// [`CoreError::InvalidTtl`]. Fails with [`CoreError::ClockOverflow`] if
    /// the HLC's logical counter has been exhausted for the current
    /// millisecond.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: V,
        ttl_ms: Option<i64>,
    ) -> CoreResult<LWWRecord<V>> {
        let ttl_ms = validate_ttl(ttl_ms)?;
        let key = key.into();
        let timestamp = self.hlc.now()?;
        let record = LWWRecord {
            value: Some(value),
            timestamp,
            ttl_ms,
        };
        self.data.insert(key.clone(), record.clone());
        self.update_merkle(&key, &record);
        Ok(record)
    }

    /// Returns the value for a key, filtering tombstones and expired records.
    ///
    /// Returns `None` if:
    /// - The key does not exist
    /// - The record is a tombstone (value is `None`)
    /// - The record's TTL has expired (`timestamp.millis + ttl_ms <= now`)
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        let record = self.data.get(key)?;
        let value = record.value.as_ref()?;
        if self.is_expired(record) {
            return None;
        }
        Some(value)
    }

    /// Returns the full record for a key, including timestamp and tombstone state.
    ///
    /// Unlike [`get`](LWWMap::get), this does not filter tombstones or expired
    /// records: it always returns the record exactly as stored, which is what
    /// anti-entropy sync needs to compare against a remote replica.
    #[must_use]
    pub fn get_record(&self, key: &str) -> Option<&LWWRecord<V>> {
        self.data.get(key)
    }

    /// Creates a tombstone for a key with a new HLC timestamp.
    ///
    /// Always creates and stores a tombstone even if the key does not exist,
    /// matching TypeScript behavior where tombstones are created regardless of
    /// prior existence. Returns a clone of the tombstone record.
    pub fn remove(&mut self, key: &str) -> CoreResult<LWWRecord<V>> {
        let timestamp = self.hlc.now()?;
        let tombstone = LWWRecord {
            value: None,
            timestamp,
            ttl_ms: None,
        };
        self.data.insert(key.to_string(), tombstone.clone());
        self.update_merkle(key, &tombstone);
        Ok(tombstone)
    }

    /// Merges a remote record, returning `true` if local state changed.
    ///
    /// Always updates the HLC with the remote timestamp to maintain causality
    /// (silently ignoring drift/overflow errors, matching TypeScript
    /// behavior: causality tracking must never block a merge).
    ///
    /// Merge logic: accept remote if no local record exists OR if the remote
    /// timestamp is strictly greater than the local timestamp. Equal
    /// timestamps leave the local record intact.
    pub fn merge(&mut self, key: impl Into<String>, remote_record: LWWRecord<V>) -> bool {
        let _ = self.hlc.update(&remote_record.timestamp);

        let key = key.into();
        let should_accept = match self.data.get(&key) {
            None => true,
            Some(local) => remote_record.timestamp > local.timestamp,
        };

        if should_accept {
            self.update_merkle(&key, &remote_record);
            self.data.insert(key, remote_record);
            true
        } else {
            false
        }
    }

    /// Removes tombstones older than the given threshold.
    ///
    /// Only tombstones (records with `value: None`) whose timestamp is strictly
    /// less than `older_than` are removed. Non-tombstone records are never pruned.
    /// Returns the list of pruned keys.
    pub fn prune(&mut self, older_than: &Timestamp) -> Vec<String> {
        let pruned_keys: Vec<String> = self
            .data
            .iter()
            .filter(|(_, record)| record.value.is_none() && record.timestamp < *older_than)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &pruned_keys {
            self.data.remove(key);
            self.merkle_tree.remove(key);
        }

        pruned_keys
    }

    /// Removes all data and resets the `MerkleTree`.
    pub fn clear(&mut self) {
        self.data.clear();
        self.merkle_tree = MerkleTree::new(MerkleTree::default_depth());
    }

    /// Iterates over non-tombstone, non-expired entries.
    ///
    /// Yields `(&String, &V)` pairs for all live entries. Tombstones and
    /// TTL-expired records are skipped.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &V)> {
        self.data.iter().filter_map(move |(key, record)| {
            let value = record.value.as_ref()?;
            if self.is_expired(record) {
                return None;
            }
            Some((key, value))
        })
    }

    /// Iterates over all keys, including tombstones.
    pub fn all_keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    /// Returns the number of entries, including tombstones.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns read-only access to the internal `MerkleTree`.
    #[must_use]
    pub fn merkle_tree(&self) -> &MerkleTree {
        &self.merkle_tree
    }

    /// Checks whether a record's TTL has expired: `millis + ttl_ms <= now`.
    fn is_expired(&self, record: &LWWRecord<V>) -> bool {
        if let Some(ttl_ms) = record.ttl_ms {
            let now = self.hlc.clock_source().now();
            record.timestamp.millis + ttl_ms <= now
        } else {
            false
        }
    }

    /// Updates the `MerkleTree` entry hash for `key` (spec.md §4.4): the hash
    /// input is `stringify(key) + ":" + stringify(value) + ":" +
    /// timestamp.toString() + (":ttl=" + ttl_ms)?`, with tombstones using the
    /// literal `"null"` for the value segment.
    fn update_merkle(&mut self, key: &str, record: &LWWRecord<V>) {
        let value_repr = record
            .value
            .as_ref()
            .map(Stringify::stringify)
            .unwrap_or_else(|| "null".to_string());
        let mut hash_input = format!("{key}:{value_repr}:{}", record.timestamp);
        if let Some(ttl_ms) = record.ttl_ms {
            hash_input.push_str(&format!(":ttl={ttl_ms}"));
        }
        let item_hash = fnv1a_hash(&hash_input);
        self.merkle_tree.update(key, item_hash);
    }
}

fn validate_ttl(ttl_ms: Option<i64>) -> CoreResult<Option<u64>> {
    match ttl_ms {
        None => Ok(None),
        Some(ms) if ms > 0 => Ok(Some(ms as u64)),
        Some(ms) => Err(CoreError::InvalidTtl { ttl_ms: ms }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
    use std::sync::Arc;

    use super::*;
    use crate::hlc::ClockSource;
    use crate::Value;

    /// A deterministic clock source for testing. Time is controlled explicitly.
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

    /// Helper to create an LWWMap with a fixed clock and return the time control handle.
    fn make_map(initial_time: u64) -> (LWWMap<Value>, Arc<AtomicU64>) {
        let (clock, time) = FixedClock::new(initial_time);
        let hlc = HLC::new("test-node".to_string(), Box::new(clock));
        (LWWMap::new(hlc), time)
    }

    // ---- Basic CRUD ----

    #[test]
    fn set_and_get_basic() {
        let (mut map, _) = make_map(1_000_000);
        map.set("key1", Value::String("value1".to_string()), None).unwrap();
        assert_eq!(
            map.get("key1"),
            Some(&Value::String("value1".to_string()))
        );
    }

    #[test]
    fn get_nonexistent_key_returns_none() {
        let (map, _) = make_map(1_000_000);
        assert_eq!(map.get("missing"), None);
    }

    #[test]
    fn set_overwrites_existing_value() {
        let (mut map, _) = make_map(1_000_000);
        map.set("key1", Value::String("old".to_string()), None).unwrap();
        map.set("key1", Value::String("new".to_string()), None).unwrap();
        assert_eq!(map.get("key1"), Some(&Value::String("new".to_string())));
    }

    #[test]
    fn set_rejects_zero_ttl() {
        let (mut map, _) = make_map(1_000_000);
        let err = map.set("key1", Value::Int(1), Some(0)).unwrap_err();
        assert_eq!(err, CoreError::InvalidTtl { ttl_ms: 0 });
    }

    #[test]
    fn set_rejects_negative_ttl() {
        let (mut map, _) = make_map(1_000_000);
        let err = map.set("key1", Value::Int(1), Some(-500)).unwrap_err();
        assert_eq!(err, CoreError::InvalidTtl { ttl_ms: -500 });
    }

    #[test]
    fn get_record_returns_full_record() {
        let (mut map, _) = make_map(1_000_000);
        map.set("key1", Value::Int(42), None).unwrap();
        let record = map.get_record("key1").expect("record exists");
        assert_eq!(record.value, Some(Value::Int(42)));
        assert_eq!(record.timestamp.millis, 1_000_000);
        assert_eq!(record.timestamp.node_id, "test-node");
    }

    #[test]
    fn get_record_nonexistent_returns_none() {
        let (map, _) = make_map(1_000_000);
        assert!(map.get_record("missing").is_none());
    }

    #[test]
    fn size_counts_all_entries() {
        let (mut map, _) = make_map(1_000_000);
        assert_eq!(map.size(), 0);
        map.set("a", Value::Int(1), None).unwrap();
        assert_eq!(map.size(), 1);
        map.set("b", Value::Int(2), None).unwrap();
        assert_eq!(map.size(), 2);
    }

    // ---- Tombstone behavior ----

    #[test]
    fn remove_creates_tombstone() {
        let (mut map, _) = make_map(1_000_000);
        map.set("key1", Value::String("value1".to_string()), None).unwrap();
        map.remove("key1").unwrap();
        // get returns None for tombstones
        assert_eq!(map.get("key1"), None);
        // but the record still exists
        let record = map.get_record("key1").expect("tombstone exists");
        assert_eq!(record.value, None);
    }

    #[test]
    fn remove_nonexistent_key_creates_tombstone() {
        let (mut map, _) = make_map(1_000_000);
        // Remove a key that was never set
        let tombstone = map.remove("phantom").unwrap();
        assert_eq!(tombstone.value, None);
        // It should be stored
        let record = map.get_record("phantom").expect("tombstone exists");
        assert_eq!(record.value, None);
        assert_eq!(map.size(), 1);
    }

    #[test]
    fn size_includes_tombstones() {
        let (mut map, _) = make_map(1_000_000);
        map.set("key1", Value::Int(1), None).unwrap();
        map.set("key2", Value::Int(2), None).unwrap();
        map.remove("key1").unwrap();
        // Tombstone still counts
        assert_eq!(map.size(), 2);
    }

    // ---- TTL expiry ----

    #[test]
    fn ttl_not_expired_returns_value() {
        let (mut map, _time) = make_map(1_000_000);
        map.set("temp", Value::String("data".to_string()), Some(500)).unwrap();
        // Clock is at 1_000_000, timestamp.millis is 1_000_000, TTL is 500ms
        // Expires when millis + 500 <= now, i.e., 1_000_500 <= now
        // now is 1_000_000, not expired
        assert_eq!(
            map.get("temp"),
            Some(&Value::String("data".to_string()))
        );
    }

    #[test]
    fn ttl_expired_returns_none() {
        let (mut map, time) = make_map(1_000_000);
        map.set("temp", Value::String("data".to_string()), Some(500)).unwrap();
        // Advance clock past expiry: millis(1_000_000) + 500 <= 1_000_600
        time.store(1_000_600, AtomicOrdering::Relaxed);
        assert_eq!(map.get("temp"), None);
    }

    #[test]
    fn ttl_boundary_is_expired() {
        let (mut map, time) = make_map(1_000_000);
        map.set("temp", Value::String("data".to_string()), Some(500)).unwrap();
        // At exactly the boundary: millis(1_000_000) + 500 = 1_000_500
        // Condition is `<=`, so 1_000_500 <= 1_000_500 is true => expired
        time.store(1_000_500, AtomicOrdering::Relaxed);
        assert_eq!(map.get("temp"), None);
    }

    #[test]
    fn ttl_one_before_boundary_not_expired() {
        let (mut map, time) = make_map(1_000_000);
        map.set("temp", Value::String("data".to_string()), Some(500)).unwrap();
        time.store(1_000_499, AtomicOrdering::Relaxed);
        assert_eq!(
            map.get("temp"),
            Some(&Value::String("data".to_string()))
        );
    }

    #[test]
    fn ttl_none_never_expires() {
        let (mut map, time) = make_map(1_000_000);
        map.set("perm", Value::String("forever".to_string()), None).unwrap();
        time.store(u64::MAX, AtomicOrdering::Relaxed);
        assert_eq!(
            map.get("perm"),
            Some(&Value::String("forever".to_string()))
        );
    }

    #[test]
    fn get_record_ignores_ttl_expiry() {
        let (mut map, time) = make_map(1_000_000);
        map.set("temp", Value::Int(1), Some(10)).unwrap();
        time.store(2_000_000, AtomicOrdering::Relaxed);
        // get() filters the expired record...
        assert_eq!(map.get("temp"), None);
        // ...but get_record() still returns it, unfiltered.
        let record = map.get_record("temp").expect("record still stored");
        assert_eq!(record.value, Some(Value::Int(1)));
    }

    #[test]
    fn entries_skips_expired_but_get_record_does_not() {
        let (mut map, time) = make_map(1_000_000);
        map.set("temp", Value::Int(1), Some(10)).unwrap();
        time.store(2_000_000, AtomicOrdering::Relaxed);
        assert_eq!(map.entries().count(), 0);
        assert!(map.get_record("temp").is_some());
    }

    // ---- Conflict resolution ----

    #[test]
    fn conflict_higher_millis_wins() {
        let (mut map, _) = make_map(1_000_000);

        let record_old = LWWRecord {
            value: Some(Value::String("old".to_string())),
            timestamp: Timestamp {
                millis: 100,
                counter: 0,
                node_id: "A".to_string(),
            },
            ttl_ms: None,
        };
        let record_new = LWWRecord {
            value: Some(Value::String("new".to_string())),
            timestamp: Timestamp {
                millis: 200,
                counter: 0,
                node_id: "B".to_string(),
            },
            ttl_ms: None,
        };

        // Merge old first, then new
        map.merge("key", record_old.clone());
        assert_eq!(map.get("key"), Some(&Value::String("old".to_string())));

        map.merge("key", record_new.clone());
        assert_eq!(map.get("key"), Some(&Value::String("new".to_string())));

        // Merge old again -- should NOT revert
        let changed = map.merge("key", record_old);
        assert!(!changed);
        assert_eq!(map.get("key"), Some(&Value::String("new".to_string())));
    }

    #[test]
    fn conflict_higher_counter_wins() {
        let (mut map, _) = make_map(1_000_000);

        let record_low = LWWRecord {
            value: Some(Value::String("low".to_string())),
            timestamp: Timestamp {
                millis: 100,
                counter: 1,
                node_id: "A".to_string(),
            },
            ttl_ms: None,
        };
        let record_high = LWWRecord {
            value: Some(Value::String("high".to_string())),
            timestamp: Timestamp {
                millis: 100,
                counter: 5,
                node_id: "A".to_string(),
            },
            ttl_ms: None,
        };

        map.merge("key", record_low);
        map.merge("key", record_high);
        assert_eq!(map.get("key"), Some(&Value::String("high".to_string())));
    }

    #[test]
    fn conflict_higher_node_id_wins() {
        let (mut map, _) = make_map(1_000_000);

        let record_a = LWWRecord {
            value: Some(Value::String("valA".to_string())),
            timestamp: Timestamp {
                millis: 100,
                counter: 0,
                node_id: "A".to_string(),
            },
            ttl_ms: None,
        };
        let record_b = LWWRecord {
            value: Some(Value::String("valB".to_string())),
            timestamp: Timestamp {
                millis: 100,
                counter: 0,
                node_id: "B".to_string(),
            },
            ttl_ms: None,
        };

        // Apply A then B
        map.merge("key", record_a.clone());
        map.merge("key", record_b.clone());
        assert_eq!(map.get("key"), Some(&Value::String("valB".to_string())));

        // Try reverse order in a fresh map
        let (mut map2, _) = make_map(1_000_000);
        map2.merge("key", record_b);
        map2.merge("key", record_a);
        // B still wins regardless of merge order
        assert_eq!(map2.get("key"), Some(&Value::String("valB".to_string())));
    }

    #[test]
    fn equal_timestamps_leave_local_intact() {
        let (mut map, _) = make_map(1_000_000);
        let ts = Timestamp {
            millis: 100,
            counter: 0,
            node_id: "A".to_string(),
        };
        let local = LWWRecord {
            value: Some(Value::String("local".to_string())),
            timestamp: ts.clone(),
            ttl_ms: None,
        };
        let remote_same_ts = LWWRecord {
            value: Some(Value::String("remote".to_string())),
            timestamp: ts,
            ttl_ms: None,
        };
        map.merge("key", local);
        let changed = map.merge("key", remote_same_ts);
        assert!(!changed);
        assert_eq!(map.get("key"), Some(&Value::String("local".to_string())));
    }

    #[test]
    fn merge_returns_true_when_state_changes() {
        let (mut map, _) = make_map(1_000_000);
        let record = LWWRecord {
            value: Some(Value::Int(42)),
            timestamp: Timestamp {
                millis: 100,
                counter: 0,
                node_id: "A".to_string(),
            },
            ttl_ms: None,
        };
        assert!(map.merge("key", record));
    }

    #[test]
    fn merge_returns_false_when_no_change() {
        let (mut map, _) = make_map(1_000_000);
        let newer = LWWRecord {
            value: Some(Value::Int(1)),
            timestamp: Timestamp {
                millis: 200,
                counter: 0,
                node_id: "A".to_string(),
            },
            ttl_ms: None,
        };
        let older = LWWRecord {
            value: Some(Value::Int(2)),
            timestamp: Timestamp {
                millis: 100,
                counter: 0,
                node_id: "A".to_string(),
            },
            ttl_ms: None,
        };
        map.merge("key", newer);
        let changed = map.merge("key", older);
        assert!(!changed);
    }

    // ---- Prune ----

    #[test]
    fn prune_removes_old_tombstones() {
        let (mut map, _) = make_map(1_000_000);
        map.set("key1", Value::String("val1".to_string()), None).unwrap();
        let tombstone = map.remove("key1").unwrap();

        // Threshold newer than tombstone -> should prune
        let threshold = Timestamp {
            millis: tombstone.timestamp.millis + 1000,
            counter: 0,
            node_id: "test-node".to_string(),
        };
        let pruned = map.prune(&threshold);
        assert_eq!(pruned, vec!["key1".to_string()]);
        assert!(map.get_record("key1").is_none());
    }

    #[test]
    fn prune_does_not_remove_recent_tombstones() {
        let (mut map, _) = make_map(1_000_000);
        map.set("key1", Value::String("val1".to_string()), None).unwrap();
        let tombstone = map.remove("key1").unwrap();

        // Threshold older than tombstone -> should NOT prune
        let threshold = Timestamp {
            millis: tombstone.timestamp.millis - 1000,
            counter: 0,
            node_id: "test-node".to_string(),
        };
        let pruned = map.prune(&threshold);
        assert!(pruned.is_empty());
        assert!(map.get_record("key1").is_some());
    }

    #[test]
    fn prune_does_not_remove_non_tombstones() {
        let (mut map, _) = make_map(1_000_000);
        map.set("key1", Value::String("val1".to_string()), None).unwrap();

        // Even with a very future threshold, non-tombstones are not pruned
        let threshold = Timestamp {
            millis: u64::MAX,
            counter: u32::MAX,
            node_id: "z".to_string(),
        };
        let pruned = map.prune(&threshold);
        assert!(pruned.is_empty());
        assert!(map.get_record("key1").is_some());
    }

    #[test]
    fn prune_returns_empty_on_empty_map() {
        let (mut map, _) = make_map(1_000_000);
        let threshold = Timestamp {
            millis: u64::MAX,
            counter: 0,
            node_id: "x".to_string(),
        };
        let pruned = map.prune(&threshold);
        assert!(pruned.is_empty());
    }

    // ---- entries() and all_keys() ----

    #[test]
    fn entries_skips_tombstones() {
        let (mut map, _) = make_map(1_000_000);
        map.set("a", Value::Int(1), None).unwrap();
        map.set("b", Value::Int(2), None).unwrap();
        map.remove("b").unwrap();

        let entries: Vec<_> = map.entries().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "a");
        assert_eq!(entries[0].1, &Value::Int(1));
    }

    #[test]
    fn entries_skips_expired_ttl() {
        let (mut map, time) = make_map(1_000_000);
        map.set("live", Value::Int(1), None).unwrap();
        map.set("expired", Value::Int(2), Some(100)).unwrap();

        // Advance past TTL expiry
        time.store(1_000_200, AtomicOrdering::Relaxed);

        let entries: Vec<_> = map.entries().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "live");
    }

    #[test]
    fn all_keys_includes_tombstones() {
        let (mut map, _) = make_map(1_000_000);
        map.set("a", Value::Int(1), None).unwrap();
        map.set("b", Value::Int(2), None).unwrap();
        map.remove("b").unwrap();

        let mut keys: Vec<&String> = map.all_keys().collect();
        keys.sort();
        assert_eq!(keys.len(), 2);
        assert_eq!(*keys[0], "a");
        assert_eq!(*keys[1], "b");
    }

    // ---- clear() ----

    #[test]
    fn clear_removes_all_data() {
        let (mut map, _) = make_map(1_000_000);
        map.set("a", Value::Int(1), None).unwrap();
        map.set("b", Value::Int(2), None).unwrap();
        map.clear();
        assert_eq!(map.size(), 0);
        assert_eq!(map.get("a"), None);
        assert_eq!(map.get("b"), None);
    }

    #[test]
    fn clear_resets_merkle_tree() {
        let (mut map, _) = make_map(1_000_000);
        map.set("key1", Value::Int(1), None).unwrap();
        assert_ne!(map.merkle_tree().get_root_hash(), 0);

        map.clear();
        assert_eq!(map.merkle_tree().get_root_hash(), 0);
    }

    // ---- MerkleTree integration ----

    #[test]
    fn merkle_tree_updates_on_set() {
        let (mut map, _) = make_map(1_000_000);
        let hash_before = map.merkle_tree().get_root_hash();
        map.set("key1", Value::Int(1), None).unwrap();
        let hash_after = map.merkle_tree().get_root_hash();
        assert_ne!(hash_before, hash_after);
    }

    #[test]
    fn merkle_tree_updates_on_remove() {
        let (mut map, _) = make_map(1_000_000);
        map.set("key1", Value::Int(1), None).unwrap();
        let hash_after_set = map.merkle_tree().get_root_hash();
        map.remove("key1").unwrap();
        let hash_after_remove = map.merkle_tree().get_root_hash();
        // Remove changes the record's timestamp and value, so hash should change
        assert_ne!(hash_after_set, hash_after_remove);
    }

    #[test]
    fn merkle_tree_updates_on_merge() {
        let (mut map, _) = make_map(1_000_000);
        let hash_before = map.merkle_tree().get_root_hash();

        let record = LWWRecord {
            value: Some(Value::Int(42)),
            timestamp: Timestamp {
                millis: 500,
                counter: 0,
                node_id: "remote".to_string(),
            },
            ttl_ms: None,
        };
        map.merge("key1", record);
        let hash_after = map.merkle_tree().get_root_hash();
        assert_ne!(hash_before, hash_after);
    }

    #[test]
    fn merkle_tree_hash_includes_value() {
        // Two records differing only in value at the same key/timestamp
        // must produce different Merkle entry hashes (spec.md §4.4).
        let (mut map1, _) = make_map(1_000_000);
        let (mut map2, _) = make_map(1_000_000);

        let ts = Timestamp {
            millis: 500,
            counter: 0,
            node_id: "node".to_string(),
        };
        map1.merge(
            "key1",
            LWWRecord { value: Some(Value::Int(1)), timestamp: ts.clone(), ttl_ms: None },
        );
        map2.merge(
            "key1",
            LWWRecord { value: Some(Value::Int(2)), timestamp: ts, ttl_ms: None },
        );

        assert_ne!(
            map1.merkle_tree().get_root_hash(),
            map2.merkle_tree().get_root_hash()
        );
    }

    #[test]
    fn merkle_tree_prune_removes_entry() {
        let (mut map, _) = make_map(1_000_000);
        map.set("key1", Value::Int(1), None).unwrap();
        let tombstone = map.remove("key1").unwrap();

        let hash_before_prune = map.merkle_tree().get_root_hash();
        assert_ne!(hash_before_prune, 0);

        let threshold = Timestamp {
            millis: tombstone.timestamp.millis + 1000,
            counter: 0,
            node_id: "z".to_string(),
        };
        map.prune(&threshold);

        // After pruning the only entry, root hash goes to 0
        assert_eq!(map.merkle_tree().get_root_hash(), 0);
    }

    #[test]
    fn merkle_tree_hash_deterministic() {
        // Two maps with same operations should produce same merkle root
        let (mut map1, _) = make_map(1_000_000);
        let (mut map2, _) = make_map(1_000_000);

        // Use merge with explicit timestamps (set() would use HLC which may differ)
        let record = LWWRecord {
            value: Some(Value::String("hello".to_string())),
            timestamp: Timestamp {
                millis: 500,
                counter: 0,
                node_id: "node".to_string(),
            },
            ttl_ms: None,
        };
        map1.merge("key1", record.clone());
        map2.merge("key1", record);

        assert_eq!(
            map1.merkle_tree().get_root_hash(),
            map2.merkle_tree().get_root_hash()
        );
    }

    // ---- set() returns record ----

    #[test]
    fn set_returns_record_with_correct_fields() {
        let (mut map, _) = make_map(1_000_000);
        let record = map.set("key1", Value::Int(99), Some(5000)).unwrap();
        assert_eq!(record.value, Some(Value::Int(99)));
        assert_eq!(record.timestamp.millis, 1_000_000);
        assert_eq!(record.timestamp.node_id, "test-node");
        assert_eq!(record.ttl_ms, Some(5000));
    }

    // ---- remove() returns tombstone record ----

    #[test]
    fn remove_returns_tombstone_record() {
        let (mut map, _) = make_map(1_000_000);
        map.set("key1", Value::Int(1), None).unwrap();
        let tombstone = map.remove("key1").unwrap();
        assert_eq!(tombstone.value, None);
        assert_eq!(tombstone.ttl_ms, None);
        assert_eq!(tombstone.timestamp.node_id, "test-node");
    }

    // ---- Merge commutativity (manual spot check) ----

    #[test]
    fn merge_commutativity_spot_check() {
        let record_a = LWWRecord {
            value: Some(Value::String("A".to_string())),
            timestamp: Timestamp {
                millis: 100,
                counter: 0,
                node_id: "nodeA".to_string(),
            },
            ttl_ms: None,
        };
        let record_b = LWWRecord {
            value: Some(Value::String("B".to_string())),
            timestamp: Timestamp {
                millis: 200,
                counter: 0,
                node_id: "nodeB".to_string(),
            },
            ttl_ms: None,
        };

        // Order 1: A then B
        let (mut map1, _) = make_map(1_000_000);
        map1.merge("key", record_a.clone());
        map1.merge("key", record_b.clone());

        // Order 2: B then A
        let (mut map2, _) = make_map(1_000_000);
        map2.merge("key", record_b);
        map2.merge("key", record_a);

        // Both should have the same value (B wins)
        assert_eq!(map1.get("key"), map2.get("key"));
        assert_eq!(map1.get("key"), Some(&Value::String("B".to_string())));
    }

    // ---- Merge idempotence (manual spot check) ----

    #[test]
    fn merge_idempotence_spot_check() {
        let (mut map, _) = make_map(1_000_000);
        let record = LWWRecord {
            value: Some(Value::Int(42)),
            timestamp: Timestamp {
                millis: 500,
                counter: 0,
                node_id: "node".to_string(),
            },
            ttl_ms: None,
        };

        let changed1 = map.merge("key", record.clone());
        assert!(changed1);

        let hash_after_first = map.merkle_tree().get_root_hash();

        let changed2 = map.merge("key", record);
        assert!(!changed2);

        // State unchanged
        assert_eq!(map.merkle_tree().get_root_hash(), hash_after_first);
        assert_eq!(map.get("key"), Some(&Value::Int(42)));
    }

    // ---- MsgPack round-trip for LWWRecord<Value> ----

    #[test]
    fn lww_record_value_msgpack_roundtrip() {
        let record = LWWRecord {
            value: Some(Value::String("hello".to_string())),
            timestamp: Timestamp {
                millis: 1_700_000_000_000,
                counter: 42,
                node_id: "node-abc-123".to_string(),
            },
            ttl_ms: Some(5000),
        };
        let bytes = rmp_serde::to_vec(&record).expect("serialize LWWRecord<Value>");
        let decoded: LWWRecord<Value> =
            rmp_serde::from_slice(&bytes).expect("deserialize LWWRecord<Value>");
        assert_eq!(record, decoded);
    }

    #[test]
    fn lww_record_tombstone_msgpack_roundtrip() {
        let record: LWWRecord<Value> = LWWRecord {
            value: None,
            timestamp: Timestamp {
                millis: 999,
                counter: 0,
                node_id: "tomb".to_string(),
            },
            ttl_ms: None,
        };
        let bytes = rmp_serde::to_vec(&record).expect("serialize");
        let decoded: LWWRecord<Value> = rmp_serde::from_slice(&bytes).expect("deserialize");
        assert_eq!(record, decoded);
    }

    #[test]
    fn lww_record_all_value_variants_roundtrip() {
        let variants: Vec<LWWRecord<Value>> = vec![
            LWWRecord {
                value: Some(Value::Null),
                timestamp: Timestamp { millis: 1, counter: 0, node_id: "n".to_string() },
                ttl_ms: None,
            },
            LWWRecord {
                value: Some(Value::Bool(true)),
                timestamp: Timestamp { millis: 2, counter: 0, node_id: "n".to_string() },
                ttl_ms: None,
            },
            LWWRecord {
                value: Some(Value::Int(-42)),
                timestamp: Timestamp { millis: 3, counter: 0, node_id: "n".to_string() },
                ttl_ms: Some(1000),
            },
            LWWRecord {
                value: Some(Value::Float(3.14)),
                timestamp: Timestamp { millis: 4, counter: 0, node_id: "n".to_string() },
                ttl_ms: None,
            },
            LWWRecord {
                value: Some(Value::Bytes(vec![0xDE, 0xAD])),
                timestamp: Timestamp { millis: 5, counter: 0, node_id: "n".to_string() },
                ttl_ms: None,
            },
        ];

        for record in variants {
            let bytes = rmp_serde::to_vec(&record).expect("serialize");
            let decoded: LWWRecord<Value> = rmp_serde::from_slice(&bytes).expect("deserialize");
            assert_eq!(record, decoded);
        }
    }
}
