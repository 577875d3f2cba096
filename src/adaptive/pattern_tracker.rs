//! `QueryPatternTracker` (spec.md §4.8): records per-`(attribute, op)` (or
//! compound-attribute-set) query statistics, bounded by an LRU-evicted
//! capacity and a staleness TTL.

use std::collections::HashMap;

use crate::hlc::{ClockSource, SystemClock};
use crate::predicate::Op;

/// Default cap on distinct tracked `(attr, op)`/compound patterns.
pub const DEFAULT_MAX_TRACKED_PATTERNS: usize = 1_000;
/// Default staleness window before a pattern is pruned on read.
pub const DEFAULT_STATS_TTL_MS: u64 = 24 * 60 * 60 * 1_000;

/// The attribute set a tracked pattern covers: a single `(attr, op)` leaf
/// query, or a sorted attribute list for a tracked AND-compound query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternKey {
    Single(String, Op),
    Compound(Vec<String>),
}

/// Aggregated stats for one tracked pattern (spec.md §4.8).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternStats {
    pub query_count: u64,
    pub total_cost: f64,
    pub average_cost: f64,
    pub last_queried: u64,
    pub estimated_cardinality: usize,
    pub has_index: bool,
}

/// Options controlling [`QueryPatternTracker`] memory and sampling behavior.
#[derive(Debug, Clone)]
pub struct TrackerOptions {
    pub max_tracked_patterns: usize,
    pub stats_ttl_ms: u64,
    /// `1` disables sampling; `N > 1` means "track 1 query in N", with
    /// observed counts multiplied by `N` to extrapolate true volume.
    pub sample_rate: u32,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            max_tracked_patterns: DEFAULT_MAX_TRACKED_PATTERNS,
            stats_ttl_ms: DEFAULT_STATS_TTL_MS,
            sample_rate: 1,
        }
    }
}

/// Tracks query execution patterns to drive [`super::advisor::IndexAdvisor`]
/// suggestions.
pub struct QueryPatternTracker {
    clock: Box<dyn ClockSource>,
    options: TrackerOptions,
    patterns: HashMap<PatternKey, PatternStats>,
}

impl Default for QueryPatternTracker {
    fn default() -> Self {
        Self::new(TrackerOptions::default())
    }
}

impl QueryPatternTracker {
    #[must_use]
    pub fn new(options: TrackerOptions) -> Self {
        Self { clock: Box::new(SystemClock), options, patterns: HashMap::new() }
    }

    /// Builds a tracker with an injected clock, for deterministic tests.
    #[must_use]
    pub fn with_clock(options: TrackerOptions, clock: Box<dyn ClockSource>) -> Self {
        Self { clock, options, patterns: HashMap::new() }
    }

    /// Records one execution of a single-attribute leaf query.
    pub fn record_query(&mut self, attribute: &str, op: Op, execution_ms: f64, result_size: usize, has_index: bool) {
        self.record(PatternKey::Single(attribute.to_string(), op), execution_ms, result_size, has_index);
    }

    /// Records one execution of an AND-compound query over `attributes`.
    pub fn record_compound_query(&mut self, attributes: &[String], execution_ms: f64, result_size: usize, has_index: bool) {
        let mut sorted = attributes.to_vec();
        sorted.sort();
        self.record(PatternKey::Compound(sorted), execution_ms, result_size, has_index);
    }

    fn record(&mut self, key: PatternKey, execution_ms: f64, result_size: usize, has_index: bool) {
        let now = self.clock.now();
        let multiplier = f64::from(self.options.sample_rate.max(1));

        let entry = self.patterns.entry(key).or_insert(PatternStats {
            query_count: 0,
            total_cost: 0.0,
            average_cost: 0.0,
            last_queried: now,
            estimated_cardinality: 0,
            has_index,
        });
        entry.query_count += multiplier as u64;
        entry.total_cost += execution_ms * multiplier;
        entry.average_cost = entry.total_cost / entry.query_count as f64;
        entry.last_queried = now;
        entry.estimated_cardinality = entry.estimated_cardinality.max(result_size);
        entry.has_index = has_index;

        self.evict_over_capacity();
    }

    /// Marks whether `(attribute, op)` now has a covering index, e.g. after
    /// [`super::auto_index::AutoIndexManager`] creates one.
    pub fn update_index_status(&mut self, attribute: &str, op: Op, has_index: bool) {
        if let Some(stats) = self.patterns.get_mut(&PatternKey::Single(attribute.to_string(), op)) {
            stats.has_index = has_index;
        }
    }

    fn evict_over_capacity(&mut self) {
        while self.patterns.len() > self.options.max_tracked_patterns {
            let Some(oldest) = self.patterns.iter().min_by_key(|(_, s)| s.last_queried).map(|(k, _)| k.clone())
            else {
                break;
            };
            self.patterns.remove(&oldest);
        }
    }

    fn prune_stale(&mut self) {
        let now = self.clock.now();
        let ttl = self.options.stats_ttl_ms;
        self.patterns.retain(|_, stats| now.saturating_sub(stats.last_queried) < ttl);
    }

    /// A stale-pruned snapshot of every tracked pattern, for
    /// [`super::advisor::IndexAdvisor`].
    pub fn snapshot(&mut self) -> Vec<(PatternKey, PatternStats)> {
        self.prune_stale();
        self.patterns.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    #[must_use]
    pub fn tracked_pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct FixedClock(AtomicU64);

    impl ClockSource for FixedClock {
        fn now(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn record_query_accumulates_stats() {
        let mut tracker = QueryPatternTracker::with_clock(TrackerOptions::default(), Box::new(FixedClock(AtomicU64::new(1000))));
        tracker.record_query("age", Op::Gt, 10.0, 5, false);
        tracker.record_query("age", Op::Gt, 20.0, 8, false);

        let snapshot = tracker.snapshot();
        let (_, stats) = snapshot.iter().find(|(k, _)| *k == PatternKey::Single("age".to_string(), Op::Gt)).unwrap();
        assert_eq!(stats.query_count, 2);
        assert!((stats.average_cost - 15.0).abs() < f64::EPSILON);
        assert_eq!(stats.estimated_cardinality, 8);
    }

    #[test]
    fn sampling_extrapolates_counts() {
        let options = TrackerOptions { sample_rate: 10, ..TrackerOptions::default() };
        let mut tracker = QueryPatternTracker::with_clock(options, Box::new(FixedClock(AtomicU64::new(1000))));
        tracker.record_query("status", Op::Eq, 5.0, 1, true);
        let (_, stats) = tracker.snapshot().into_iter().find(|(k, _)| *k == PatternKey::Single("status".to_string(), Op::Eq)).unwrap();
        assert_eq!(stats.query_count, 10);
    }

    #[test]
    fn eviction_drops_least_recently_queried() {
        let options = TrackerOptions { max_tracked_patterns: 1, ..TrackerOptions::default() };
        let clock = std::sync::Arc::new(AtomicU64::new(1000));
        struct SharedClock(std::sync::Arc<AtomicU64>);
        impl ClockSource for SharedClock {
            fn now(&self) -> u64 {
                self.0.load(Ordering::SeqCst)
            }
        }
        let mut tracker = QueryPatternTracker::with_clock(options, Box::new(SharedClock(clock.clone())));
        tracker.record_query("a", Op::Eq, 1.0, 1, false);
        clock.store(2000, Ordering::SeqCst);
        tracker.record_query("b", Op::Eq, 1.0, 1, false);

        assert_eq!(tracker.tracked_pattern_count(), 1);
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot[0].0, PatternKey::Single("b".to_string(), Op::Eq));
    }

    #[test]
    fn stale_entries_pruned_on_read() {
        let clock = std::sync::Arc::new(AtomicU64::new(0));
        struct SharedClock(std::sync::Arc<AtomicU64>);
        impl ClockSource for SharedClock {
            fn now(&self) -> u64 {
                self.0.load(Ordering::SeqCst)
            }
        }
        let options = TrackerOptions { stats_ttl_ms: 100, ..TrackerOptions::default() };
        let mut tracker = QueryPatternTracker::with_clock(options, Box::new(SharedClock(clock.clone())));
        tracker.record_query("a", Op::Eq, 1.0, 1, false);
        clock.store(200, Ordering::SeqCst);
        assert_eq!(tracker.snapshot().len(), 0);
    }

    #[test]
    fn compound_query_sorts_attributes_for_key_stability() {
        let mut tracker = QueryPatternTracker::with_clock(TrackerOptions::default(), Box::new(FixedClock(AtomicU64::new(1000))));
        tracker.record_compound_query(&["b".to_string(), "a".to_string()], 1.0, 1, false);
        tracker.record_compound_query(&["a".to_string(), "b".to_string()], 1.0, 1, false);
        assert_eq!(tracker.tracked_pattern_count(), 1);
    }
}
