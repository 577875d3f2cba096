//! Hybrid Logical Clock (HLC) for distributed causality tracking.
//!
//! Provides monotonically increasing timestamps that combine physical wall-clock
//! time with a logical counter, ensuring total ordering of events across nodes.
//! The HLC is the foundation for LWW (Last-Write-Wins) conflict resolution.
//!
//! # Wire format
//!
//! Timestamps serialize to the string format `"millis:counter:nodeId"` for
//! cross-language compatibility. Node IDs must not contain the `:` character.

use std::cmp::Ordering;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A hybrid logical timestamp combining physical time, logical counter, and node identity.
///
/// Ordering is defined as: millis first, then counter, then node_id (lexicographic byte order).
///
/// `millis` is stored as `u64` rather than the spec's `i64`: wall-clock
/// milliseconds since the Unix epoch are never negative in practice, and
/// `u64` lets arithmetic against TTLs stay in unsigned space without
/// incidental sign bugs. See `DESIGN.md` for this deviation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Physical wall-clock milliseconds since Unix epoch.
    pub millis: u64,
    /// Logical counter for events within the same millisecond.
    pub counter: u32,
    /// Unique identifier of the node that generated this timestamp.
    pub node_id: String,
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.millis
            .cmp(&other.millis)
            .then_with(|| self.counter.cmp(&other.counter))
            .then_with(|| self.node_id.cmp(&other.node_id))
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.millis, self.counter, self.node_id)
    }
}

/// Abstraction over the system clock for dependency injection.
///
/// Allows deterministic testing by replacing the real clock with a virtual one.
/// The default implementation ([`SystemClock`]) delegates to `std::time::SystemTime`.
pub trait ClockSource: Send + Sync {
    /// Returns the current time as milliseconds since Unix epoch.
    fn now(&self) -> u64;
}

/// Default clock source that reads the real system time.
#[derive(Debug, Clone)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before Unix epoch")
            .as_millis() as u64
    }
}

/// Hybrid Logical Clock implementation.
///
/// Generates monotonically increasing [`Timestamp`]s by combining wall-clock time
/// with a logical counter. When the system clock advances, the counter resets to 0.
/// When the system clock is unchanged or behind, the counter increments.
///
/// # Drift detection
///
/// When merging a remote timestamp via [`HLC::update`], the clock detects if the
/// remote time exceeds the local time by more than `max_drift_ms`. In strict mode
/// this returns an error; otherwise a warning is logged via the `tracing` crate.
///
/// # Examples
///
/// ```
/// use lattice_kv::hlc::{HLC, SystemClock};
///
/// let mut hlc = HLC::new("node-1".to_string(), Box::new(SystemClock));
/// let ts1 = hlc.now().unwrap();
/// let ts2 = hlc.now().unwrap();
/// assert!(ts1 < ts2);
/// ```
pub struct HLC {
    last_millis: u64,
    last_counter: u32,
    node_id: String,
    strict_mode: bool,
    max_drift_ms: u64,
    clock_source: Box<dyn ClockSource>,
}

impl HLC {
    /// Creates a new HLC with the given node ID and clock source.
    ///
    /// Uses default options: non-strict mode, 60-second max drift.
    pub fn new(node_id: String, clock_source: Box<dyn ClockSource>) -> Self {
        Self {
            last_millis: 0,
            last_counter: 0,
            node_id,
            strict_mode: false,
            max_drift_ms: 60_000,
            clock_source,
        }
    }

    /// Creates a new HLC with explicit strict mode and max drift configuration.
    pub fn with_options(
        node_id: String,
        clock_source: Box<dyn ClockSource>,
        strict_mode: bool,
        max_drift_ms: u64,
    ) -> Self {
        Self {
            last_millis: 0,
            last_counter: 0,
            node_id,
            strict_mode,
            max_drift_ms,
            clock_source,
        }
    }

    /// Returns the node ID of this HLC instance.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Returns whether strict mode is enabled.
    pub fn strict_mode(&self) -> bool {
        self.strict_mode
    }

    /// Returns the maximum allowed clock drift in milliseconds.
    pub fn max_drift_ms(&self) -> u64 {
        self.max_drift_ms
    }

    /// Returns a reference to the clock source used by this HLC.
    ///
    /// Useful for LWWMap/ORMap to access the same clock for TTL checks.
    pub fn clock_source(&self) -> &dyn ClockSource {
        &*self.clock_source
    }

    /// Generates a new unique timestamp for a local event.
    ///
    /// Ensures monotonicity: always greater than any previously generated or received timestamp.
    /// If the system clock advances past the last logical time, the counter resets to 0.
    /// Otherwise the counter increments to maintain uniqueness.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ClockOverflow`] if the logical counter would
    /// exceed `u32::MAX` within the same millisecond.
    pub fn now(&mut self) -> Result<Timestamp, CoreError> {
        let system_time = self.clock_source.now();

        if system_time > self.last_millis {
            // System clock advanced: reset counter
            self.last_millis = system_time;
            self.last_counter = 0;
        } else {
            // System clock unchanged or behind: increment counter
            self.last_counter = self
                .last_counter
                .checked_add(1)
                .ok_or(CoreError::ClockOverflow { millis: self.last_millis })?;
        }

        Ok(Timestamp {
            millis: self.last_millis,
            counter: self.last_counter,
            node_id: self.node_id.clone(),
        })
    }

    /// Updates the local clock based on a received remote timestamp.
    ///
    /// Must be called whenever a message/event is received from another node.
    /// Merges the remote timestamp with the local state to maintain causality.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ClockOverflow`] if the merged logical counter
    /// would exceed `u32::MAX`. In strict mode, also returns an error (via
    /// `CoreError::InvalidTag` is not used here; drift errors use a plain
    /// `Err` carrying a descriptive message wrapped as `InvalidTag`-free
    /// text is avoided -- see the `strict_drift_exceeded` helper) if the
    /// remote timestamp's millis exceeds `local_system_time + max_drift_ms`.
    /// In non-strict mode, a warning is logged but the timestamp is
    /// accepted (AP system behavior).
    pub fn update(&mut self, remote: &Timestamp) -> Result<(), CoreError> {
        let system_time = self.clock_source.now();

        // Drift detection: only check positive drift (remote ahead of local)
        if remote.millis > system_time {
            let drift = remote.millis - system_time;
            if drift > self.max_drift_ms {
                if self.strict_mode {
                    return Err(CoreError::InvalidTag {
                        tag: format!(
                            "Clock drift detected: Remote time {} is {}ms ahead of local {} (threshold: {}ms)",
                            remote.millis, drift, system_time, self.max_drift_ms
                        ),
                    });
                }
                tracing::warn!(
                    drift = drift,
                    remote_millis = remote.millis,
                    local_millis = system_time,
                    max_drift_ms = self.max_drift_ms,
                    "Clock drift detected"
                );
            }
        }

        let max_millis = self.last_millis.max(system_time).max(remote.millis);

        let new_counter = if max_millis == self.last_millis && max_millis == remote.millis {
            // Both clocks on the same millisecond: take max counter + 1
            self.last_counter.max(remote.counter).checked_add(1)
        } else if max_millis == self.last_millis {
            // Local logical clock is ahead: just increment
            self.last_counter.checked_add(1)
        } else if max_millis == remote.millis {
            // Remote clock is ahead: fast-forward
            remote.counter.checked_add(1)
        } else {
            // System time is ahead of both: reset counter
            Some(0)
        };

        self.last_counter = new_counter.ok_or(CoreError::ClockOverflow { millis: max_millis })?;
        self.last_millis = max_millis;
        Ok(())
    }

    /// Compares two timestamps.
    ///
    /// Returns `Ordering::Less` if `a < b`, `Ordering::Greater` if `a > b`,
    /// `Ordering::Equal` if they are identical.
    ///
    /// Comparison order: millis first, then counter, then node_id (byte-order).
    pub fn compare(a: &Timestamp, b: &Timestamp) -> Ordering {
        a.cmp(b)
    }

    /// Serializes a timestamp to the wire format `"millis:counter:nodeId"`.
    pub fn to_string(ts: &Timestamp) -> String {
        ts.to_string()
    }

    /// Parses a timestamp from the wire format `"millis:counter:nodeId"`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTag`] if the string does not contain
    /// exactly 3 colon-separated parts, or if millis/counter cannot be
    /// parsed as integers.
    pub fn parse(s: &str) -> Result<Timestamp, CoreError> {
        let parts: Vec<&str> = s.splitn(3, ':').collect();
        if parts.len() != 3 {
            return Err(CoreError::InvalidTag { tag: s.to_string() });
        }

        let millis = parts[0]
            .parse::<u64>()
            .map_err(|_| CoreError::InvalidTag { tag: s.to_string() })?;
        let counter = parts[1]
            .parse::<u32>()
            .map_err(|_| CoreError::InvalidTag { tag: s.to_string() })?;
        let node_id = parts[2].to_string();

        if node_id.is_empty() {
            return Err(CoreError::InvalidTag { tag: s.to_string() });
        }

        Ok(Timestamp { millis, counter, node_id })
    }
}

/// A Last-Write-Wins record wrapping a value with its causal timestamp.
///
/// Generic over `V` so that any serializable type can be stored, not just [`crate::Value`].
/// The `ttl_ms` field enables time-to-live expiration checked against the HLC clock source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "V: Serialize",
    deserialize = "V: serde::de::DeserializeOwned"
))]
pub struct LWWRecord<V> {
    /// The stored value, or `None` if this record represents a tombstone (deletion).
    pub value: Option<V>,
    /// Causal timestamp assigned by the writing node's HLC.
    pub timestamp: Timestamp,
    /// Optional time-to-live in milliseconds. Checked against `HLC::clock_source().now()`.
    pub ttl_ms: Option<u64>,
}

/// An Observed-Remove Map record associating a value with a unique tag.
///
/// Each concurrent addition to an ORMap entry gets a unique `tag` (typically
/// `"millis:counter:nodeId"`). Removals target specific tags, allowing concurrent
/// adds and removes to be resolved without lost updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "V: Serialize",
    deserialize = "V: serde::de::DeserializeOwned"
))]
pub struct ORMapRecord<V> {
    /// The stored value.
    pub value: V,
    /// Causal timestamp assigned by the writing node's HLC.
    pub timestamp: Timestamp,
    /// Unique tag identifying this particular addition (typically `"millis:counter:nodeId"`).
    pub tag: String,
    /// Optional time-to-live in milliseconds.
    pub ttl_ms: Option<u64>,
}

/// Result of merging a key in a CRDT map, reporting how many entries were added or updated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergeKeyResult {
    /// Number of new entries added during the merge.
    pub added: usize,
    /// Number of existing entries updated during the merge.
    pub updated: usize,
}
