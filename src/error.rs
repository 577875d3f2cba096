//! Crate-wide error type.
//!
//! Every fallible public operation returns `Result<T, CoreError>`. There is
//! no retry logic inside the core; failures are surfaced synchronously to
//! the caller (see the crate-level docs for the propagation policy).
//! Subscriber-callback errors are not represented here: they are isolated
//! and routed to a [`crate::Logger`] instead of crossing a `Result`
//! boundary.

use thiserror::Error;

/// The complete set of ways a core operation can fail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// `ttlMs` supplied to `set`/`add` was not a positive, finite duration.
    #[error("invalid ttl_ms: {ttl_ms} (must be positive)")]
    InvalidTtl {
        /// The rejected TTL value, in milliseconds.
        ttl_ms: i64,
    },

    /// The HLC logical counter exceeded `u32::MAX` within the same
    /// millisecond.
    #[error("hlc counter overflowed at millis={millis}")]
    ClockOverflow {
        /// The wall-clock millisecond at which the overflow occurred.
        millis: u64,
    },

    /// `Timestamp::parse` failed on a tag string.
    #[error("invalid timestamp tag: {tag}")]
    InvalidTag {
        /// The tag string that failed to parse.
        tag: String,
    },

    /// `useIndex` hint named an attribute with no registered index.
    #[error("no index registered for attribute {attribute}")]
    NoSuchIndex {
        /// The attribute named by the hint.
        attribute: String,
    },

    /// `forceIndexScan` hint was set but the planner chose `FullScan`.
    #[error("no index available to satisfy forced index scan on {attribute}")]
    NoIndexAvailable {
        /// The attribute the planner could not satisfy with an index.
        attribute: String,
    },

    /// An index received a query operator it does not support.
    #[error("{index_kind} index does not support op {op}")]
    UnsupportedQueryType {
        /// The kind of index that rejected the operator (e.g. `"hash"`).
        index_kind: &'static str,
        /// The rejected operator, rendered for diagnostics.
        op: String,
    },

    /// A cursor decoded successfully but its query hash mismatched or it
    /// expired.
    #[error("cursor invalid: {reason}")]
    CursorInvalid {
        /// Human-readable reason the cursor was rejected.
        reason: String,
    },
}

/// Convenience alias used throughout the crate.
pub type CoreResult<T> = Result<T, CoreError>;
