//! Opaque pagination cursors (spec.md §6): a `base64url`-encoded JSON
//! envelope carrying enough state to resume a query or search at the exact
//! point a prior page left off, plus the query hash and mint timestamp used
//! to reject stale or mismatched cursors.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::hlc::{ClockSource, SystemClock};
use crate::value::Value;

/// Default cursor lifetime before it is rejected as expired.
pub const DEFAULT_MAX_AGE_MS: u64 = 5 * 60 * 1000;

/// Resume state for a sorted/paginated query (`Plan::Cursor`, spec.md §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryCursor {
    pub last_sort_value: Value,
    pub last_key: String,
    pub direction: crate::messages::base::SortDirection,
    pub query_hash: u64,
    pub timestamp: u64,
}

/// Resume state for a ranked full-text search (BM25 scoring lives above the
/// core; this only carries enough to resume the walk, spec.md §9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCursor {
    pub node_scores: std::collections::BTreeMap<String, f64>,
    pub node_keys: std::collections::BTreeMap<String, String>,
    pub query_hash: u64,
    pub timestamp: u64,
}

fn encode<T: Serialize>(envelope: &T) -> String {
    let json = serde_json::to_vec(envelope).expect("cursor envelope is always serializable");
    URL_SAFE_NO_PAD.encode(json)
}

fn decode<T: for<'de> Deserialize<'de>>(cursor: &str) -> CoreResult<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| CoreError::CursorInvalid { reason: "not valid base64url".to_string() })?;
    serde_json::from_slice(&bytes)
        .map_err(|_| CoreError::CursorInvalid { reason: "not a valid cursor envelope".to_string() })
}

/// Validates a decoded cursor's `queryHash` and age against the current
/// query and wall clock (spec.md §6: `queryHash` must match, `now -
/// timestamp < maxAgeMs`).
fn validate(query_hash: u64, timestamp: u64, expected_query_hash: u64, max_age_ms: u64, clock: &dyn ClockSource) -> CoreResult<()> {
    if query_hash != expected_query_hash {
        return Err(CoreError::CursorInvalid { reason: "query hash mismatch".to_string() });
    }
    let now = clock.now();
    if now.saturating_sub(timestamp) >= max_age_ms {
        return Err(CoreError::CursorInvalid { reason: "cursor expired".to_string() });
    }
    Ok(())
}

impl QueryCursor {
    /// Encodes this cursor as an opaque `base64url` string.
    #[must_use]
    pub fn encode(&self) -> String {
        encode(self)
    }

    /// Decodes and validates an opaque cursor against the current query's
    /// hash, using the real system clock and the default max age.
    pub fn decode(cursor: &str, expected_query_hash: u64) -> CoreResult<Self> {
        Self::decode_with(cursor, expected_query_hash, DEFAULT_MAX_AGE_MS, &SystemClock)
    }

    /// Decodes and validates, with an explicit max age and clock source (for
    /// deterministic tests).
    pub fn decode_with(
        cursor: &str,
        expected_query_hash: u64,
        max_age_ms: u64,
        clock: &dyn ClockSource,
    ) -> CoreResult<Self> {
        let decoded: Self = decode(cursor)?;
        validate(decoded.query_hash, decoded.timestamp, expected_query_hash, max_age_ms, clock)?;
        Ok(decoded)
    }
}

impl SearchCursor {
    /// Encodes this cursor as an opaque `base64url` string.
    #[must_use]
    pub fn encode(&self) -> String {
        encode(self)
    }

    /// Decodes and validates an opaque cursor against the current query's
    /// hash, using the real system clock and the default max age.
    pub fn decode(cursor: &str, expected_query_hash: u64) -> CoreResult<Self> {
        Self::decode_with(cursor, expected_query_hash, DEFAULT_MAX_AGE_MS, &SystemClock)
    }

    /// Decodes and validates, with an explicit max age and clock source (for
    /// deterministic tests).
    pub fn decode_with(
        cursor: &str,
        expected_query_hash: u64,
        max_age_ms: u64,
        clock: &dyn ClockSource,
    ) -> CoreResult<Self> {
        let decoded: Self = decode(cursor)?;
        validate(decoded.query_hash, decoded.timestamp, expected_query_hash, max_age_ms, clock)?;
        Ok(decoded)
    }
}
