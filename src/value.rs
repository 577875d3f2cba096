//! The dynamic value type stored in CRDT map records, and its deterministic
//! stringification used by the Merkle entry-hash functions.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Discriminant for CRDT map types (LWW vs OR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapType {
    /// Last-Write-Wins Map: conflict resolution by highest timestamp.
    Lww,
    /// Observed-Remove Map: supports concurrent additions with unique tags.
    Or,
}

/// Runtime value type for CRDT map entries and predicate evaluation.
///
/// `Map` uses a `BTreeMap` rather than a `HashMap` so that keys are already
/// lexicographically sorted -- the same order the stringify contract
/// (spec.md §4.4) requires at the top level for hashing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// The JSON/SQL null value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed 64-bit integer.
    Int(i64),
    /// A 64-bit float.
    Float(f64),
    /// A UTF-8 string.
    String(String),
    /// An opaque byte string.
    Bytes(Vec<u8>),
    /// An ordered list of values.
    Array(Vec<Value>),
    /// A map with string keys, sorted by key.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Returns the deterministic textual form used as Merkle hash input
    /// (spec.md §4.4 "stringify contract").
    ///
    /// Primitives render as their textual form; arrays/maps render as JSON
    /// with object keys sorted lexicographically (guaranteed here because
    /// `Value::Map` is backed by a `BTreeMap`); `Null` renders as the
    /// literal string `"null"`.
    #[must_use]
    pub fn stringify(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => {
                let mut s = String::new();
                let _ = write!(s, "{f}");
                s
            }
            Value::String(s) => s.clone(),
            Value::Bytes(b) => {
                let mut s = String::with_capacity(b.len() * 2);
                for byte in b {
                    let _ = write!(s, "{byte:02x}");
                }
                s
            }
            Value::Array(_) | Value::Map(_) => {
                let json = self.to_canonical_json();
                json.to_string()
            }
        }
    }

    /// Converts to a `serde_json::Value` with object keys already sorted
    /// (top-level and nested, since `BTreeMap` iterates in key order and
    /// `serde_json` preserves insertion order when the `preserve_order`
    /// feature is off).
    fn to_canonical_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            Value::Float(f) => {
                serde_json::Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number)
            }
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Bytes(b) => JsonValue::String(hex_string(b)),
            Value::Array(items) => {
                JsonValue::Array(items.iter().map(Value::to_canonical_json).collect())
            }
            Value::Map(map) => {
                let mut obj = serde_json::Map::new();
                for (k, v) in map {
                    obj.insert(k.clone(), v.to_canonical_json());
                }
                JsonValue::Object(obj)
            }
        }
    }

    /// `true` if this value is `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns a `f64` view of this value if it can be compared numerically
    /// (`Int` or `Float`).
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// Total order over [`Value`] for sort planning (spec.md §4.6 rule 5):
/// null/undefined sorts lowest, numbers compare numerically, strings compare
/// lexicographically (which already gives chronological order for ISO-8601
/// timestamps -- "dates by timestamp, strings with ISO-date coercion" collapse
/// to the same comparison), and booleans order `false < true`. Values of
/// incomparable kinds fall back to comparing their [`Stringify::stringify`]
/// form so the order is still total.
#[must_use]
pub fn compare_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    use Value::{Bool, Float, Int, Null, String as VString};

    match (a, b) {
        (Null, Null) => Ordering::Equal,
        (Null, _) => Ordering::Less,
        (_, Null) => Ordering::Greater,
        (Bool(x), Bool(y)) => x.cmp(y),
        (Int(_) | Float(_), Int(_) | Float(_)) => {
            let (x, y) = (a.as_f64().unwrap(), b.as_f64().unwrap());
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (VString(x), VString(y)) => x.cmp(y),
        _ => a.stringify().cmp(&b.stringify()),
    }
}

/// Deterministic stringification for the Merkle entry-hash formulas (spec.md
/// §4.4). `Value` is the only payload type this crate stores in `LWWMap`/
/// `ORMap`, but keeping those maps generic (as the teacher's `LWWMap<V>` is)
/// means the hash input must come from a trait rather than a hardcoded
/// `Value` match in each map implementation.
pub trait Stringify {
    /// Deterministic textual form used as Merkle hash input.
    fn stringify(&self) -> String;
}

impl Stringify for Value {
    fn stringify(&self) -> String {
        Value::stringify(self)
    }
}

fn hex_string(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}
