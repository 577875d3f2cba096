//! `QuantizedNavigableIndex` (spec.md §4.5.d): wraps a [`NavigableIndex`],
//! bucketing attribute values through a [`Quantizer`] before they reach the
//! underlying ordered map. Trades precision for fewer, denser buckets --
//! useful for high-cardinality numeric or timestamp attributes.

use crate::attribute::Attribute;
use crate::predicate::{Op, Operand};
use crate::result_set::ResultSet;
use crate::value::Value;

use super::navigable_index::NavigableIndex;
use super::{Index, IndexKind, IndexStats};

/// Maps an attribute value onto a coarser representative value before it is
/// inserted into the underlying [`NavigableIndex`].
pub trait Quantizer: Send + Sync {
    fn quantize(&self, value: &Value) -> Value;
}

/// Rounds integers down to the nearest multiple of `step`.
pub struct IntegerMultipleQuantizer {
    step: i64,
}

impl IntegerMultipleQuantizer {
    #[must_use]
    pub fn new(step: i64) -> Self {
        Self { step: step.max(1) }
    }
}

impl Quantizer for IntegerMultipleQuantizer {
    fn quantize(&self, value: &Value) -> Value {
        match value {
            Value::Int(i) => Value::Int((i.div_euclid(self.step)) * self.step),
            Value::Float(f) => {
                let bucket = (f / self.step as f64).floor() * self.step as f64;
                Value::Float(bucket)
            }
            other => other.clone(),
        }
    }
}

/// Buckets millisecond timestamps into fixed-width intervals.
pub struct TimestampIntervalQuantizer {
    interval_ms: i64,
}

impl TimestampIntervalQuantizer {
    #[must_use]
    pub fn new(interval_ms: i64) -> Self {
        Self { interval_ms: interval_ms.max(1) }
    }
}

impl Quantizer for TimestampIntervalQuantizer {
    fn quantize(&self, value: &Value) -> Value {
        match value {
            Value::Int(ms) => Value::Int(ms.div_euclid(self.interval_ms) * self.interval_ms),
            other => other.clone(),
        }
    }
}

/// Rounds down to the nearest power of 10 (`0`, `1`, `10`, `100`, ...).
pub struct PowerOf10Quantizer;

impl Quantizer for PowerOf10Quantizer {
    fn quantize(&self, value: &Value) -> Value {
        match value.as_f64() {
            Some(f) if f > 0.0 => Value::Float(10f64.powf(f.log10().floor())),
            Some(f) if f < 0.0 => Value::Float(-(10f64.powf((-f).log10().floor()))),
            Some(_) => Value::Float(0.0),
            None => value.clone(),
        }
    }
}

/// Buckets by floor of `log_base(value)`.
pub struct LogarithmicQuantizer {
    base: f64,
}

impl LogarithmicQuantizer {
    #[must_use]
    pub fn new(base: f64) -> Self {
        Self { base: if base > 1.0 { base } else { std::f64::consts::E } }
    }
}

impl Quantizer for LogarithmicQuantizer {
    fn quantize(&self, value: &Value) -> Value {
        match value.as_f64() {
            Some(f) if f > 0.0 => Value::Float(f.log(self.base).floor()),
            Some(_) => Value::Float(0.0),
            None => value.clone(),
        }
    }
}

/// An [`Attribute`] wrapper that quantizes each extracted value before it
/// reaches the underlying index.
struct QuantizedAttribute {
    inner: Box<dyn Attribute>,
    quantizer: Box<dyn Quantizer>,
}

impl Attribute for QuantizedAttribute {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn extract_many(&self, record: &Value) -> Vec<Value> {
        self.inner.extract_many(record).iter().map(|v| self.quantizer.quantize(v)).collect()
    }
}

/// A [`NavigableIndex`] whose keys are quantized representatives rather than
/// exact attribute values.
pub struct QuantizedNavigableIndex {
    inner: NavigableIndex,
}

impl QuantizedNavigableIndex {
    #[must_use]
    pub fn new(attribute: Box<dyn Attribute>, quantizer: Box<dyn Quantizer>) -> Self {
        let quantized = QuantizedAttribute { inner: attribute, quantizer };
        Self { inner: NavigableIndex::new(Box::new(quantized)) }
    }
}

impl Index for QuantizedNavigableIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Navigable
    }

    fn attribute(&self) -> &str {
        self.inner.attribute()
    }

    fn supports_query(&self, op: Op) -> bool {
        self.inner.supports_query(op)
    }

    fn retrieval_cost(&self) -> u32 {
        self.inner.retrieval_cost()
    }

    fn add(&mut self, key: &str, record: &Value) {
        self.inner.add(key, record);
    }

    fn update(&mut self, key: &str, old: &Value, new: &Value) {
        self.inner.update(key, old, new);
    }

    fn remove(&mut self, key: &str, record: &Value) {
        self.inner.remove(key, record);
    }

    fn clear(&mut self) {
        self.inner.clear();
    }

    fn retrieve(&self, op: Op, operand: &Operand) -> ResultSet {
        self.inner.retrieve(op, operand)
    }

    fn stats(&self) -> IndexStats {
        self.inner.stats()
    }
}
