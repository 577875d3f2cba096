//! `DefaultIndexingStrategy` (spec.md §4.8): on the first record inserted
//! into a fresh map, introspects its top-level scalar fields and registers
//! a sensible index per field, applied exactly once.

use regex::Regex;
use std::sync::OnceLock;

use crate::attribute::field;
use crate::index::{HashIndex, Index, IndexRegistry, NavigableIndex};
use crate::value::Value;

/// Field-name substrings that mark a probable date/time field.
const DATE_NAME_HINTS: &[&str] = &["date", "time"];
/// Field-name substrings that mark a probable free-text field, skipped
/// entirely rather than indexed.
const DESCRIPTION_NAME_HINTS: &[&str] = &["description", "content", "body", "text", "notes", "comment"];
/// Sample values longer than this are assumed free text, not enum-like.
const DESCRIPTION_LENGTH_THRESHOLD: usize = 100;

fn iso8601_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}([T ]\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:?\d{2})?)?$")
            .expect("static pattern is valid")
    })
}

fn is_date_like(name: &str, sample: &Value) -> bool {
    let lower = name.to_lowercase();
    if DATE_NAME_HINTS.iter().any(|hint| lower.contains(hint)) {
        return true;
    }
    if name.ends_with("At") || lower.ends_with("_at") {
        return true;
    }
    matches!(sample, Value::String(s) if iso8601_regex().is_match(s))
}

fn is_description_like(name: &str, sample: &Value) -> bool {
    let lower = name.to_lowercase();
    if DESCRIPTION_NAME_HINTS.iter().any(|hint| lower.contains(hint)) {
        return true;
    }
    matches!(sample, Value::String(s) if s.chars().count() > DESCRIPTION_LENGTH_THRESHOLD)
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Map(_) | Value::Array(_))
}

/// Applies a default indexing policy to the first record a fresh map sees.
/// Introspects the record's top-level fields only; nested-field
/// introspection (the spec's `mode = "all"`) is not implemented -- every
/// record in this engine's examples is shallow enough that top-level
/// introspection covers the common case, and a deeper walk would need a
/// recursive attribute-path naming scheme the rest of the index layer
/// doesn't have yet.
pub struct DefaultIndexingStrategy {
    applied: bool,
}

impl Default for DefaultIndexingStrategy {
    fn default() -> Self {
        Self { applied: false }
    }
}

impl DefaultIndexingStrategy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether [`Self::apply_once`] has already run.
    #[must_use]
    pub fn has_applied(&self) -> bool {
        self.applied
    }

    /// Introspects `record` and registers one index per eligible top-level
    /// scalar field into `registry`. A no-op on every call after the first.
    /// Returns the attribute names it indexed.
    pub fn apply_once(&mut self, record: &Value, registry: &mut IndexRegistry) -> Vec<String> {
        if self.applied {
            return Vec::new();
        }
        self.applied = true;

        let Value::Map(fields) = record else { return Vec::new() };
        let mut indexed = Vec::new();
        for (name, sample) in fields {
            if !is_scalar(sample) || is_description_like(name, sample) {
                continue;
            }
            let index: Box<dyn Index> = if matches!(sample, Value::Int(_) | Value::Float(_)) || is_date_like(name, sample) {
                Box::new(NavigableIndex::new(Box::new(field(name.clone()))))
            } else {
                Box::new(HashIndex::new(Box::new(field(name.clone()))))
            };
            registry.register(index);
            indexed.push(name.clone());
        }
        indexed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record() -> Value {
        let mut m = BTreeMap::new();
        m.insert("status".to_string(), Value::String("active".to_string()));
        m.insert("age".to_string(), Value::Int(30));
        m.insert("createdAt".to_string(), Value::String("2024-01-01T00:00:00Z".to_string()));
        m.insert("description".to_string(), Value::String("a".repeat(200)));
        m.insert("tags".to_string(), Value::Array(vec![Value::String("a".to_string())]));
        Value::Map(m)
    }

    #[test]
    fn introspects_top_level_fields_on_first_record() {
        let mut strategy = DefaultIndexingStrategy::new();
        let mut registry = IndexRegistry::new();
        let indexed = strategy.apply_once(&record(), &mut registry);

        assert!(indexed.contains(&"status".to_string()));
        assert!(indexed.contains(&"age".to_string()));
        assert!(indexed.contains(&"createdAt".to_string()));
        assert!(!indexed.contains(&"description".to_string()));
        assert!(!indexed.contains(&"tags".to_string()));
    }

    #[test]
    fn numeric_and_date_like_fields_get_navigable_indexes() {
        let mut strategy = DefaultIndexingStrategy::new();
        let mut registry = IndexRegistry::new();
        strategy.apply_once(&record(), &mut registry);

        use crate::index::IndexKind;
        assert_eq!(registry.indexes_for("age")[0].kind(), IndexKind::Navigable);
        assert_eq!(registry.indexes_for("createdAt")[0].kind(), IndexKind::Navigable);
        assert_eq!(registry.indexes_for("status")[0].kind(), IndexKind::Hash);
    }

    #[test]
    fn applies_exactly_once() {
        let mut strategy = DefaultIndexingStrategy::new();
        let mut registry = IndexRegistry::new();
        strategy.apply_once(&record(), &mut registry);
        assert!(strategy.has_applied());
        let second = strategy.apply_once(&record(), &mut registry);
        assert!(second.is_empty());
    }

    #[test]
    fn iso8601_sample_value_detected_without_date_like_name() {
        let mut m = BTreeMap::new();
        m.insert("when".to_string(), Value::String("2024-06-15T10:00:00Z".to_string()));
        let mut strategy = DefaultIndexingStrategy::new();
        let mut registry = IndexRegistry::new();
        let indexed = strategy.apply_once(&Value::Map(m), &mut registry);
        assert_eq!(indexed, vec!["when".to_string()]);
        use crate::index::IndexKind;
        assert_eq!(registry.indexes_for("when")[0].kind(), IndexKind::Navigable);
    }
}
