//! Attribute extractors (spec.md §4.5): the bridge between a stored record
//! and the scalar (or multi-valued) field an index is built over.

use crate::value::Value;

/// Common surface indexes extract through, regardless of whether the
/// underlying extractor is a [`SimpleAttribute`] or a [`MultiAttribute`].
pub trait Attribute: Send + Sync {
    /// The attribute's name, used as the `IndexRegistry` lookup key.
    fn name(&self) -> &str;
    /// Every value this attribute contributes for `record` (0, 1, or many).
    fn extract_many(&self, record: &Value) -> Vec<Value>;
}

/// Extracts zero-or-one attribute value from a record.
///
/// Built with [`simple_attribute`]. A record that does not carry the field
/// contributes nothing to the index (the extractor returns `None`).
pub struct SimpleAttribute {
    name: String,
    extractor: Box<dyn Fn(&Value) -> Option<Value> + Send + Sync>,
}

impl SimpleAttribute {
    /// The attribute's name, used as the `IndexRegistry` lookup key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the extractor against a record.
    #[must_use]
    pub fn extract(&self, record: &Value) -> Option<Value> {
        (self.extractor)(record)
    }
}

impl Attribute for SimpleAttribute {
    fn name(&self) -> &str {
        self.name()
    }

    fn extract_many(&self, record: &Value) -> Vec<Value> {
        self.extract(record).into_iter().collect()
    }
}

/// Extracts zero, one, or many attribute values from a record (e.g. a tag
/// list field indexed so any tag matches).
pub struct MultiAttribute {
    name: String,
    extractor: Box<dyn Fn(&Value) -> Vec<Value> + Send + Sync>,
}

impl MultiAttribute {
    /// The attribute's name, used as the `IndexRegistry` lookup key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the extractor against a record.
    #[must_use]
    pub fn extract(&self, record: &Value) -> Vec<Value> {
        (self.extractor)(record)
    }
}

impl Attribute for MultiAttribute {
    fn name(&self) -> &str {
        self.name()
    }

    fn extract_many(&self, record: &Value) -> Vec<Value> {
        self.extract(record)
    }
}

/// Builds a [`SimpleAttribute`] from a name and a record -> value function.
pub fn simple_attribute(
    name: impl Into<String>,
    f: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static,
) -> SimpleAttribute {
    SimpleAttribute { name: name.into(), extractor: Box::new(f) }
}

/// Builds a [`MultiAttribute`] from a name and a record -> values function.
pub fn multi_attribute(
    name: impl Into<String>,
    f: impl Fn(&Value) -> Vec<Value> + Send + Sync + 'static,
) -> MultiAttribute {
    MultiAttribute { name: name.into(), extractor: Box::new(f) }
}

/// Extracts a named top-level field from a `Value::Map` record. The common
/// case: indexes built over a JSON-object-shaped record.
#[must_use]
pub fn field(name: impl Into<String>) -> SimpleAttribute {
    let field_name = name.into();
    simple_attribute(field_name.clone(), move |record| match record {
        Value::Map(map) => map.get(&field_name).cloned().filter(|v| !v.is_null()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn record(pairs: &[(&str, Value)]) -> Value {
        let mut map = BTreeMap::new();
        for (k, v) in pairs {
            map.insert((*k).to_string(), v.clone());
        }
        Value::Map(map)
    }

    #[test]
    fn field_extracts_present_value() {
        let attr = field("status");
        let rec = record(&[("status", Value::String("active".to_string()))]);
        assert_eq!(attr.extract(&rec), Some(Value::String("active".to_string())));
    }

    #[test]
    fn field_returns_none_when_absent() {
        let attr = field("status");
        let rec = record(&[("other", Value::Int(1))]);
        assert_eq!(attr.extract(&rec), None);
    }

    #[test]
    fn field_returns_none_for_null_value() {
        let attr = field("status");
        let rec = record(&[("status", Value::Null)]);
        assert_eq!(attr.extract(&rec), None);
    }

    #[test]
    fn field_returns_none_for_non_map_record() {
        let attr = field("status");
        assert_eq!(attr.extract(&Value::Int(5)), None);
    }

    #[test]
    fn multi_attribute_extracts_array_elements() {
        let attr = multi_attribute("tags", |record| match record {
            Value::Map(map) => match map.get("tags") {
                Some(Value::Array(items)) => items.clone(),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        });
        let rec = record(&[(
            "tags",
            Value::Array(vec![Value::String("a".to_string()), Value::String("b".to_string())]),
        )]);
        assert_eq!(attr.extract(&rec).len(), 2);
    }
}
