//! Predicate AST and query operator vocabulary (spec.md §4.6).
//!
//! A `Predicate` is either a `Leaf` naming an attribute, an operator, and an
//! operand, or a boolean combinator (`And`/`Or`/`Not`) over child predicates.
//! [`Predicate::evaluate`] is the reference linear-scan semantics every index
//! plan must agree with (spec.md §8's round-trip law `query(p) == filter(p)`).

use std::fmt;

use regex::{escape, Regex};

use crate::value::{compare_values, Value};

/// The complete query-operator vocabulary (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Between,
    In,
    Like,
    Regex,
    Contains,
    ContainsAll,
    ContainsAny,
    Match,
    MatchPhrase,
    MatchPrefix,
    /// Index-level "return every key this index covers" scan (spec.md
    /// §4.5's index contract and §4.6's `useIndex`-hint degradation path).
    /// Not part of the `Predicate` surface grammar -- no `Predicate::Leaf`
    /// is ever built with this op.
    Has,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Op::Eq => "eq",
            Op::Neq => "neq",
            Op::Gt => "gt",
            Op::Gte => "gte",
            Op::Lt => "lt",
            Op::Lte => "lte",
            Op::Between => "between",
            Op::In => "in",
            Op::Like => "like",
            Op::Regex => "regex",
            Op::Contains => "contains",
            Op::ContainsAll => "containsAll",
            Op::ContainsAny => "containsAny",
            Op::Match => "match",
            Op::MatchPhrase => "matchPhrase",
            Op::MatchPrefix => "matchPrefix",
            Op::Has => "has",
        };
        f.write_str(s)
    }
}

/// Operand carried by a [`Predicate::Leaf`]. Distinct from `Op` because some
/// operators take a single value, some a list, and the FTS operators take a
/// free-text query string.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A single scalar operand (`eq`, `gt`, `like`, `regex`, `contains`, ...).
    Value(Value),
    /// A list operand (`in`, `containsAll`, `containsAny`).
    Values(Vec<Value>),
    /// `between`'s two bounds, with inclusivity flags (spec.md §4.5.b:
    /// defaults `[inclusive, exclusive)`).
    Range { from: Value, from_inclusive: bool, to: Value, to_inclusive: bool },
    /// A free-text query string for `match`/`matchPhrase`/`matchPrefix`.
    Text(String),
}

/// A query predicate tree.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// A single `attribute op operand` test.
    Leaf { attribute: String, op: Op, operand: Operand },
    /// All children must match.
    And(Vec<Predicate>),
    /// At least one child must match.
    Or(Vec<Predicate>),
    /// The child must not match.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Reference (non-indexed) evaluation of this predicate against a
    /// record, given a way to read an attribute's value(s) off the record.
    ///
    /// `get_attr` returns every value the named attribute contributes for
    /// this record (zero for absent/simple-null, one for a simple attribute,
    /// many for a multi-attribute such as a tag list).
    pub fn evaluate(&self, get_attr: &dyn Fn(&str) -> Vec<Value>) -> bool {
        match self {
            Predicate::Leaf { attribute, op, operand } => {
                let values = get_attr(attribute);
                eval_leaf(*op, operand, &values)
            }
            Predicate::And(children) => children.iter().all(|c| c.evaluate(get_attr)),
            Predicate::Or(children) => children.iter().any(|c| c.evaluate(get_attr)),
            Predicate::Not(inner) => !inner.evaluate(get_attr),
        }
    }

    /// All attribute names referenced anywhere in this predicate tree
    /// (used by the planner to find candidate indexes).
    #[must_use]
    pub fn attributes(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_attributes(&mut out);
        out
    }

    fn collect_attributes<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Predicate::Leaf { attribute, .. } => out.push(attribute),
            Predicate::And(children) | Predicate::Or(children) => {
                for c in children {
                    c.collect_attributes(out);
                }
            }
            Predicate::Not(inner) => inner.collect_attributes(out),
        }
    }
}

fn eval_leaf(op: Op, operand: &Operand, values: &[Value]) -> bool {
    match op {
        Op::Eq => values.iter().any(|v| v == operand_value(operand)),
        Op::Neq => values.iter().all(|v| v != operand_value(operand)),
        Op::Gt => values.iter().any(|v| compare_values(v, operand_value(operand)).is_gt()),
        Op::Gte => values.iter().any(|v| compare_values(v, operand_value(operand)).is_ge()),
        Op::Lt => values.iter().any(|v| compare_values(v, operand_value(operand)).is_lt()),
        Op::Lte => values.iter().any(|v| compare_values(v, operand_value(operand)).is_le()),
        Op::Between => {
            let Operand::Range { from, from_inclusive, to, to_inclusive } = operand else {
                return false;
            };
            values.iter().any(|v| in_range(v, from, *from_inclusive, to, *to_inclusive))
        }
        Op::In => {
            let Operand::Values(candidates) = operand else { return false };
            values.iter().any(|v| candidates.contains(v))
        }
        Op::Like => {
            let Operand::Value(Value::String(pattern)) = operand else { return false };
            values.iter().any(|v| matches_like(v, pattern))
        }
        Op::Regex => {
            let Operand::Value(Value::String(pattern)) = operand else { return false };
            let Ok(re) = Regex::new(pattern) else { return false };
            values.iter().any(|v| matches!(v, Value::String(s) if re.is_match(s)))
        }
        Op::Contains => {
            let Operand::Text(query) = operand else { return false };
            values.iter().any(|v| text_of(v).to_lowercase().contains(&query.to_lowercase()))
        }
        Op::ContainsAll => {
            let Operand::Values(candidates) = operand else { return false };
            candidates.iter().all(|c| values.contains(c))
        }
        Op::ContainsAny => {
            let Operand::Values(candidates) = operand else { return false };
            candidates.iter().any(|c| values.contains(c))
        }
        // Full-text ops are surface forms the planner maps onto inverted-index
        // retrievals (spec.md §4.6); the reference linear-scan semantics here
        // approximate them as lowercase substring/phrase containment so that
        // `query(p) == filter(p)` still holds without an index.
        Op::Match | Op::MatchPrefix => {
            let Operand::Text(query) = operand else { return false };
            let needle = query.to_lowercase();
            values.iter().any(|v| {
                text_of(v)
                    .to_lowercase()
                    .split(|c: char| !c.is_alphanumeric())
                    .any(|tok| {
                        if matches!(op, Op::MatchPrefix) {
                            tok.starts_with(&needle)
                        } else {
                            tok == needle
                        }
                    })
            })
        }
        Op::MatchPhrase => {
            let Operand::Text(query) = operand else { return false };
            values.iter().any(|v| text_of(v).to_lowercase().contains(&query.to_lowercase()))
        }
        // Not a predicate-grammar operator (see `Op::Has`'s doc comment).
        Op::Has => false,
    }
}

fn operand_value(operand: &Operand) -> &Value {
    match operand {
        Operand::Value(v) => v,
        _ => &Value::Null,
    }
}

fn in_range(v: &Value, from: &Value, from_inclusive: bool, to: &Value, to_inclusive: bool) -> bool {
    let lower_ok = if from_inclusive {
        compare_values(v, from).is_ge()
    } else {
        compare_values(v, from).is_gt()
    };
    let upper_ok = if to_inclusive {
        compare_values(v, to).is_le()
    } else {
        compare_values(v, to).is_lt()
    };
    lower_ok && upper_ok
}

fn text_of(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.stringify_for_text(),
    }
}

trait StringifyForText {
    fn stringify_for_text(&self) -> String;
}

impl StringifyForText for Value {
    fn stringify_for_text(&self) -> String {
        use crate::value::Stringify;
        self.stringify()
    }
}

/// Compiles a SQL-style `like` pattern (`%` -> any run of characters, `_` ->
/// any single character) to a case-insensitive anchored match (spec.md
/// §4.6).
fn matches_like(v: &Value, pattern: &str) -> bool {
    let Value::String(s) = v else { return false };
    let mut regex_pattern = String::with_capacity(pattern.len() + 2);
    regex_pattern.push('^');
    for c in pattern.chars() {
        match c {
            '%' => regex_pattern.push_str(".*"),
            '_' => regex_pattern.push('.'),
            _ => regex_pattern.push_str(&escape(&c.to_string())),
        }
    }
    regex_pattern.push('$');
    Regex::new(&format!("(?i){regex_pattern}"))
        .map(|re| re.is_match(s))
        .unwrap_or(false)
}
