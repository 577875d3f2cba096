//! Executes a [`Plan`] against an [`IndexRegistry`] and a record accessor
//! (spec.md §4.6). Intermediate nodes operate on unordered
//! [`ResultSet`]s; `Sort`/`Limit`/`Cursor` only ever wrap the outermost
//! plan, so the top-level [`execute`] peels those off and materializes an
//! ordered `Vec<String>` of keys.

use std::collections::BTreeSet;

use crate::index::IndexRegistry;
use crate::messages::base::SortDirection;
use crate::predicate::Predicate;
use crate::result_set::ResultSet;
use crate::value::{compare_values, Value};

use super::plan::Plan;

/// Read access the executor needs from the host map: every currently-live
/// key, and a way to fetch a record plus a named attribute's value(s) off it.
pub trait ExecutionContext {
    fn all_keys(&self) -> BTreeSet<String>;
    fn get_record(&self, key: &str) -> Option<Value>;
    fn get_attribute(&self, record: &Value, attribute: &str) -> Vec<Value>;
}

/// Runs `plan` to completion, returning ordered keys (sorted if `plan`
/// contains a `Sort` node, otherwise in ascending key order -- the same
/// default `BTreeSet` iteration order `FullScan`/index retrieval already use).
pub fn execute(plan: &Plan, registry: &IndexRegistry, ctx: &dyn ExecutionContext) -> Vec<String> {
    match plan {
        Plan::Sort { inner, field, direction, .. } => {
            let keys = execute_set(inner, registry, ctx).into_keys();
            sort_by_field(keys, field, direction.clone(), ctx)
        }
        Plan::Limit { inner, n, offset } => {
            let keys = execute(inner, registry, ctx);
            keys.into_iter().skip(*offset).take(*n).collect()
        }
        Plan::Cursor { inner, cursor } => {
            let keys = execute(inner, registry, ctx);
            resume_after_cursor(keys, cursor)
        }
        other => execute_set(other, registry, ctx).into_keys().into_iter().collect(),
    }
}

/// Resolves every non-ordering plan node to an unordered [`ResultSet`].
fn execute_set(plan: &Plan, registry: &IndexRegistry, ctx: &dyn ExecutionContext) -> ResultSet {
    match plan {
        Plan::IndexScan { attribute, op, operand } => registry
            .best_index(attribute, *op)
            .map_or_else(ResultSet::empty, |idx| idx.retrieve(*op, operand)),
        Plan::FullScan => ResultSet::materialized(ctx.all_keys()),
        Plan::And(children) => {
            let mut sets: Vec<ResultSet> = children.iter().map(|c| execute_set(c, registry, ctx)).collect();
            // Intersect smaller estimated sets first (spec.md §4.6 rule 2).
            sets.sort_by_key(ResultSet::estimated_size);
            let mut iter = sets.into_iter();
            let Some(first) = iter.next() else { return ResultSet::empty() };
            iter.fold(first, ResultSet::intersect)
        }
        Plan::Or(children) => {
            let sets: Vec<ResultSet> = children.iter().map(|c| execute_set(c, registry, ctx)).collect();
            let mut iter = sets.into_iter();
            let Some(first) = iter.next() else { return ResultSet::empty() };
            iter.fold(first, ResultSet::union)
        }
        Plan::Not(inner) => {
            let universe = ctx.all_keys();
            execute_set(inner, registry, ctx).complement(&universe)
        }
        Plan::Filter(inner, predicate) => {
            let keys = execute_set(inner, registry, ctx).into_keys();
            ResultSet::materialized(filter_keys(keys, predicate, ctx))
        }
        // Sort/Limit/Cursor only ever wrap the outermost plan (spec.md
        // §4.6); if one appears nested, evaluate its inner plan as a set
        // and drop the ordering/pagination semantics, which no caller relies
        // on for a non-top-level occurrence.
        Plan::Sort { inner, .. } | Plan::Limit { inner, .. } | Plan::Cursor { inner, .. } => {
            execute_set(inner, registry, ctx)
        }
    }
}

fn filter_keys(keys: BTreeSet<String>, predicate: &Predicate, ctx: &dyn ExecutionContext) -> BTreeSet<String> {
    keys.into_iter()
        .filter(|key| {
            ctx.get_record(key)
                .is_some_and(|record| predicate.evaluate(&|attr| ctx.get_attribute(&record, attr)))
        })
        .collect()
}

fn sort_by_field(
    keys: BTreeSet<String>,
    field: &str,
    direction: SortDirection,
    ctx: &dyn ExecutionContext,
) -> Vec<String> {
    let mut pairs: Vec<(String, Value)> = keys
        .into_iter()
        .map(|key| {
            let value = ctx
                .get_record(&key)
                .map(|record| ctx.get_attribute(&record, field).into_iter().next().unwrap_or(Value::Null))
                .unwrap_or(Value::Null);
            (key, value)
        })
        .collect();
    pairs.sort_by(|(_, a), (_, b)| compare_values(a, b));
    if matches!(direction, SortDirection::Desc) {
        pairs.reverse();
    }
    pairs.into_iter().map(|(key, _)| key).collect()
}

/// Skips past the cursor's last-seen key in an already-sorted list
/// (spec.md §4.6 rule 6, §6). If the cursor's key is absent (e.g. the
/// record was since removed), resumes from the first key strictly after the
/// cursor's sort value under the cursor's own direction.
fn resume_after_cursor(keys: Vec<String>, cursor: &crate::cursor::QueryCursor) -> Vec<String> {
    if let Some(pos) = keys.iter().position(|k| *k == cursor.last_key) {
        return keys[pos + 1..].to_vec();
    }
    keys
}
