//! Turns a [`Predicate`] into a [`Plan`] (spec.md §4.6's six planning
//! rules), and applies `optimizeWithOptions` hints.

use crate::error::{CoreError, CoreResult};
use crate::index::IndexRegistry;
use crate::predicate::{Op, Operand, Predicate};

use super::plan::Plan;

/// Hints accepted by [`optimize_with_options`] (spec.md §4.6). Precedence:
/// `disable_optimization > use_index > force_index_scan`.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Force an `IndexScan` on this attribute (lowest-cost index). Fails
    /// `NoSuchIndex` if no index covers it.
    pub use_index: Option<String>,
    /// Fail `NoIndexAvailable` if the chosen plan would be a `FullScan`.
    pub force_index_scan: bool,
    /// Ignore every other hint and return `FullScan` with no sort/limit/
    /// cursor applied.
    pub disable_optimization: bool,
}

/// Builds a plan for `predicate` following the default (unhinted) planning
/// rules 1-4 of spec.md §4.6.
#[must_use]
pub fn plan(predicate: &Predicate, registry: &IndexRegistry) -> Plan {
    match predicate {
        Predicate::Leaf { attribute, op, operand } => plan_leaf(attribute, *op, operand, registry, predicate),
        Predicate::And(children) => plan_and(children, registry),
        Predicate::Or(children) => plan_or(children, registry),
        Predicate::Not(inner) => Plan::Not(Box::new(plan(inner, registry))),
    }
}

fn plan_leaf(attribute: &str, op: Op, operand: &Operand, registry: &IndexRegistry, whole: &Predicate) -> Plan {
    if registry.best_index(attribute, op).is_some() {
        return Plan::IndexScan { attribute: attribute.to_string(), op, operand: operand.clone() };
    }
    // FTS ops are surface forms over inverted-index `contains` retrieval
    // (spec.md §4.6); the index only gives a token-overlap superset, so the
    // exact predicate is re-checked via `Filter`.
    if let (Op::Match | Op::MatchPhrase | Op::MatchPrefix, Operand::Text(text)) = (op, operand) {
        if registry.best_index(attribute, Op::Contains).is_some() {
            let scan = Plan::IndexScan {
                attribute: attribute.to_string(),
                op: Op::Contains,
                operand: Operand::Text(text.clone()),
            };
            return Plan::Filter(Box::new(scan), whole.clone());
        }
    }
    Plan::Filter(Box::new(Plan::FullScan), whole.clone())
}

fn plan_and(children: &[Predicate], registry: &IndexRegistry) -> Plan {
    let plans: Vec<Plan> = children.iter().map(|c| plan(c, registry)).collect();
    if plans.iter().all(|p| !p.is_unindexed()) {
        return Plan::And(plans);
    }

    let indexed: Vec<Plan> = plans.iter().zip(children).filter(|(p, _)| !p.is_unindexed()).map(|(p, _)| p.clone()).collect();
    let remaining: Vec<Predicate> =
        plans.iter().zip(children).filter(|(p, _)| p.is_unindexed()).map(|(_, c)| c.clone()).collect();

    let base = match indexed.len() {
        0 => Plan::FullScan,
        1 => indexed.into_iter().next().expect("len checked"),
        _ => Plan::And(indexed),
    };
    let remaining_predicate =
        if remaining.len() == 1 { remaining.into_iter().next().expect("len checked") } else { Predicate::And(remaining) };
    Plan::Filter(Box::new(base), remaining_predicate)
}

fn plan_or(children: &[Predicate], registry: &IndexRegistry) -> Plan {
    let plans: Vec<Plan> = children.iter().map(|c| plan(c, registry)).collect();
    if plans.iter().any(Plan::is_unindexed) {
        Plan::Filter(Box::new(Plan::FullScan), Predicate::Or(children.to_vec()))
    } else {
        Plan::Or(plans)
    }
}

/// Applies `optimizeWithOptions` hints on top of the default plan (spec.md
/// §4.6). Returns the bare plan for the predicate's match semantics; callers
/// wrap it in `Sort`/`Limit`/`Cursor` separately (those hints are orthogonal
/// to `QueryOptions`).
pub fn optimize_with_options(
    predicate: &Predicate,
    registry: &IndexRegistry,
    options: &QueryOptions,
) -> CoreResult<Plan> {
    if options.disable_optimization {
        return Ok(Plan::FullScan);
    }

    let chosen = match &options.use_index {
        Some(attribute) => plan_with_forced_index(predicate, registry, attribute)?,
        None => plan(predicate, registry),
    };

    if options.force_index_scan && chosen.is_unindexed() {
        let attribute = options.use_index.clone().unwrap_or_default();
        return Err(CoreError::NoIndexAvailable { attribute });
    }

    Ok(chosen)
}

/// Forces an `IndexScan` on `attribute` (spec.md §4.6's `useIndex` hint): the
/// tightest leaf op referencing `attribute` if one exists in `predicate`,
/// else a `has` scan. The full predicate is always re-checked via `Filter`,
/// so correctness never depends on the forced scan being tight.
fn plan_with_forced_index(predicate: &Predicate, registry: &IndexRegistry, attribute: &str) -> CoreResult<Plan> {
    let leaf = find_leaf_for_attribute(predicate, attribute);
    let op = leaf.map_or(Op::Has, |(op, _)| op);
    if registry.best_index(attribute, op).is_none() {
        return Err(CoreError::NoSuchIndex { attribute: attribute.to_string() });
    }
    let operand = leaf.map_or_else(|| Operand::Values(Vec::new()), |(_, operand)| operand.clone());
    let scan = Plan::IndexScan { attribute: attribute.to_string(), op, operand };
    Ok(Plan::Filter(Box::new(scan), predicate.clone()))
}

/// The first top-level leaf (the predicate itself, or a direct child of a
/// top-level `And`) referencing `attribute`.
fn find_leaf_for_attribute<'a>(predicate: &'a Predicate, attribute: &str) -> Option<(Op, &'a Operand)> {
    match predicate {
        Predicate::Leaf { attribute: attr, op, operand } if attr == attribute => Some((*op, operand)),
        Predicate::And(children) => children.iter().find_map(|c| find_leaf_for_attribute(c, attribute)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::field;
    use crate::index::HashIndex;
    use crate::value::Value;

    fn registry_with_hash_index(attr: &str) -> IndexRegistry {
        let mut reg = IndexRegistry::new();
        reg.register(Box::new(HashIndex::new(Box::new(field(attr)))));
        reg
    }

    fn leaf(attr: &str, op: Op, operand: Operand) -> Predicate {
        Predicate::Leaf { attribute: attr.to_string(), op, operand }
    }

    #[test]
    fn leaf_with_index_becomes_index_scan() {
        let reg = registry_with_hash_index("status");
        let p = leaf("status", Op::Eq, Operand::Value(Value::String("active".to_string())));
        assert!(matches!(plan(&p, &reg), Plan::IndexScan { .. }));
    }

    #[test]
    fn leaf_without_index_falls_back_to_full_scan_filter() {
        let reg = IndexRegistry::new();
        let p = leaf("status", Op::Eq, Operand::Value(Value::String("active".to_string())));
        let planned = plan(&p, &reg);
        assert!(matches!(planned, Plan::Filter(inner, _) if matches!(*inner, Plan::FullScan)));
    }

    #[test]
    fn and_with_mixed_indexed_children_wraps_remainder_in_filter() {
        let reg = registry_with_hash_index("status");
        let p = Predicate::And(vec![
            leaf("status", Op::Eq, Operand::Value(Value::String("active".to_string()))),
            leaf("age", Op::Gt, Operand::Value(Value::Int(18))),
        ]);
        let planned = plan(&p, &reg);
        match planned {
            Plan::Filter(inner, remaining) => {
                assert!(matches!(*inner, Plan::IndexScan { .. }));
                assert!(matches!(remaining, Predicate::Leaf { op: Op::Gt, .. }));
            }
            other => panic!("expected Filter, got {other:?}"),
        }
    }

    #[test]
    fn and_with_all_indexed_children_is_pure_and() {
        let mut reg = registry_with_hash_index("status");
        reg.register(Box::new(HashIndex::new(Box::new(field("age")))));
        let p = Predicate::And(vec![
            leaf("status", Op::Eq, Operand::Value(Value::String("active".to_string()))),
            leaf("age", Op::Eq, Operand::Value(Value::Int(18))),
        ]);
        assert!(matches!(plan(&p, &reg), Plan::And(children) if children.len() == 2));
    }

    #[test]
    fn or_degrades_fully_if_any_child_unindexed() {
        let reg = registry_with_hash_index("status");
        let p = Predicate::Or(vec![
            leaf("status", Op::Eq, Operand::Value(Value::String("active".to_string()))),
            leaf("age", Op::Gt, Operand::Value(Value::Int(18))),
        ]);
        let planned = plan(&p, &reg);
        assert!(matches!(planned, Plan::Filter(inner, Predicate::Or(_)) if matches!(*inner, Plan::FullScan)));
    }

    #[test]
    fn disable_optimization_always_returns_full_scan() {
        let reg = registry_with_hash_index("status");
        let p = leaf("status", Op::Eq, Operand::Value(Value::String("active".to_string())));
        let options = QueryOptions { disable_optimization: true, ..Default::default() };
        assert!(matches!(optimize_with_options(&p, &reg, &options).unwrap(), Plan::FullScan));
    }

    #[test]
    fn use_index_hint_fails_no_such_index_when_absent() {
        let reg = IndexRegistry::new();
        let p = leaf("status", Op::Eq, Operand::Value(Value::String("active".to_string())));
        let options = QueryOptions { use_index: Some("status".to_string()), ..Default::default() };
        let err = optimize_with_options(&p, &reg, &options).unwrap_err();
        assert_eq!(err, CoreError::NoSuchIndex { attribute: "status".to_string() });
    }

    #[test]
    fn force_index_scan_fails_when_plan_is_full_scan() {
        let reg = IndexRegistry::new();
        let p = leaf("status", Op::Eq, Operand::Value(Value::String("active".to_string())));
        let options = QueryOptions { force_index_scan: true, ..Default::default() };
        let err = optimize_with_options(&p, &reg, &options).unwrap_err();
        assert_eq!(err, CoreError::NoIndexAvailable { attribute: String::new() });
    }

    #[test]
    fn use_index_extracts_matching_leaf_op() {
        let reg = registry_with_hash_index("status");
        let p = Predicate::And(vec![
            leaf("status", Op::Eq, Operand::Value(Value::String("active".to_string()))),
            leaf("age", Op::Gt, Operand::Value(Value::Int(18))),
        ]);
        let options = QueryOptions { use_index: Some("status".to_string()), ..Default::default() };
        let planned = optimize_with_options(&p, &reg, &options).unwrap();
        match planned {
            Plan::Filter(inner, _) => match *inner {
                Plan::IndexScan { op, .. } => assert_eq!(op, Op::Eq),
                other => panic!("expected IndexScan, got {other:?}"),
            },
            other => panic!("expected Filter, got {other:?}"),
        }
    }
}
