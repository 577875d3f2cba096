//! Query planner and executor (spec.md §4.6): turns a [`Predicate`] into a
//! [`Plan`] against an [`IndexRegistry`], then executes that plan to an
//! ordered key list.

pub mod executor;
pub mod plan;
pub mod planner;

pub use executor::{execute, ExecutionContext};
pub use plan::{Plan, QueryExplanation};
pub use planner::{optimize_with_options, plan as plan_query, QueryOptions};

use crate::error::CoreResult;
use crate::index::IndexRegistry;
use crate::predicate::{Operand, Predicate};
use crate::value::{Stringify, Value};

/// Builds the plan for `predicate` under the default (unhinted) planning
/// rules and reports its estimated cost (spec.md §4.6's `explainQuery`).
#[must_use]
pub fn explain_query(predicate: &Predicate, registry: &IndexRegistry) -> QueryExplanation {
    QueryExplanation::new(plan_query(predicate, registry), registry)
}

/// Plans (honoring `options`) and immediately executes `predicate` against
/// `ctx`, returning ordered keys.
pub fn run_query(
    predicate: &Predicate,
    registry: &IndexRegistry,
    ctx: &dyn ExecutionContext,
    options: &QueryOptions,
) -> CoreResult<Vec<String>> {
    let plan = optimize_with_options(predicate, registry, options)?;
    Ok(execute(&plan, registry, ctx))
}

/// A structural, deterministic hash of a predicate tree, used by
/// [`crate::live_query::LiveQueryManager`] to key tracked queries and by
/// [`crate::cursor`] to bind a cursor to the query it was minted for
/// (spec.md §4.7: "canonically hash the query (structural)").
#[must_use]
pub fn query_hash(predicate: &Predicate) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    canonical_string(predicate).hash(&mut hasher);
    hasher.finish()
}

fn canonical_string(predicate: &Predicate) -> String {
    match predicate {
        Predicate::Leaf { attribute, op, operand } => {
            format!("L:{attribute}:{op}:{}", canonical_operand_string(operand))
        }
        Predicate::And(children) => {
            format!("A[{}]", children.iter().map(canonical_string).collect::<Vec<_>>().join(","))
        }
        Predicate::Or(children) => {
            format!("O[{}]", children.iter().map(canonical_string).collect::<Vec<_>>().join(","))
        }
        Predicate::Not(inner) => format!("N({})", canonical_string(inner)),
    }
}

fn canonical_operand_string(operand: &Operand) -> String {
    match operand {
        Operand::Value(v) => format!("v:{}", v.stringify()),
        Operand::Values(vs) => {
            format!("vs:[{}]", vs.iter().map(Value::stringify).collect::<Vec<_>>().join(","))
        }
        Operand::Range { from, from_inclusive, to, to_inclusive } => format!(
            "r:{}{}..{}{}",
            if *from_inclusive { "[" } else { "(" },
            from.stringify(),
            to.stringify(),
            if *to_inclusive { "]" } else { ")" },
        ),
        Operand::Text(t) => format!("t:{t}"),
    }
}
