//! Query plan tree (spec.md §4.6).

use crate::messages::base::SortDirection;
use crate::predicate::{Op, Operand, Predicate};

/// Coarse, constant cost charged for a plan node that walks every key in the
/// map rather than going through an index (spec.md §4.6's cost model only
/// specifies `IndexScan` costs precisely; this is the planner's stand-in for
/// "expensive").
pub const FULL_SCAN_COST: u32 = 1_000;

/// Per-child cost charged when merging result sets (`And`/`Or` intersection
/// or union, `Not`'s complement) -- a coarse proxy for the set-algebra work
/// in [`crate::result_set::ResultSet`].
const MERGE_COST_PER_CHILD: u32 = 1;

/// A re-checked predicate wrapped around an inner plan (`Filter`), or the
/// residual predicate left over after an `And`/`Or` plans only some of its
/// children through an index.
pub type RemainingPredicate = Predicate;

/// A query execution plan (spec.md §4.6's `Plan` grammar).
#[derive(Debug, Clone)]
pub enum Plan {
    /// A single index lookup.
    IndexScan { attribute: String, op: Op, operand: Operand },
    /// Walks every key in the map.
    FullScan,
    /// Intersects child result sets.
    And(Vec<Plan>),
    /// Unions child result sets.
    Or(Vec<Plan>),
    /// Complements the inner plan's result within the map's full key set.
    Not(Box<Plan>),
    /// Re-checks `predicate` against every candidate `inner` produces.
    Filter(Box<Plan>, RemainingPredicate),
    /// Orders `inner`'s results by `field`. `indexed_sort` is `true` when a
    /// navigable index on `field` let the planner skip an in-memory sort.
    Sort { inner: Box<Plan>, field: String, direction: SortDirection, indexed_sort: bool },
    /// Takes `n` results after skipping `offset`, applied after `Sort`.
    Limit { inner: Box<Plan>, n: usize, offset: usize },
    /// Resumes `inner` from a decoded cursor position.
    Cursor { inner: Box<Plan>, cursor: Box<crate::cursor::QueryCursor> },
}

impl Plan {
    /// `true` if this node (ignoring its children) walks the full map rather
    /// than an index -- i.e. it is `FullScan` or `Filter(FullScan, _)`.
    #[must_use]
    pub fn is_unindexed(&self) -> bool {
        match self {
            Plan::FullScan => true,
            Plan::Filter(inner, _) => matches!(**inner, Plan::FullScan),
            _ => false,
        }
    }

    /// Sum of `IndexScan` retrieval costs plus merge costs for `And`/`Or`/
    /// `Not`, per the cost model of spec.md §4.6. `FullScan` is charged a
    /// large constant so it never outcompetes an index plan in comparisons.
    #[must_use]
    pub fn estimated_cost(&self, registry: &crate::index::IndexRegistry) -> u32 {
        match self {
            Plan::IndexScan { attribute, op, .. } => {
                registry.best_index(attribute, *op).map_or(FULL_SCAN_COST, |idx| idx.retrieval_cost())
            }
            Plan::FullScan => FULL_SCAN_COST,
            Plan::And(children) | Plan::Or(children) => {
                let sum: u32 = children.iter().map(|c| c.estimated_cost(registry)).sum();
                sum + MERGE_COST_PER_CHILD * children.len() as u32
            }
            Plan::Not(inner) => inner.estimated_cost(registry) + FULL_SCAN_COST,
            Plan::Filter(inner, _) => inner.estimated_cost(registry) + MERGE_COST_PER_CHILD,
            Plan::Sort { inner, .. } | Plan::Limit { inner, .. } | Plan::Cursor { inner, .. } => {
                inner.estimated_cost(registry)
            }
        }
    }
}

/// `explainQuery`'s return value: the plan tree plus its cost breakdown.
#[derive(Debug, Clone)]
pub struct QueryExplanation {
    pub plan: Plan,
    pub estimated_cost: u32,
}

impl QueryExplanation {
    #[must_use]
    pub fn new(plan: Plan, registry: &crate::index::IndexRegistry) -> Self {
        let estimated_cost = plan.estimated_cost(registry);
        Self { plan, estimated_cost }
    }
}
