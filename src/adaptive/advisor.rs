//! `IndexAdvisor` (spec.md §4.8): turns tracked query patterns into ranked
//! index-creation suggestions.

use std::collections::HashSet;

use crate::index::IndexKind;
use crate::predicate::Op;

use super::pattern_tracker::{PatternKey, PatternStats};

/// Ranks how urgently an index suggestion should be acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// A suggested index over one attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleSuggestion {
    pub attribute: String,
    pub index_kind: IndexKind,
    pub priority: Priority,
    pub reason: String,
    pub estimated_benefit: f64,
    pub estimated_cost: f64,
}

/// A suggested compound index over an observed AND-pattern of attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundSuggestion {
    pub attributes: Vec<String>,
    pub priority: Priority,
    pub reason: String,
    pub estimated_benefit: f64,
    pub estimated_cost: f64,
}

/// All suggestions produced by one [`IndexAdvisor::get_suggestions`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Suggestions {
    pub single: Vec<SingleSuggestion>,
    pub compound: Vec<CompoundSuggestion>,
}

/// Options for [`IndexAdvisor::get_suggestions`].
#[derive(Debug, Clone)]
pub struct AdvisorOptions {
    /// Skip attributes that already have a covering index unless `false`.
    pub exclude_existing_indexes: bool,
}

impl Default for AdvisorOptions {
    fn default() -> Self {
        Self { exclude_existing_indexes: true }
    }
}

/// Maps a query operator to the index kind that would serve it (spec.md
/// §4.8).
#[must_use]
pub fn index_kind_for_op(op: Op) -> Option<IndexKind> {
    match op {
        Op::Eq | Op::Neq | Op::In | Op::Has => Some(IndexKind::Hash),
        Op::Gt | Op::Gte | Op::Lt | Op::Lte | Op::Between => Some(IndexKind::Navigable),
        Op::Contains | Op::ContainsAll | Op::ContainsAny => Some(IndexKind::Inverted),
        Op::Like | Op::Regex | Op::Match | Op::MatchPhrase | Op::MatchPrefix => None,
    }
}

/// Priority thresholds from spec.md §4.8: high if `queryCount > 100 ∧
/// avgCost > 10`, medium if `queryCount > 50`, else low.
#[must_use]
pub fn priority_for(stats: &PatternStats) -> Priority {
    if stats.query_count > 100 && stats.average_cost > 10.0 {
        Priority::High
    } else if stats.query_count > 50 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

/// Produces ranked index suggestions from tracked query patterns.
pub struct IndexAdvisor {
    options: AdvisorOptions,
}

impl Default for IndexAdvisor {
    fn default() -> Self {
        Self::new(AdvisorOptions::default())
    }
}

impl IndexAdvisor {
    #[must_use]
    pub fn new(options: AdvisorOptions) -> Self {
        Self { options }
    }

    /// Builds suggestions from a pattern snapshot (see
    /// [`super::pattern_tracker::QueryPatternTracker::snapshot`]).
    #[must_use]
    pub fn get_suggestions(&self, patterns: &[(PatternKey, PatternStats)], indexed_attributes: &HashSet<String>) -> Suggestions {
        let mut single_by_attribute: std::collections::HashMap<String, SingleSuggestion> = std::collections::HashMap::new();
        let mut compound = Vec::new();

        for (key, stats) in patterns {
            match key {
                PatternKey::Single(attribute, op) => {
                    if self.options.exclude_existing_indexes && indexed_attributes.contains(attribute) {
                        continue;
                    }
                    let Some(kind) = index_kind_for_op(*op) else { continue };
                    let priority = priority_for(stats);
                    let estimated_benefit = stats.average_cost * stats.query_count as f64;
                    let suggestion = SingleSuggestion {
                        attribute: attribute.clone(),
                        index_kind: kind,
                        priority,
                        reason: format!(
                            "{} queries at avg cost {:.1} on `{attribute}` ({op:?})",
                            stats.query_count, stats.average_cost
                        ),
                        estimated_benefit,
                        estimated_cost: stats.estimated_cardinality as f64,
                    };
                    // Dedup per attribute: the best (highest-priority, then
                    // highest-benefit) op wins.
                    single_by_attribute
                        .entry(attribute.clone())
                        .and_modify(|existing| {
                            if (suggestion.priority, ordered(suggestion.estimated_benefit))
                                > (existing.priority, ordered(existing.estimated_benefit))
                            {
                                *existing = suggestion.clone();
                            }
                        })
                        .or_insert(suggestion);
                }
                PatternKey::Compound(attributes) => {
                    if attributes.len() < 2 {
                        continue;
                    }
                    if self.options.exclude_existing_indexes && attributes.iter().all(|a| indexed_attributes.contains(a)) {
                        continue;
                    }
                    let priority = priority_for(stats);
                    compound.push(CompoundSuggestion {
                        attributes: attributes.clone(),
                        priority,
                        reason: format!(
                            "{} compound queries at avg cost {:.1} over {attributes:?}",
                            stats.query_count, stats.average_cost
                        ),
                        estimated_benefit: stats.average_cost * stats.query_count as f64,
                        estimated_cost: stats.estimated_cardinality as f64,
                    });
                }
            }
        }

        let mut single: Vec<SingleSuggestion> = single_by_attribute.into_values().collect();
        single.sort_by(|a, b| b.priority.cmp(&a.priority).then(ordered(b.estimated_benefit).cmp(&ordered(a.estimated_benefit))));
        compound.sort_by(|a, b| b.priority.cmp(&a.priority).then(ordered(b.estimated_benefit).cmp(&ordered(a.estimated_benefit))));

        Suggestions { single, compound }
    }
}

/// Estimated benefit/cost are always finite; `total_cmp` gives `f64` a
/// total order for sorting without pulling in an external crate.
fn ordered(value: f64) -> impl Ord {
    OrderedF64(value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct OrderedF64(f64);

impl Eq for OrderedF64 {}

impl PartialOrd for OrderedF64 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedF64 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}
