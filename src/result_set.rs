//! `ResultSet`: the key-set algebra shared by every index and the query
//! planner (spec.md §3, §4.5). A result set is either already materialized
//! (an owned `BTreeSet<String>`) or lazy -- backed by a range over a
//! `NavigableIndex`'s ordered map, whose size is estimated cheaply
//! (`allKeys/2`, spec.md §4.5.b) until the first full iteration forces it,
//! at which point the materialized keys are cached.

use std::cell::OnceCell;
use std::collections::BTreeSet;

/// A set of matching keys, possibly produced lazily from an index range scan.
pub enum ResultSet {
    /// Already-computed key set (hash index lookups, unions, intersections).
    Materialized(BTreeSet<String>),
    /// A range scan not yet walked. `estimate` is the pre-materialization
    /// size guess; `source` yields the actual keys the first time they are
    /// needed, and the result is cached in `cache`.
    Lazy {
        estimate: usize,
        source: Box<dyn FnOnce() -> BTreeSet<String>>,
        cache: OnceCell<BTreeSet<String>>,
    },
}

impl ResultSet {
    /// An empty result set.
    #[must_use]
    pub fn empty() -> Self {
        ResultSet::Materialized(BTreeSet::new())
    }

    /// Wraps an already-known key set.
    #[must_use]
    pub fn materialized(keys: BTreeSet<String>) -> Self {
        ResultSet::Materialized(keys)
    }

    /// Builds a lazy result set: `estimate` is the planner's pre-walk size
    /// guess, `source` computes the real keys on first access.
    pub fn lazy(estimate: usize, source: impl FnOnce() -> BTreeSet<String> + 'static) -> Self {
        ResultSet::Lazy { estimate, source: Box::new(source), cache: OnceCell::new() }
    }

    /// The planner's cost-estimation size: exact for materialized sets, the
    /// stored estimate for unwalked lazy sets, and the cached exact size
    /// once a lazy set has been walked.
    #[must_use]
    pub fn estimated_size(&self) -> usize {
        match self {
            ResultSet::Materialized(keys) => keys.len(),
            ResultSet::Lazy { estimate, cache, .. } => {
                cache.get().map_or(*estimate, BTreeSet::len)
            }
        }
    }

    /// Forces materialization (idempotent -- a lazy set caches on first call)
    /// and returns the resolved key set by reference.
    pub fn materialize(&mut self) -> &BTreeSet<String> {
        if let ResultSet::Lazy { source, cache, .. } = self {
            if cache.get().is_none() {
                // `source` is `FnOnce`; take it via a dummy no-op replacement
                // so we can call it despite `self` being `&mut`.
                let source = std::mem::replace(source, Box::new(BTreeSet::new));
                let _ = cache.set(source());
            }
        }
        match self {
            ResultSet::Materialized(keys) => keys,
            ResultSet::Lazy { cache, .. } => cache.get().expect("just materialized"),
        }
    }

    /// Consumes `self`, returning the owned materialized key set.
    #[must_use]
    pub fn into_keys(mut self) -> BTreeSet<String> {
        self.materialize();
        match self {
            ResultSet::Materialized(keys) => keys,
            ResultSet::Lazy { cache, .. } => cache.into_inner().expect("just materialized"),
        }
    }

    /// Intersection of two result sets, materializing both.
    #[must_use]
    pub fn intersect(mut self, mut other: ResultSet) -> ResultSet {
        let a = self.materialize().clone();
        let b = other.materialize().clone();
        ResultSet::Materialized(a.intersection(&b).cloned().collect())
    }

    /// Union of two result sets, materializing both.
    #[must_use]
    pub fn union(mut self, mut other: ResultSet) -> ResultSet {
        let a = self.materialize().clone();
        let b = other.materialize().clone();
        ResultSet::Materialized(a.union(&b).cloned().collect())
    }

    /// Set difference `universe - self`, used to implement `Not`.
    #[must_use]
    pub fn complement(mut self, universe: &BTreeSet<String>) -> ResultSet {
        let keys = self.materialize();
        ResultSet::Materialized(universe.difference(keys).cloned().collect())
    }
}

impl std::fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultSet::Materialized(keys) => {
                f.debug_tuple("ResultSet::Materialized").field(&keys.len()).finish()
            }
            ResultSet::Lazy { estimate, cache, .. } => f
                .debug_struct("ResultSet::Lazy")
                .field("estimate", estimate)
                .field("materialized", &cache.get().is_some())
                .finish(),
        }
    }
}
