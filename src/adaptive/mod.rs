//! Adaptive indexing (spec.md §4.8): tracks query traffic, suggests
//! indexes, and can auto-create them, plus a first-write default indexing
//! policy for freshly-created maps.

pub mod advisor;
pub mod auto_index;
pub mod default_strategy;
pub mod pattern_tracker;

pub use advisor::{AdvisorOptions, CompoundSuggestion, IndexAdvisor, Priority, SingleSuggestion, Suggestions};
pub use auto_index::{AttributeFactory, AutoIndexManager, AutoIndexOptions};
pub use default_strategy::DefaultIndexingStrategy;
pub use pattern_tracker::{PatternKey, PatternStats, QueryPatternTracker, TrackerOptions};
