//! `lattice-kv` -- an in-memory, replicated key-value engine: LWW and OR
//! CRDT maps, Merkle-trie anti-entropy sync, and an indexed query engine
//! with a cost-based planner, live queries, and adaptive indexing.
//!
//! - **HLC** ([`hlc`]): Hybrid Logical Clock for distributed causality tracking
//! - **Hash** ([`hash`]): FNV-1a hash utilities for `MerkleTree` bucket routing
//! - **`MerkleTree`** ([`merkle`]): Prefix trie for efficient delta synchronization
//! - **Value** ([`value`]): the dynamic `Value` enum stored in map records
//! - **CRDT maps** ([`lww_map`], [`or_map`]): `LWWMap`/`ORMap`, each backed by
//!   their own Merkle tree for sync
//! - **Predicates** ([`predicate`]): the query operator vocabulary and AST
//! - **Attributes** ([`attribute`]): named/derived scalar extraction from a `Value`
//! - **Indexing** ([`index`]): `HashIndex`, `NavigableIndex`, `InvertedIndex`,
//!   `QuantizedNavigableIndex`, and the dispatching `IndexRegistry`
//! - **Query** ([`query`]): planner, cost model, and executor
//! - **Live queries** ([`live_query`]): incremental result-set maintenance
//! - **Cursors** ([`cursor`]): stable pagination tokens
//! - **Adaptive indexing** ([`adaptive`]): query-pattern tracking, index
//!   suggestions, and auto-indexing
//! - **Messages** ([`messages`]): wire-compatible message schemas for sync,
//!   query, and search
//! - **Traits** ([`traits`]): `Logger`, `ValueEq`, `StructuralEq`
//! - **Errors** ([`error`]): the crate-wide `CoreError`

pub mod adaptive;
pub mod attribute;
pub mod cursor;
pub mod error;
pub mod hash;
pub mod hlc;
pub mod index;
pub mod live_query;
pub mod lww_map;
pub mod merkle;
pub mod messages;
pub mod or_map;
pub mod predicate;
pub mod query;
pub mod result_set;
pub mod traits;
pub mod value;

// Errors
pub use error::{CoreError, CoreResult};

// Value
pub use value::{compare_values, MapType, Stringify, Value};

// CRDT maps
pub use lww_map::LWWMap;
pub use or_map::ORMap;

// Predicates
pub use predicate::{Op, Operand, Predicate};

// Attributes
pub use attribute::{field, multi_attribute, simple_attribute, Attribute, MultiAttribute, SimpleAttribute};

// Result sets
pub use result_set::ResultSet;

// Indexing
pub use index::{
    HashIndex, Index, IndexKind, IndexRegistry, IndexStats, InvertedIndex, NavigableIndex,
    QuantizedNavigableIndex, Quantizer,
};

// Query
pub use query::{
    execute, explain_query, optimize_with_options, plan_query, query_hash, run_query,
    ExecutionContext, Plan, QueryExplanation, QueryOptions,
};

// Live queries
pub use live_query::{ChangeKind, LiveQueryEvent, LiveQueryManager, RecordOperation, SubscriptionHandle};

// Cursors
pub use cursor::{QueryCursor, SearchCursor};

// Adaptive indexing
pub use adaptive::{
    AdvisorOptions, AttributeFactory, AutoIndexManager, AutoIndexOptions, CompoundSuggestion,
    DefaultIndexingStrategy, IndexAdvisor, PatternKey, PatternStats, Priority, QueryPatternTracker,
    SingleSuggestion, Suggestions, TrackerOptions,
};

// HLC
pub use hlc::{ClockSource, SystemClock, Timestamp, HLC, LWWRecord, MergeKeyResult, ORMapRecord};

// Hash
pub use hash::{combine_hashes, fnv1a_hash};

// Merkle
pub use merkle::{MerkleNode, MerkleTree, ORMapMerkleTree};

// Traits
pub use traits::{Logger, StructuralEq, TracingLogger, ValueEq};
