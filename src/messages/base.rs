//! Base message types shared across all message domains.
//!
//! These types correspond to the TypeScript Zod schemas in
//! `packages/core/src/schemas/base-schemas.ts`. All structs use
//! `#[serde(rename_all = "camelCase")]` to produce wire-compatible
//! `MsgPack` output via `rmp_serde::to_vec_named()`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Unified change event type for query, search, and cluster subscription updates.
///
/// Maps to `ChangeEventTypeSchema` in `base-schemas.ts`.
/// `SearchUpdateTypeSchema` in `search-schemas.ts` is an alias for this enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeEventType {
    ENTER,
    UPDATE,
    LEAVE,
}

/// Predicate operators for query filtering.
///
/// Maps to `PredicateOpSchema` in `base-schemas.ts`.
/// Lowercase variants match the TS enum values exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredicateOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Regex,
    And,
    Or,
    Not,
}

/// Sort direction for query ordering.
///
/// Maps to `z.enum(['asc', 'desc'])` in `QuerySchema.sort` in `base-schemas.ts`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

// ---------------------------------------------------------------------------
// Structs
// ---------------------------------------------------------------------------

/// A recursive predicate node for query filtering.
///
/// Maps to `PredicateNodeSchema` in `base-schemas.ts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredicateNode {
    pub op: PredicateOp,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub attribute: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<rmpv::Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub children: Option<Vec<PredicateNode>>,
}

/// Query parameters for filtering, sorting, and pagination.
///
/// Maps to `QuerySchema` in `base-schemas.ts`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// Key-value filter conditions. `where` is a Rust keyword, so we use raw identifier syntax.
    #[serde(rename = "where")]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub r#where: Option<HashMap<String, rmpv::Value>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub predicate: Option<PredicateNode>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sort: Option<HashMap<String, SortDirection>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cursor: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
