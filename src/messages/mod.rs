//! Wire-compatible message schemas for the replication protocol.
//!
//! Each submodule corresponds to a domain of messages defined in the
//! TypeScript Zod schemas this engine's wire format was modeled on. All
//! types use named MsgPack serialization (`rmp_serde::to_vec_named()`)
//! with camelCase field names to match that wire format.

pub mod base;
pub mod query;
pub mod search;
pub mod sync;

pub use base::{ChangeEventType, PredicateNode, PredicateOp, Query, SortDirection};
pub use query::{
    CursorStatus, QueryRespMessage, QueryRespPayload, QueryResultEntry, QuerySubMessage,
    QuerySubPayload, QueryUnsubMessage, QueryUnsubPayload,
};
pub use search::{
    SearchOptions, SearchPayload, SearchRespPayload, SearchResultEntry, SearchSubPayload,
    SearchUnsubPayload, SearchUpdatePayload,
};
pub use sync::{
    MerkleReqBucketMessage, MerkleReqBucketPayload, ORMapDiffRequest, ORMapDiffRequestPayload,
    ORMapDiffResponse, ORMapDiffResponsePayload, ORMapEntry, ORMapMerkleReqBucket,
    ORMapMerkleReqBucketPayload, ORMapPushDiff, ORMapPushDiffPayload, ORMapSyncInit,
    ORMapSyncRespBuckets, ORMapSyncRespBucketsPayload, ORMapSyncRespLeaf,
    ORMapSyncRespLeafPayload, ORMapSyncRespRoot, ORMapSyncRespRootPayload, SyncInitMessage,
    SyncLeafRecord, SyncRespBucketsMessage, SyncRespBucketsPayload, SyncRespLeafMessage,
    SyncRespLeafPayload, SyncRespRootMessage, SyncRespRootPayload,
};
