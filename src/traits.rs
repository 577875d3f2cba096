//! Small host-facing seams: the observability hook and the value-equality
//! hook used by `ORMap::remove`.
//!
//! `Processor`/`Inbox`/`ProcessorContext` (DAG-style distributed execution)
//! and the auth-oriented `RequestContext` from the teacher crate are dropped
//! here: entry-processor sandboxing, user-defined resolver code, and
//! authentication are explicitly out of scope (spec.md §1).

use crate::error::CoreError;

/// Single optional observability hook (spec.md §6: "Observability is a
/// single optional hook `Logger { error(msg, err?) }`").
///
/// Subscriber-callback errors (spec.md §7 `SubscriberCallback`) are isolated
/// and routed here rather than propagated as a `Result`.
pub trait Logger: Send + Sync {
    /// Reports an error. `err` is `None` for messages with no associated
    /// `CoreError` (e.g. a caught panic payload rendered to a string).
    fn error(&self, msg: &str, err: Option<&CoreError>);
}

/// A `Logger` that forwards to the `tracing` crate at `error` level.
///
/// Used as the default when a host does not supply its own `Logger`, so
/// callback failures are never silently dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn error(&self, msg: &str, err: Option<&CoreError>) {
        match err {
            Some(e) => tracing::error!(error = %e, "{msg}"),
            None => tracing::error!("{msg}"),
        }
    }
}

/// Value-equality hook for `ORMap::remove` (spec.md §9: "value equality for
/// primitives and a user-supplied `ValueEq<V>` for complex values").
///
/// The source implementation used identity (`===`) equality, which does not
/// survive serialization; this crate documents that as a deliberate
/// behavioral change and defaults to structural equality via the blanket
/// impl below. Hosts storing values for which `PartialEq` is not a faithful
/// notion of "the same value" (e.g. floats needing epsilon comparison, or
/// values with ignorable metadata fields) can supply a custom `ValueEq`.
pub trait ValueEq<V> {
    /// Returns whether `a` and `b` should be treated as the same value for
    /// the purposes of `ORMap::remove`.
    fn values_equal(&self, a: &V, b: &V) -> bool;
}

/// The default `ValueEq`: delegates to `PartialEq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralEq;

impl<V: PartialEq> ValueEq<V> for StructuralEq {
    fn values_equal(&self, a: &V, b: &V) -> bool {
        a == b
    }
}
