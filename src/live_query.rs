//! `LiveQueryManager` (spec.md §4.7): keeps a tracked result set per
//! distinct query, re-evaluating the predicate against record mutations and
//! emitting `Added`/`Removed`/`Updated` deltas to subscribers.

use std::collections::BTreeSet;

use crate::index::IndexRegistry;
use crate::predicate::Predicate;
use crate::query::{execute, optimize_with_options, query_hash, ExecutionContext, QueryOptions};
use crate::traits::Logger;
use crate::value::Value;

/// The kind of transition a record underwent relative to a tracked query
/// (spec.md §4.7's `false->true`/`true->false`/`true->true` transitions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Removed,
    Updated,
}

/// The mutation that triggered re-evaluation, independent of the
/// transition it produced for any given query (e.g. an `Update` mutation
/// can still produce an `Added` transition if the new value newly matches).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOperation {
    Add,
    Update,
    Remove,
}

/// Events delivered to a live query subscriber.
#[derive(Debug, Clone)]
pub enum LiveQueryEvent {
    /// Sent once, to a new subscriber only, with the query's current result.
    Initial { results: Vec<String> },
    /// A single record transitioned in or out of (or changed within) the
    /// tracked result set.
    Delta { key: String, record: Option<Value>, change: ChangeKind, operation: RecordOperation, new_result_count: usize },
}

type Callback = Box<dyn Fn(LiveQueryEvent) + Send + Sync>;

struct Subscriber {
    id: u64,
    callback: Callback,
}

struct TrackedQuery {
    predicate: Predicate,
    result_set: BTreeSet<String>,
    subscribers: Vec<Subscriber>,
}

/// Identifies one subscription so it can later be passed to [`LiveQueryManager::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionHandle {
    query_hash: u64,
    subscriber_id: u64,
}

/// Tracks live queries and fans record mutations out to their subscribers.
/// Single-threaded cooperative: every method runs synchronously on the
/// caller's thread (spec.md §5).
pub struct LiveQueryManager {
    queries: std::collections::HashMap<u64, TrackedQuery>,
    next_subscriber_id: u64,
    logger: Box<dyn Logger>,
}

impl LiveQueryManager {
    #[must_use]
    pub fn new(logger: Box<dyn Logger>) -> Self {
        Self { queries: std::collections::HashMap::new(), next_subscriber_id: 0, logger }
    }

    /// Subscribes `callback` to `predicate`'s live result set. If this exact
    /// predicate is already tracked, the new subscriber joins the existing
    /// entry instead of re-running the query. Emits `Initial` to the new
    /// subscriber only, then returns an unsubscribe handle.
    pub fn subscribe(
        &mut self,
        predicate: Predicate,
        registry: &IndexRegistry,
        ctx: &dyn ExecutionContext,
        callback: impl Fn(LiveQueryEvent) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        let hash = query_hash(&predicate);
        let entry = self.queries.entry(hash).or_insert_with(|| {
            let plan = optimize_with_options(&predicate, registry, &QueryOptions::default())
                .unwrap_or(crate::query::Plan::FullScan);
            let result_set = execute(&plan, registry, ctx).into_iter().collect();
            TrackedQuery { predicate, result_set, subscribers: Vec::new() }
        });

        let subscriber_id = self.next_subscriber_id;
        self.next_subscriber_id += 1;

        let initial = LiveQueryEvent::Initial { results: entry.result_set.iter().cloned().collect() };
        isolated_call(&callback, initial, self.logger.as_ref());

        entry.subscribers.push(Subscriber { id: subscriber_id, callback: Box::new(callback) });

        SubscriptionHandle { query_hash: hash, subscriber_id }
    }

    /// Removes one subscriber. Drops the tracked query entirely once its
    /// last subscriber is gone (spec.md §4.7).
    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        if let Some(entry) = self.queries.get_mut(&handle.query_hash) {
            entry.subscribers.retain(|s| s.id != handle.subscriber_id);
            if entry.subscribers.is_empty() {
                self.queries.remove(&handle.query_hash);
            }
        }
    }

    /// `key` was just inserted with `record`.
    pub fn on_record_added(&mut self, key: &str, record: &Value, ctx: &dyn ExecutionContext) {
        self.on_record_changed(key, None, Some(record), RecordOperation::Add, ctx);
    }

    /// `key`'s value changed from `old` to `new`.
    pub fn on_record_updated(&mut self, key: &str, old: &Value, new: &Value, ctx: &dyn ExecutionContext) {
        self.on_record_changed(key, Some(old), Some(new), RecordOperation::Update, ctx);
    }

    /// `key` (previously `record`) was removed.
    pub fn on_record_removed(&mut self, key: &str, record: &Value, ctx: &dyn ExecutionContext) {
        self.on_record_changed(key, Some(record), None, RecordOperation::Remove, ctx);
    }

    fn on_record_changed(
        &mut self,
        key: &str,
        old_record: Option<&Value>,
        new_record: Option<&Value>,
        operation: RecordOperation,
        ctx: &dyn ExecutionContext,
    ) {
        for entry in self.queries.values_mut() {
            let matches_before =
                old_record.is_some_and(|r| entry.predicate.evaluate(&|attr| ctx.get_attribute(r, attr)));
            let matches_after =
                new_record.is_some_and(|r| entry.predicate.evaluate(&|attr| ctx.get_attribute(r, attr)));

            let change = match (matches_before, matches_after) {
                (false, true) => Some(ChangeKind::Added),
                (true, false) => Some(ChangeKind::Removed),
                (true, true) if old_record != new_record => Some(ChangeKind::Updated),
                _ => None,
            };
            let Some(change) = change else { continue };

            match change {
                ChangeKind::Added => {
                    entry.result_set.insert(key.to_string());
                }
                ChangeKind::Removed => {
                    entry.result_set.remove(key);
                }
                ChangeKind::Updated => {}
            }

            let event = LiveQueryEvent::Delta {
                key: key.to_string(),
                record: new_record.or(old_record).cloned(),
                change,
                operation,
                new_result_count: entry.result_set.len(),
            };

            for subscriber in &entry.subscribers {
                isolated_call(&subscriber.callback, event.clone(), self.logger.as_ref());
            }
        }
    }

    /// The number of distinct queries currently tracked.
    #[must_use]
    pub fn tracked_query_count(&self) -> usize {
        self.queries.len()
    }
}

/// Calls `callback`, catching a panic so one misbehaving subscriber cannot
/// stop the others from being notified (spec.md §4.7: "callback errors are
/// isolated... other subscribers still notified").
fn isolated_call(callback: &(dyn Fn(LiveQueryEvent) + Send + Sync), event: LiveQueryEvent, logger: &dyn Logger) {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(event)));
    if result.is_err() {
        logger.error("live query subscriber callback panicked", None);
    }
}
