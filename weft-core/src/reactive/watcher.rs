//! Watcher — the reactive computation unit
//!
//! A Watcher owns an evaluation procedure and tracks which deps it has
//! subscribed to. Every rendering root or derived value in the host gets
//! one watcher.
//!
//! # How Watchers Work
//!
//! 1. When created, the watcher evaluates its procedure immediately to
//!    establish the initial dependency set.
//!
//! 2. During evaluation, every state cell read calls `Dep::depend()`,
//!    which lands in `add_dep`. The subscribed-id set makes sure a cell
//!    read twice in one evaluation subscribes the watcher exactly once.
//!
//! 3. When a dep notifies, `update()` submits the watcher to the
//!    runtime's update queue. It never re-evaluates synchronously — that
//!    would defeat batching.
//!
//! 4. The queue's flush calls `run()`, which re-evaluates and, through
//!    read interception, repopulates subscriptions (already-known deps
//!    are deduplicated away).
//!
//! # Failure Semantics
//!
//! The evaluation scope is an RAII guard, so a panicking procedure
//! cannot leave the evaluation stack imbalanced. Isolation of a
//! panicking watcher from its flush siblings is handled by the queue.

use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::context::EvalScope;
use super::dep::{Dep, DepId};
use crate::runtime::Runtime;

/// Unique identifier for a watcher.
///
/// The update queue deduplicates pending watchers by this ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatcherId(u64);

impl WatcherId {
    /// Generate a new unique watcher ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for WatcherId {
    fn default() -> Self {
        Self::new()
    }
}

/// A reactive computation that re-evaluates when its dependencies change.
///
/// Cheap-clone handle; clones share the same underlying watcher.
/// Construct through [`Runtime::watch`], which performs the initial
/// synchronous evaluation.
#[derive(Clone)]
pub struct Watcher {
    inner: Arc<WatcherInner>,
}

struct WatcherInner {
    id: WatcherId,

    /// The evaluation procedure.
    task: Box<dyn Fn() + Send + Sync>,

    /// IDs of deps this watcher is subscribed to. The dedup ledger:
    /// a dep is subscribed at most once over the watcher's lifetime.
    dep_ids: Mutex<HashSet<DepId>>,

    /// Ordered mirror of `dep_ids`, kept for future unsubscription.
    deps: Mutex<Vec<Dep>>,

    /// A disposed watcher ignores `update()` and `run()`.
    disposed: AtomicBool,

    /// Number of completed evaluations.
    runs: AtomicU64,

    /// The runtime whose update queue this watcher schedules through.
    runtime: Runtime,
}

impl Watcher {
    /// Create a new watcher and immediately evaluate it once to
    /// establish its initial dependency set.
    pub(crate) fn new<F>(runtime: Runtime, task: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let watcher = Self {
            inner: Arc::new(WatcherInner {
                id: WatcherId::new(),
                task: Box::new(task),
                dep_ids: Mutex::new(HashSet::new()),
                deps: Mutex::new(Vec::new()),
                disposed: AtomicBool::new(false),
                runs: AtomicU64::new(0),
                runtime,
            }),
        };

        watcher.evaluate();

        watcher
    }

    /// Get the watcher's unique ID.
    pub fn id(&self) -> WatcherId {
        self.inner.id
    }

    /// Evaluate the procedure inside an evaluation scope.
    ///
    /// State cells read during the call subscribe this watcher through
    /// `Dep::depend()`. The scope guard pops the evaluation stack even
    /// if the procedure panics.
    pub fn evaluate(&self) {
        if self.is_disposed() {
            return;
        }

        {
            let _scope = EvalScope::enter(self);
            (self.inner.task)();
        }

        self.inner.runs.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a subscription to `dep`, once.
    ///
    /// This is the single place enforcing "no duplicate subscription of
    /// the same watcher to the same dep": a cell referenced twice in one
    /// evaluation cannot cause two scheduled re-evaluations for one
    /// mutation.
    pub(crate) fn add_dep(&self, dep: &Dep) {
        let newly_seen = self.inner.dep_ids.lock().insert(dep.id());
        if newly_seen {
            self.inner.deps.lock().push(dep.clone());
            dep.add_sub(self.clone());
        }
    }

    /// The scheduling hook invoked by `Dep::notify()`.
    ///
    /// Submits this watcher to the runtime's update queue and returns
    /// immediately; the re-evaluation happens at the next flush.
    pub fn update(&self) {
        if !self.is_disposed() {
            self.inner.runtime.queue_watcher(self.clone());
        }
    }

    /// Re-evaluate. Called only by the update queue's flush.
    pub fn run(&self) {
        self.evaluate();
    }

    /// Dispose of the watcher. After disposal, `update()` and `run()`
    /// are no-ops. Entries left in dep subscriber lists are the owner's
    /// concern to tear down.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
    }

    /// Check if the watcher has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Number of completed evaluations (including the initial one).
    pub fn run_count(&self) -> u64 {
        self.inner.runs.load(Ordering::Relaxed)
    }

    /// Number of distinct deps this watcher is subscribed to.
    pub fn dep_count(&self) -> usize {
        self.inner.dep_ids.lock().len()
    }
}

impl Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("dep_count", &self.dep_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
