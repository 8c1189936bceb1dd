//! Dep — the per-cell subscriber registry
//!
//! A `Dep` is attached to exactly one state cell and records which
//! watchers have read that cell. When the cell's value changes, the dep
//! notifies every subscriber in the order they first subscribed.
//!
//! # Division of Responsibility
//!
//! The dep is deliberately ignorant of identity bookkeeping:
//!
//! - `add_sub` is an unconditional append. Guarding against duplicate
//!   subscriptions is the watcher's job (see `Watcher::add_dep`), which
//!   keeps the dedup logic in a single place.
//!
//! - `notify` invokes each subscriber's scheduling hook synchronously.
//!   It never defers anything itself; batching is entirely the update
//!   queue's and tick scheduler's job.
//!
//! - `depend` is the sole entry point read interception should call. It
//!   routes through the current watcher so both sides of the
//!   subscription (the watcher's dep set and the dep's subscriber list)
//!   are always updated together.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;

use super::context;
use super::watcher::Watcher;

/// Unique identifier for a dep.
///
/// Monotonically assigned; watchers use it to deduplicate their
/// subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepId(u64);

impl DepId {
    /// Generate a new unique dep ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for DepId {
    fn default() -> Self {
        Self::new()
    }
}

/// The subscriber registry for one state cell.
///
/// `Dep` is a cheap-clone handle; the cell and its subscribers share the
/// same underlying registry. It lives as long as the cell that owns it.
#[derive(Clone)]
pub struct Dep {
    inner: Arc<DepInner>,
}

struct DepInner {
    id: DepId,
    // Insertion order is preserved so notify order is deterministic.
    subs: RwLock<SmallVec<[Watcher; 4]>>,
}

impl Dep {
    /// Create a new dep with no subscribers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DepInner {
                id: DepId::new(),
                subs: RwLock::new(SmallVec::new()),
            }),
        }
    }

    /// Get the dep's unique ID.
    pub fn id(&self) -> DepId {
        self.inner.id
    }

    /// Append a subscriber.
    ///
    /// Unconditional: the caller (the watcher) is responsible for not
    /// subscribing twice.
    pub fn add_sub(&self, watcher: Watcher) {
        self.inner.subs.write().push(watcher);
    }

    /// Record this dep on the watcher currently being evaluated, if any.
    ///
    /// This is the entry point read interception calls on every state
    /// cell read. Outside an evaluation it is a no-op.
    pub fn depend(&self) {
        if let Some(watcher) = context::current_watcher() {
            watcher.add_dep(self);
        }
    }

    /// Notify all subscribers that the owning cell changed.
    ///
    /// Invokes each subscriber's `update()` synchronously, in the order
    /// they subscribed. The snapshot is taken first so a subscriber that
    /// mutates the registry while being notified cannot corrupt the
    /// iteration.
    pub fn notify(&self) {
        let subs: SmallVec<[Watcher; 4]> = self.inner.subs.read().clone();
        for watcher in subs {
            watcher.update();
        }
    }

    /// Get the number of subscribers.
    pub fn sub_count(&self) -> usize {
        self.inner.subs.read().len()
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Dep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.inner.id)
            .field("sub_count", &self.sub_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Runtime;
    use crate::schedule::ManualBackend;
    use std::sync::Arc;

    fn test_runtime() -> Runtime {
        Runtime::with_backend(Arc::new(ManualBackend::new()))
            .expect("manual backend is always available")
    }

    #[test]
    fn dep_ids_are_unique() {
        let d1 = Dep::new();
        let d2 = Dep::new();
        let d3 = Dep::new();

        assert_ne!(d1.id(), d2.id());
        assert_ne!(d2.id(), d3.id());
        assert_ne!(d1.id(), d3.id());
    }

    #[test]
    fn depend_outside_evaluation_is_noop() {
        let dep = Dep::new();

        // No watcher is evaluating, so nothing should be recorded.
        dep.depend();
        assert_eq!(dep.sub_count(), 0);
    }

    #[test]
    fn depend_records_current_watcher() {
        let rt = test_runtime();
        let dep = Dep::new();

        let dep_clone = dep.clone();
        let watcher = rt.watch(move || {
            dep_clone.depend();
        });

        // The initial evaluation subscribed the watcher
        assert_eq!(dep.sub_count(), 1);
        assert_eq!(watcher.dep_count(), 1);
    }

    #[test]
    fn clone_shares_registry() {
        let rt = test_runtime();
        let dep = Dep::new();
        let alias = dep.clone();

        let dep_clone = dep.clone();
        let _watcher = rt.watch(move || {
            dep_clone.depend();
        });

        assert_eq!(dep.id(), alias.id());
        assert_eq!(alias.sub_count(), 1);
    }
}
