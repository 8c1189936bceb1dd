//! StateCell — the scalar get/set interception point
//!
//! A `StateCell` is a single mutable storage location participating in
//! reactivity. It owns the value and the [`Dep`] attached to it, and it
//! is the piece that turns a plain read or write into a call into the
//! tracking core:
//!
//! - `get()` calls `Dep::depend()`, subscribing the watcher currently
//!   being evaluated (if any), then returns a clone of the value.
//!
//! - `set()` stores the new value and calls `Dep::notify()` — but only
//!   when the value actually changed. Writing the same value back is not
//!   a mutation and must not schedule re-evaluations.
//!
//! Structural (index-based) interception for collections is out of
//! scope; cells cover scalar fields only.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::dep::Dep;

/// A reactive state cell holding a value of type `T`.
///
/// Cheap-clone handle; clones share the same value and dep.
pub struct StateCell<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    value: Arc<RwLock<T>>,
    dep: Dep,
}

impl<T> StateCell<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a new cell with the given initial value.
    ///
    /// The cell's dep is created with it and lives for the cell's
    /// lifetime.
    pub fn new(value: T) -> Self {
        Self {
            value: Arc::new(RwLock::new(value)),
            dep: Dep::new(),
        }
    }

    /// Get the current value.
    ///
    /// If a watcher is currently being evaluated, it is subscribed to
    /// this cell's dep (deduplicated on the watcher side).
    pub fn get(&self) -> T {
        self.dep.depend();
        self.value.read().clone()
    }

    /// Get the current value without establishing a dependency.
    pub fn get_untracked(&self) -> T {
        self.value.read().clone()
    }

    /// Set a new value, notifying subscribers if it actually changed.
    ///
    /// The notification runs synchronously in the caller's turn; the
    /// notified watchers only queue themselves, so control returns to
    /// the caller before any re-evaluation happens.
    pub fn set(&self, value: T) {
        {
            let mut guard = self.value.write();
            if *guard == value {
                return;
            }
            *guard = value;
        }

        self.dep.notify();
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let new_value = {
            let guard = self.value.read();
            f(&*guard)
        };
        self.set(new_value);
    }

    /// The dep attached to this cell.
    ///
    /// Exposed for interception layers that wrap cells rather than use
    /// `get`/`set` directly.
    pub fn dep(&self) -> &Dep {
        &self.dep
    }
}

impl<T> Clone for StateCell<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            dep: self.dep.clone(),
        }
    }
}

impl<T> Debug for StateCell<T>
where
    T: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCell")
            .field("id", &self.dep.id())
            .field("value", &self.get_untracked())
            .field("sub_count", &self.dep.sub_count())
            .finish()
    }
}
