//! Reactivity Runtime
//!
//! The runtime bundles the update queue and the tick scheduler into one
//! explicit object owned by the host application root, instead of
//! hiding them in process-wide globals. Everything that schedules —
//! watchers queueing re-evaluations, hosts submitting `next_tick`
//! callbacks — goes through a runtime handle.
//!
//! The single-logical-thread contract still applies: mutations,
//! notification, and queueing happen synchronously in the caller's
//! turn; only the flush is deferred, onto whichever backend the tick
//! scheduler selected at construction.
//!
//! # Example
//!
//! ```rust,ignore
//! use weft_core::Runtime;
//!
//! let rt = Runtime::new();
//! let msg = rt.cell(String::from("0"));
//!
//! let msg_reader = msg.clone();
//! let render = rt.watch(move || {
//!     println!("rendered: {}", msg_reader.get());
//! });
//!
//! // Four synchronous writes, one re-render after the flush
//! msg.set("1".into());
//! msg.set("2".into());
//! msg.set("3".into());
//! msg.set("4".into());
//!
//! rt.next_tick(|| println!("settled"));
//! ```

use std::sync::Arc;

use crate::reactive::{StateCell, Watcher};
use crate::schedule::{
    default_chain, SchedulerError, TickBackend, TickScheduler, UpdateQueue,
};

/// The reactivity runtime: update queue + tick scheduler.
///
/// Cheap-clone handle; clones share the same queue and scheduler. Create
/// one per host application root.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

struct RuntimeInner {
    queue: UpdateQueue,
    ticker: Arc<TickScheduler>,
}

impl Runtime {
    /// Create a runtime on the default backend chain.
    ///
    /// Infallible: the chain's last backend (the zero-delay timer)
    /// always reports available.
    pub fn new() -> Self {
        Self::with_backends(default_chain())
            .expect("default backend chain always has an available backend")
    }

    /// Create a runtime on an explicit backend chain, selecting the
    /// first available backend once, at construction.
    pub fn with_backends(chain: Vec<Arc<dyn TickBackend>>) -> Result<Self, SchedulerError> {
        let ticker = TickScheduler::select(chain)?;
        let queue = UpdateQueue::new(Arc::clone(&ticker));

        Ok(Self {
            inner: Arc::new(RuntimeInner { queue, ticker }),
        })
    }

    /// Create a runtime on a single explicit backend.
    pub fn with_backend(backend: Arc<dyn TickBackend>) -> Result<Self, SchedulerError> {
        Self::with_backends(vec![backend])
    }

    /// Create a state cell managed by this runtime's reactivity.
    pub fn cell<T>(&self, value: T) -> StateCell<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        StateCell::new(value)
    }

    /// Create a watcher over `task`.
    ///
    /// The task is evaluated once, synchronously, before this returns,
    /// to establish the watcher's initial dependency set.
    pub fn watch<F>(&self, task: F) -> Watcher
    where
        F: Fn() + Send + Sync + 'static,
    {
        Watcher::new(self.clone(), task)
    }

    /// Schedule `callback` to run after the current batch of reactive
    /// updates has flushed.
    ///
    /// Usable by non-core code wanting to observe post-update state.
    pub fn next_tick<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.ticker.next_tick(Box::new(callback));
    }

    /// Arm a flush without adding a callback, for callers relying
    /// purely on the work already queued.
    pub fn request_tick(&self) {
        self.inner.ticker.request_flush();
    }

    /// The update queue watchers schedule through.
    pub fn queue(&self) -> &UpdateQueue {
        &self.inner.queue
    }

    /// Name of the tick backend this runtime selected.
    pub fn backend_name(&self) -> &'static str {
        self.inner.ticker.backend_name()
    }

    pub(crate) fn queue_watcher(&self, watcher: Watcher) {
        self.inner.queue.queue(watcher);
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
