//! Tick Scheduler
//!
//! The tick scheduler owns the shared list of callbacks waiting for the
//! next flush point and decides when that flush actually happens, using
//! the backend selected at construction.
//!
//! # Exactly-Once Arming
//!
//! Between the moment the callback list becomes non-empty and the moment
//! it is flushed, at most one backend arm is outstanding. Callbacks
//! submitted while a flush is armed simply ride along with it.
//!
//! # Re-entrancy
//!
//! `flush_callbacks` clears the armed flag and snapshots the list before
//! invoking anything, so a callback that submits new callbacks (or a
//! watcher flush that re-queues watchers) starts a fresh round instead
//! of mutating the sequence being iterated.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::backend::{Flush, TickBackend};
use super::{panic_message, SchedulerError};

/// A callback awaiting the next flush point.
pub type TickCallback = Box<dyn FnOnce() + Send + 'static>;

/// Shared callback queue plus the backend that delivers its flushes.
pub struct TickScheduler {
    callbacks: Mutex<Vec<TickCallback>>,
    armed: AtomicBool,
    backend: Arc<dyn TickBackend>,
}

impl TickScheduler {
    /// Select the first available backend from `chain` and build a
    /// scheduler around it.
    ///
    /// The decision is made here, once; later calls never re-probe
    /// availability, so the primitive choice is consistent across the
    /// scheduler's lifetime.
    pub fn select(chain: Vec<Arc<dyn TickBackend>>) -> Result<Arc<Self>, SchedulerError> {
        let backend = chain
            .into_iter()
            .find(|backend| backend.is_available())
            .ok_or(SchedulerError::NoBackendAvailable)?;

        tracing::debug!(backend = backend.name(), "selected tick backend");

        Ok(Arc::new(Self {
            callbacks: Mutex::new(Vec::new()),
            armed: AtomicBool::new(false),
            backend,
        }))
    }

    /// Name of the backend this scheduler runs on.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Schedule `callback` to run at the next flush point.
    ///
    /// If no flush is armed for the current round, arms exactly one.
    pub fn next_tick(self: &Arc<Self>, callback: TickCallback) {
        self.callbacks.lock().push(callback);
        self.request_flush();
    }

    /// Arm a flush for the current round if none is armed yet.
    ///
    /// The no-callback form of `next_tick`: callers that only need the
    /// already-queued work to run can request the flush point without
    /// adding anything to it.
    pub fn request_flush(self: &Arc<Self>) {
        if !self.armed.swap(true, Ordering::AcqRel) {
            let scheduler = Arc::clone(self);
            self.backend
                .arm(Box::new(move || scheduler.flush_callbacks()) as Flush);
        }
    }

    /// Run every callback queued for this round, in submission order.
    ///
    /// The armed flag is cleared and the list snapshotted before any
    /// callback runs. A panicking callback is logged and does not stop
    /// the rest of the round.
    pub fn flush_callbacks(&self) {
        self.armed.store(false, Ordering::Release);
        let batch = std::mem::take(&mut *self.callbacks.lock());

        for callback in batch {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(callback)) {
                tracing::error!(
                    reason = panic_message(&panic),
                    "tick callback panicked during flush"
                );
            }
        }
    }

    /// Number of callbacks waiting for the next flush point.
    pub fn pending_callbacks(&self) -> usize {
        self.callbacks.lock().len()
    }
}
