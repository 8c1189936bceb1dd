//! Update Queue
//!
//! The update queue collects watchers that requested re-evaluation
//! during one scheduling round, deduplicates them by identity, and runs
//! them exactly once when the round flushes.
//!
//! # Round State Machine
//!
//! idle → (first `queue` call) → pending (a flush is armed with the tick
//! scheduler) → flushing → idle.
//!
//! # Clear-Before-Run
//!
//! `flush` snapshots and clears the pending map before invoking any
//! watcher. A watcher that triggers further mutations while running —
//! common when a computation writes to a different cell — therefore
//! re-queues into a *fresh* round instead of being silently dropped or
//! mutating the sequence being iterated.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::tick::TickScheduler;
use super::panic_message;
use crate::reactive::{Watcher, WatcherId};

/// Per-round pending set, deduplicated by watcher identity and flushed
/// in first-insertion order.
///
/// Cheap-clone handle; the runtime and the armed flush closure share it.
#[derive(Clone)]
pub struct UpdateQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    state: Mutex<QueueState>,
    ticker: Arc<TickScheduler>,
}

struct QueueState {
    /// Membership test and first-insertion order in one structure, so a
    /// watcher id can appear at most once per round by construction.
    pending: IndexMap<WatcherId, Watcher>,
    /// Whether a flush has been requested for the current round.
    armed: bool,
}

impl UpdateQueue {
    pub(crate) fn new(ticker: Arc<TickScheduler>) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState {
                    pending: IndexMap::new(),
                    armed: false,
                }),
                ticker,
            }),
        }
    }

    /// Submit a watcher for re-evaluation in the current round.
    ///
    /// No-op if the watcher is already pending this round. On the
    /// idle → pending transition, asks the tick scheduler for exactly
    /// one flush.
    pub fn queue(&self, watcher: Watcher) {
        if watcher.is_disposed() {
            return;
        }

        let arm = {
            let mut state = self.inner.state.lock();
            if state.pending.contains_key(&watcher.id()) {
                // Already scheduled this round
                return;
            }
            state.pending.insert(watcher.id(), watcher);

            if state.armed {
                false
            } else {
                state.armed = true;
                true
            }
        };

        if arm {
            let queue = self.clone();
            self.inner.ticker.next_tick(Box::new(move || queue.flush()));
        }
    }

    /// Run every watcher queued for this round, in first-queued order.
    ///
    /// The pending map is taken and the armed flag cleared before any
    /// `run()`, so re-entrant `queue` calls start a fresh round. A
    /// panicking watcher is surfaced through `tracing::error!` and does
    /// not prevent its siblings from running.
    pub fn flush(&self) {
        let batch = {
            let mut state = self.inner.state.lock();
            state.armed = false;
            std::mem::take(&mut state.pending)
        };

        for (id, watcher) in batch {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| watcher.run())) {
                tracing::error!(
                    watcher = id.raw(),
                    reason = panic_message(&panic),
                    "watcher evaluation panicked during flush"
                );
            }
        }
    }

    /// Number of watchers pending in the current round.
    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().pending.len()
    }
}
