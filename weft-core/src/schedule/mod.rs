//! Batched Update Scheduling
//!
//! This module implements the deferral half of the reactivity core: the
//! bookkeeping of *what* must re-run is synchronous (see
//! [`reactive`](crate::reactive)), but the re-running itself is deferred
//! to a flush point so that many mutations within one logical turn
//! collapse into a single re-evaluation per affected watcher.
//!
//! # Pieces
//!
//! - [`UpdateQueue`]: collects watchers for one round, deduplicates by
//!   identity, flushes them once in first-queued order.
//!
//! - [`TickScheduler`]: the shared callback list plus exactly-once
//!   arming; the queue's flush is just one callback among any the host
//!   submitted via `next_tick`.
//!
//! - [`TickBackend`]: the deferred-execution primitive. An ordered
//!   chain of backends is probed once at startup and the first
//!   available one is used for every round thereafter.
//!
//! # The Snapshot-Then-Clear Protocol
//!
//! Both the queue and the tick scheduler copy-and-reset their pending
//! collection before iterating it. This is what makes re-entrant
//! queueing safe: work submitted from inside a flush lands in a fresh
//! round with its own armed flush, and nothing is lost or run twice.

mod backend;
mod queue;
mod tick;

pub use backend::{
    default_chain, Flush, ManualBackend, SpawnBackend, TickBackend, TimerBackend,
    TokioTaskBackend, WakeThreadBackend,
};
pub use queue::UpdateQueue;
pub use tick::{TickCallback, TickScheduler};

/// Errors from tick scheduling setup.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// No backend in the configured chain reported itself available.
    ///
    /// Cannot happen with the default chain, whose last backend always
    /// reports available.
    #[error("no tick backend available on this host")]
    NoBackendAvailable,
}

/// Best-effort extraction of a panic payload message for logging.
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
