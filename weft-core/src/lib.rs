//! Weft Core
//!
//! This crate is the reactivity core of the Weft UI runtime. It
//! determines, for a graph of mutable state cells and the computations
//! that read them, exactly which computations must re-run after a
//! mutation — and schedules those re-runs so that many mutations within
//! one logical turn collapse into a single re-run per affected
//! computation.
//!
//! # Architecture
//!
//! Two tightly coupled halves:
//!
//! - `reactive`: automatic dependency tracking. State cells own a
//!   subscriber registry; watchers discover their dependencies by
//!   evaluating inside a tracking scope; both directions of the
//!   subscription are deduplicated.
//!
//! - `schedule`: the batched, deduplicated, asynchronously flushed
//!   update queue, and the tick scheduler that picks the best
//!   deferred-execution primitive the host offers.
//!
//! Data flows: a write to a cell notifies its dep; each subscribed
//! watcher queues itself (deduplicated); the queue asks the tick
//! scheduler for one flush; the flush re-evaluates each watcher, which
//! re-enters the tracking scope and refreshes subscriptions.
//!
//! Template compilation, property interception, and rendering are
//! external collaborators: interception calls [`reactive::Dep::depend`]
//! on reads and [`reactive::Dep::notify`] on changed writes, and a
//! watcher's body does whatever painting the host needs.
//!
//! # Example
//!
//! ```rust,ignore
//! use weft_core::Runtime;
//!
//! let rt = Runtime::new();
//! let count = rt.cell(0);
//!
//! let count_reader = count.clone();
//! let render = rt.watch(move || {
//!     println!("count is {}", count_reader.get());
//! });
//!
//! count.set(1);
//! count.set(2);
//! // One re-render with 2, after the flush
//! rt.next_tick(|| println!("updates applied"));
//! ```

pub mod reactive;
pub mod schedule;

mod runtime;

pub use runtime::Runtime;
