//! Dependency Tracking
//!
//! This module implements the tracking half of the reactivity core: who
//! read what, and who must be told when it changes.
//!
//! # Concepts
//!
//! ## State cells and deps
//!
//! A [`StateCell`] is one mutable storage location. Each cell owns a
//! [`Dep`], the registry of watchers that have read it. Reading a cell
//! inside a watcher's evaluation subscribes that watcher; writing a
//! changed value notifies every subscriber.
//!
//! ## Watchers
//!
//! A [`Watcher`] is a reactive consumer — a render pass or a derived
//! value. It evaluates once on creation to discover its dependencies,
//! and re-evaluates when any of them change. Notification never
//! re-evaluates synchronously: watchers submit themselves to the
//! runtime's update queue, so many mutations in one turn collapse into a
//! single re-run per watcher.
//!
//! ## The evaluation context
//!
//! Tracking works through a thread-local stack of currently evaluating
//! watchers (see [`context`]). When a cell is read, the innermost
//! watcher on the stack is the one subscribed. This approach (automatic
//! dependency tracking) is the one used by Vue, SolidJS, and Leptos.
//!
//! # Dual Bookkeeping
//!
//! A subscription is recorded on both sides: the watcher keeps the dep's
//! id (for dedup) and a handle to the dep (for future unsubscription),
//! and the dep keeps the watcher in its subscriber list. The invariant
//! that both sides stay in sync holds because `Dep::depend` →
//! `Watcher::add_dep` → `Dep::add_sub` is the only path that creates a
//! subscription.

pub mod context;
mod cell;
mod dep;
mod watcher;

pub use cell::StateCell;
pub use dep::{Dep, DepId};
pub use watcher::{Watcher, WatcherId};
