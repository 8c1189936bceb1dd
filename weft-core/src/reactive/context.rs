//! Evaluation Context
//!
//! The evaluation context tracks which watcher is currently being
//! evaluated. This enables automatic dependency tracking: when a state
//! cell is read, its dep can register the current watcher as a subscriber.
//!
//! # Implementation
//!
//! We use a thread-local stack of watcher handles. When a watcher starts
//! evaluating, it pushes itself onto the stack; when the evaluation
//! completes, it pops. Nested evaluations (a watcher whose body triggers
//! another watcher's evaluation) therefore attribute reads to the
//! innermost active watcher and revert to the outer one afterwards.
//!
//! The stack is per-thread by construction, which is what keeps the
//! "exactly one current watcher" invariant true even when a tick backend
//! delivers a flush on a worker thread.

use std::cell::RefCell;

use super::watcher::{Watcher, WatcherId};

thread_local! {
    static EVAL_STACK: RefCell<Vec<Watcher>> = RefCell::new(Vec::new());
}

/// Guard that pops the evaluation stack when dropped.
///
/// This ensures the stack stays balanced even if the watcher's
/// evaluation procedure panics.
pub struct EvalScope {
    watcher_id: WatcherId,
}

impl EvalScope {
    /// Enter an evaluation scope for the given watcher.
    ///
    /// While the scope is active, any state cell that is read will record
    /// this watcher as a subscriber. The scope is exited when the
    /// returned guard is dropped.
    pub fn enter(watcher: &Watcher) -> Self {
        let watcher_id = watcher.id();
        EVAL_STACK.with(|stack| stack.borrow_mut().push(watcher.clone()));
        Self { watcher_id }
    }
}

impl Drop for EvalScope {
    fn drop(&mut self) {
        EVAL_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Verify we're popping the scope we pushed.
            if let Some(watcher) = popped {
                debug_assert_eq!(
                    watcher.id(),
                    self.watcher_id,
                    "EvalScope mismatch: expected {:?}, got {:?}",
                    self.watcher_id,
                    watcher.id()
                );
            }
        });
    }
}

/// Get the watcher currently being evaluated on this thread, if any.
///
/// Returns the innermost active watcher.
pub fn current_watcher() -> Option<Watcher> {
    EVAL_STACK.with(|stack| stack.borrow().last().cloned())
}

/// Check whether an evaluation is active on this thread.
pub fn is_tracking() -> bool {
    EVAL_STACK.with(|stack| !stack.borrow().is_empty())
}

/// Current nesting depth of the evaluation stack.
pub fn depth() -> usize {
    EVAL_STACK.with(|stack| stack.borrow().len())
}
