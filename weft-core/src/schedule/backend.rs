//! Tick Backends
//!
//! A tick backend is the primitive that decides *when* a deferred flush
//! actually executes. Each backend exposes the same capability — arm one
//! deferred callback — and reports once, at startup, whether the host
//! supports it. The [`TickScheduler`](super::TickScheduler) picks the
//! first available backend from an ordered chain and never re-decides.
//!
//! # The Default Chain
//!
//! Highest priority first:
//!
//! 1. [`TokioTaskBackend`] — spawn onto the tokio runtime the scheduler
//!    was constructed inside. The flush runs as soon as the current task
//!    yields, ahead of any timer. Unavailable outside a runtime.
//!
//! 2. [`WakeThreadBackend`] — one persistent worker thread, parked at 0%
//!    CPU; arming deposits the flush and unparks it. The near-immediate
//!    option for hosts without an async runtime.
//!
//! 3. [`SpawnBackend`] — spawn a fresh thread per round that runs the
//!    flush immediately.
//!
//! 4. [`TimerBackend`] — a zero-delay timer thread. Always available;
//!    the last resort, since the OS scheduler may service other work
//!    first.
//!
//! Hosts that drive their own event loop can bypass the chain entirely
//! with [`ManualBackend`] and pump rounds from wherever they like.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

/// A deferred flush, armed exactly once per scheduling round.
pub type Flush = Box<dyn FnOnce() + Send + 'static>;

/// A deferred-execution primitive usable by the tick scheduler.
///
/// Implementations must guarantee that an armed flush eventually runs
/// exactly once. `is_available` is probed a single time when the
/// scheduler selects its backend.
pub trait TickBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Whether the host supports this backend. Probed once at startup.
    fn is_available(&self) -> bool;

    /// Arm one deferred execution of `flush`.
    fn arm(&self, flush: Flush);
}

/// The ordered default backend chain.
pub fn default_chain() -> Vec<Arc<dyn TickBackend>> {
    vec![
        Arc::new(TokioTaskBackend::new()),
        Arc::new(WakeThreadBackend::new()),
        Arc::new(SpawnBackend::new()),
        Arc::new(TimerBackend::new()),
    ]
}

// ----------------------------------------------------------------------------
// Tokio task backend
// ----------------------------------------------------------------------------

/// Runs the flush on the tokio runtime that was current at construction.
///
/// The handle is captured once; availability never changes afterwards.
pub struct TokioTaskBackend {
    handle: Option<tokio::runtime::Handle>,
}

impl TokioTaskBackend {
    /// Capture the current tokio runtime handle, if any.
    pub fn new() -> Self {
        Self {
            handle: tokio::runtime::Handle::try_current().ok(),
        }
    }
}

impl Default for TokioTaskBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TickBackend for TokioTaskBackend {
    fn name(&self) -> &'static str {
        "tokio-task"
    }

    fn is_available(&self) -> bool {
        self.handle.is_some()
    }

    fn arm(&self, flush: Flush) {
        match &self.handle {
            Some(handle) => {
                handle.spawn(async move { flush() });
            }
            None => {
                tracing::warn!("tokio-task backend armed without a runtime handle");
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Wake thread backend
// ----------------------------------------------------------------------------

struct WakeShared {
    jobs: Mutex<Vec<Flush>>,
    shutdown: AtomicBool,
}

/// One persistent worker thread, parked until a flush is armed.
///
/// `arm` deposits the flush in a shared slot and unparks the worker.
/// Parking costs 0% CPU and an unpark issued before the park takes
/// effect still wakes it, so no round can be lost.
pub struct WakeThreadBackend {
    shared: Arc<WakeShared>,
    worker: Option<JoinHandle<()>>,
}

impl WakeThreadBackend {
    /// Spawn the worker thread.
    pub fn new() -> Self {
        let shared = Arc::new(WakeShared {
            jobs: Mutex::new(Vec::new()),
            shutdown: AtomicBool::new(false),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("weft-tick".to_string())
            .spawn(move || Self::work_loop(worker_shared))
            .ok();

        Self { shared, worker }
    }

    fn work_loop(shared: Arc<WakeShared>) {
        loop {
            if shared.shutdown.load(Ordering::Acquire) {
                break;
            }

            let jobs = std::mem::take(&mut *shared.jobs.lock());
            if jobs.is_empty() {
                // Nothing armed; park until the next arm unparks us
                thread::park();
                continue;
            }

            for job in jobs {
                job();
            }
        }
    }
}

impl Default for WakeThreadBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TickBackend for WakeThreadBackend {
    fn name(&self) -> &'static str {
        "wake-thread"
    }

    fn is_available(&self) -> bool {
        self.worker.is_some()
    }

    fn arm(&self, flush: Flush) {
        self.shared.jobs.lock().push(flush);
        if let Some(worker) = &self.worker {
            worker.thread().unpark();
        }
    }
}

impl Drop for WakeThreadBackend {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            worker.thread().unpark();
            let _ = worker.join();
        }
    }
}

// ----------------------------------------------------------------------------
// Spawn backend
// ----------------------------------------------------------------------------

/// Spawns a fresh thread per round that runs the flush immediately.
pub struct SpawnBackend {
    available: bool,
}

impl SpawnBackend {
    /// Probe thread spawning once.
    pub fn new() -> Self {
        let available = thread::Builder::new()
            .name("weft-probe".to_string())
            .spawn(|| {})
            .map(|probe| probe.join().is_ok())
            .unwrap_or(false);

        Self { available }
    }
}

impl Default for SpawnBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TickBackend for SpawnBackend {
    fn name(&self) -> &'static str {
        "spawn"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn arm(&self, flush: Flush) {
        let spawned = thread::Builder::new()
            .name("weft-flush".to_string())
            .spawn(move || flush());

        if spawned.is_err() {
            tracing::warn!("spawn backend failed to arm a flush thread");
        }
    }
}

// ----------------------------------------------------------------------------
// Timer backend
// ----------------------------------------------------------------------------

/// A zero-delay timer: sleep, then flush, on a fresh thread.
///
/// Always reports available. Inherently the lowest priority option: the
/// OS may schedule other work before the timer thread runs.
pub struct TimerBackend {
    delay: Duration,
}

impl TimerBackend {
    /// Zero-delay timer.
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    /// Timer with an explicit delay.
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for TimerBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TickBackend for TimerBackend {
    fn name(&self) -> &'static str {
        "timer"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn arm(&self, flush: Flush) {
        let delay = self.delay;
        let spawned = thread::Builder::new()
            .name("weft-timer".to_string())
            .spawn(move || {
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                flush();
            });

        if spawned.is_err() {
            tracing::warn!("timer backend failed to arm a flush thread");
        }
    }
}

// ----------------------------------------------------------------------------
// Manual backend
// ----------------------------------------------------------------------------

/// Host-driven backend: armed flushes accumulate until the host pumps
/// them with [`run_pending`](ManualBackend::run_pending).
///
/// Never part of the default chain. Meant for hosts that already own an
/// event loop and want to run flushes at a point of their choosing, and
/// for deterministic tests.
#[derive(Clone)]
pub struct ManualBackend {
    pending: Arc<Mutex<Vec<Flush>>>,
}

impl ManualBackend {
    /// Create a new manual backend with nothing armed.
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Run every flush armed so far, in arming order.
    ///
    /// Returns the number of flushes run. Flushes armed while running
    /// (a new scheduling round) are left for the next call, mirroring
    /// how asynchronous backends separate rounds.
    pub fn run_pending(&self) -> usize {
        let batch = std::mem::take(&mut *self.pending.lock());
        let count = batch.len();
        for flush in batch {
            flush();
        }
        count
    }

    /// Whether any flush is currently armed.
    pub fn is_armed(&self) -> bool {
        !self.pending.lock().is_empty()
    }
}

impl Default for ManualBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TickBackend for ManualBackend {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn arm(&self, flush: Flush) {
        self.pending.lock().push(flush);
    }
}
