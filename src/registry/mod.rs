//! Reachability-triggered cleanup registry
//!
//! A [`CleanupRegistry`] lets any component attach a cleanup action to the
//! lifetime of a target it does not own. The registry keeps a tracking record
//! per registration, anchored in a concurrent live set; the record holds only a
//! weak observer of the target, so registering never keeps the target alive.
//!
//! Once the target is gone its record is queued, either immediately by a
//! [`Tracked`](crate::reclaim::Tracked) drop hook or by the next census, and
//! the reaper thread runs the action exactly once before removing the record.
//!
//! ## Lifecycle
//!
//! - **Live**: anchored in the live set, target still reachable
//! - **Queued**: target reclaimed, record waiting in the reference queue
//! - **Running / Cleaned**: the reaper owns the record and ran its action
//! - **Cancelled**: [`CleanupHandle::clear`] won the race; the action never runs

pub mod handle;
pub(crate) mod live_set;
pub mod record;
pub mod stats;


use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::config::ReaperConfig;
use crate::dispatcher::{self, FailureHook};
use crate::error::{CleanupError, CleanupResult};
use crate::reclaim::{Reachable, ReferenceQueue};

pub use handle::CleanupHandle;
pub use record::{CleanupAction, RecordId, RecordState};
pub use stats::RegistryStats;

use live_set::LiveSet;
use record::{ActionOutcome, TrackingRecord};
use stats::Counters;

/// State shared between registry handles, cleanup handles, drop hooks and the reaper.
pub(crate) struct Shared {
    pub(crate) config: ReaperConfig,
    pub(crate) live: LiveSet,
    pub(crate) queue: ReferenceQueue<Arc<TrackingRecord>>,
    pub(crate) hook: FailureHook,
    pub(crate) counters: Counters,
    shutdown: AtomicBool,
    /// Raised before the reaper spawns, lowered by the reaper itself on exit
    pub(crate) reaper_alive: AtomicBool,
    /// Held by whichever thread is draining the queue
    drain_lock: Mutex<()>,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl Shared {
    fn new(config: ReaperConfig) -> Self {
        Self {
            config,
            live: LiveSet::new(),
            queue: ReferenceQueue::new(),
            hook: FailureHook::new(),
            counters: Counters::default(),
            shutdown: AtomicBool::new(false),
            reaper_alive: AtomicBool::new(false),
            drain_lock: Mutex::new(()),
            reaper: Mutex::new(None),
        }
    }

    pub(crate) fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Queue a record whose target is gone. Only the first detector wins.
    fn enqueue(&self, record: &Arc<TrackingRecord>) -> bool {
        if !record.mark_queued() {
            return false;
        }
        tracing::trace!(record = %record.id(), "target reclaimed, record queued");
        self.queue.enqueue(Arc::clone(record))
    }

    /// Queue every live record whose target has been reclaimed.
    pub(crate) fn census(&self) -> usize {
        let queued = self
            .live
            .reclaimed()
            .iter()
            .filter(|record| self.enqueue(record))
            .count();
        if queued > 0 {
            tracing::debug!(queued, live = self.live.len(), "census queued reclaimed records");
        }
        queued
    }

    pub(crate) fn clear(&self, id: RecordId) -> bool {
        let Some(record) = self.live.get(id) else {
            return false;
        };
        if !record.cancel() {
            return false;
        }
        self.live.remove(id);
        Counters::bump(&self.counters.cancelled);
        tracing::trace!(record = %id, "registration cleared");
        true
    }

    /// Run one queued record. Returns `false` if it was cancelled after queuing.
    pub(crate) fn dispatch(&self, record: Arc<TrackingRecord>) -> bool {
        let id = record.id();
        if !record.begin_cleanup() {
            tracing::trace!(record = %id, "skipping cancelled record");
            return false;
        }

        let outcome = record.run();
        Counters::bump(&self.counters.cleaned);
        if matches!(outcome, ActionOutcome::Failed(_)) {
            Counters::bump(&self.counters.failed);
        }
        self.live.remove(id);

        match outcome {
            ActionOutcome::Completed => tracing::trace!(record = %id, "cleanup action ran"),
            ActionOutcome::Empty => tracing::trace!(record = %id, "record had no cleanup action"),
            ActionOutcome::Failed(reason) => {
                self.hook
                    .report(&CleanupError::CleanupActionFailure { id, reason });
            }
        }
        true
    }

    /// Dispatch everything currently queued on the calling thread.
    pub(crate) fn drain(&self) -> usize {
        let _draining = self.drain_lock.lock();
        self.drain_locked()
    }

    /// Like [`drain`](Self::drain), but gives up if another thread is draining.
    fn try_drain(&self) -> Option<usize> {
        let _draining = self.drain_lock.try_lock()?;
        Some(self.drain_locked())
    }

    fn drain_locked(&self) -> usize {
        let mut dispatched = 0;
        while let Some(record) = self.queue.poll() {
            if self.dispatch(record) {
                dispatched += 1;
            }
        }
        dispatched
    }

    fn reaper_running(&self) -> bool {
        self.reaper_alive.load(Ordering::Acquire)
    }
}

/// Handle to a cleanup registry and its reaper thread.
///
/// Cloning is cheap; every clone refers to the same live set and reaper.
///
/// # Examples
///
/// ```
/// use lifeline::{CleanupRegistry, ReaperConfig};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// let registry = CleanupRegistry::manual(ReaperConfig::default());
/// let closed = Arc::new(AtomicBool::new(false));
/// let socket = Arc::new("fd:7");
///
/// let flag = Arc::clone(&closed);
/// registry
///     .register_fn(&socket, move || flag.store(true, Ordering::SeqCst))
///     .unwrap();
///
/// drop(socket);
/// assert_eq!(registry.collect(), 1);
/// assert_eq!(registry.run_pending(), 1);
/// assert!(closed.load(Ordering::SeqCst));
/// assert!(registry.is_empty());
/// ```
#[derive(Clone)]
pub struct CleanupRegistry {
    shared: Arc<Shared>,
}

impl CleanupRegistry {
    /// Create a registry and spawn its reaper thread.
    pub fn start(config: ReaperConfig) -> CleanupResult<Self> {
        config.validate()?;
        let registry = Self::manual(config);
        registry.shared.reaper_alive.store(true, Ordering::Release);
        let handle = dispatcher::spawn(Arc::clone(&registry.shared)).inspect_err(|_| {
            registry.shared.reaper_alive.store(false, Ordering::Release);
        })?;
        *registry.shared.reaper.lock() = Some(handle);
        Ok(registry)
    }

    /// Create a registry without a reaper thread.
    ///
    /// Nothing runs until the owner calls [`collect`](Self::collect) and
    /// [`run_pending`](Self::run_pending).
    pub fn manual(config: ReaperConfig) -> Self {
        Self {
            shared: Arc::new(Shared::new(config)),
        }
    }

    pub fn config(&self) -> &ReaperConfig {
        &self.shared.config
    }

    /// Run `action` once `target` becomes unreachable.
    ///
    /// `None` registers a record with nothing to run. The registry only ever
    /// holds a weak observer of `target`.
    ///
    /// # Errors
    ///
    /// [`CleanupError::InvalidArgument`] if `target` is already unreachable,
    /// such as a dangling `Weak`.
    pub fn register<R>(
        &self,
        target: &R,
        action: Option<CleanupAction>,
    ) -> CleanupResult<CleanupHandle>
    where
        R: Reachable + ?Sized,
    {
        let observer = target.observer();
        if observer.is_cleared() {
            return Err(CleanupError::InvalidArgument(
                "target is not reachable, there is nothing to track".to_string(),
            ));
        }

        let record = Arc::new(TrackingRecord::new(observer, action));
        let id = record.id();
        self.shared.live.insert(Arc::clone(&record));
        Counters::bump(&self.shared.counters.registered);

        let weak_record = Arc::downgrade(&record);
        let weak_shared = Arc::downgrade(&self.shared);
        let subscription = target.on_reclaimed(Box::new(move || {
            if let Some(shared) = weak_shared.upgrade() {
                if let Some(record) = weak_record.upgrade() {
                    shared.enqueue(&record);
                }
            }
        }));
        if let Some(subscription) = subscription {
            record.attach(subscription);
        }

        tracing::trace!(record = %id, "registered cleanup action");
        Ok(CleanupHandle::new(id, Arc::downgrade(&self.shared)))
    }

    /// Register an infallible closure.
    pub fn register_fn<R, F>(&self, target: &R, action: F) -> CleanupResult<CleanupHandle>
    where
        R: Reachable + ?Sized,
        F: FnOnce() + Send + 'static,
    {
        self.register(
            target,
            Some(Box::new(move || {
                action();
                Ok(())
            })),
        )
    }

    /// Register a closure whose error is reported to the failure hook.
    pub fn register_fallible<R, F>(&self, target: &R, action: F) -> CleanupResult<CleanupHandle>
    where
        R: Reachable + ?Sized,
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.register(target, Some(Box::new(action)))
    }

    /// Cancel a registration without running its action.
    ///
    /// Idempotent. Returns `true` only if this call cancelled the record; handles
    /// from another registry are ignored.
    pub fn clear(&self, handle: &CleanupHandle) -> bool {
        handle.belongs_to(&self.shared) && self.shared.clear(handle.id())
    }

    pub fn contains(&self, handle: &CleanupHandle) -> bool {
        handle.belongs_to(&self.shared) && self.shared.live.contains(handle.id())
    }

    /// State of a registration, or `None` once it has left the live set.
    pub fn state(&self, handle: &CleanupHandle) -> Option<RecordState> {
        if !handle.belongs_to(&self.shared) {
            return None;
        }
        self.shared.live.get(handle.id()).map(|record| record.state())
    }

    /// Number of records anchored in the live set.
    pub fn len(&self) -> usize {
        self.shared.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Force a census on the calling thread.
    ///
    /// Returns how many records were newly queued.
    pub fn collect(&self) -> usize {
        self.shared.census()
    }

    /// Run queued actions on the calling thread.
    ///
    /// Only meaningful for [`manual`](Self::manual) registries, or once the
    /// reaper has exited after [`shutdown`](Self::shutdown). Returns 0 while the
    /// reaper is alive or another thread is already draining, so actions keep
    /// running one at a time. This includes calls made from inside an action.
    pub fn run_pending(&self) -> usize {
        if self.shared.reaper_running() {
            tracing::debug!("run_pending ignored, the reaper thread owns the queue");
            return 0;
        }
        self.shared.try_drain().unwrap_or_else(|| {
            tracing::debug!("run_pending ignored, another thread is draining");
            0
        })
    }

    /// Replace the hook that receives [`CleanupError::CleanupActionFailure`]s.
    pub fn set_failure_hook<F>(&self, hook: F)
    where
        F: Fn(&CleanupError) + Send + Sync + 'static,
    {
        self.shared.hook.set(hook);
    }

    /// Restore the default hook, which logs failures at warn level.
    pub fn reset_failure_hook(&self) {
        self.shared.hook.reset();
    }

    pub fn stats(&self) -> RegistryStats {
        let counters = &self.shared.counters;
        RegistryStats {
            total_registered: Counters::read(&counters.registered),
            total_cleaned: Counters::read(&counters.cleaned),
            total_cancelled: Counters::read(&counters.cancelled),
            total_failed: Counters::read(&counters.failed),
            currently_live: self.shared.live.len(),
            currently_queued: self.shared.queue.len(),
            dispatcher_restarts: Counters::read(&counters.restarts),
        }
    }

    /// Whether the reaper thread is alive. Stays `true` after a
    /// [`shutdown`](Self::shutdown) request until the reaper has drained and exited.
    pub fn is_dispatcher_running(&self) -> bool {
        self.shared.reaper_running()
    }

    /// Stop the reaper after it drains the records already queued.
    ///
    /// Records whose targets are still reachable stay registered and can be
    /// driven with [`collect`](Self::collect) and [`run_pending`](Self::run_pending).
    /// Idempotent. Called from inside a cleanup action it only signals the stop;
    /// the reaper finishes that action, drains, and exits on its own.
    pub fn shutdown(&self) -> CleanupResult<()> {
        self.shared.shutdown.store(true, Ordering::Release);
        let Some(handle) = self.shared.reaper.lock().take() else {
            return Ok(());
        };
        if handle.thread().id() == thread::current().id() {
            return Ok(());
        }
        handle
            .join()
            .map_err(|_| CleanupError::ThreadError("reaper thread panicked".to_string()))?;
        tracing::debug!(thread = %self.shared.config.thread_name, "reaper shut down");
        Ok(())
    }
}

impl fmt::Debug for CleanupRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanupRegistry")
            .field("live", &self.len())
            .field("queued", &self.shared.queue.len())
            .field("reaper_running", &self.is_dispatcher_running())
            .finish()
    }
}
