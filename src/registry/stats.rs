//! Registry counters

use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) registered: AtomicUsize,
    pub(crate) cleaned: AtomicUsize,
    pub(crate) cancelled: AtomicUsize,
    pub(crate) failed: AtomicUsize,
    pub(crate) restarts: AtomicUsize,
}

impl Counters {
    pub(crate) fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn read(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::Relaxed)
    }
}

/// Snapshot of a registry's activity
///
/// # Examples
///
/// ```
/// use lifeline::{CleanupRegistry, ReaperConfig};
/// use std::sync::Arc;
///
/// let registry = CleanupRegistry::manual(ReaperConfig::default());
/// let target = Arc::new(1u8);
/// registry.register_fn(&target, || {}).unwrap();
///
/// let stats = registry.stats();
/// assert_eq!(stats.total_registered, 1);
/// assert_eq!(stats.currently_live, 1);
/// assert_eq!(stats.total_cleaned, 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Total registrations accepted
    pub total_registered: usize,
    /// Records whose action ran, including failed and empty actions
    pub total_cleaned: usize,
    /// Records removed by `clear` before their action ran
    pub total_cancelled: usize,
    /// Actions that returned an error or panicked
    pub total_failed: usize,
    /// Records currently anchored in the live set
    pub currently_live: usize,
    /// Records waiting in the reference queue
    pub currently_queued: usize,
    /// Times the reaper re-entered its loop after an escaped panic
    pub dispatcher_restarts: usize,
}
