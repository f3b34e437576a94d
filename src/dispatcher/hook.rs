//! Failure hook for cleanup actions that error or panic

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::error::CleanupError;

type HookFn = Box<dyn Fn(&CleanupError) + Send + Sync + 'static>;

/// Hot-swappable receiver of cleanup failures.
///
/// The reaper reads the hook on every failure without taking a lock, so it can
/// be replaced while cleanups are in flight.
pub(crate) struct FailureHook {
    current: ArcSwap<HookFn>,
}

impl FailureHook {
    pub(crate) fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Box::new(log_failure) as HookFn),
        }
    }

    pub(crate) fn set<F>(&self, hook: F)
    where
        F: Fn(&CleanupError) + Send + Sync + 'static,
    {
        let hook: HookFn = Box::new(hook);
        self.current.store(Arc::new(hook));
    }

    pub(crate) fn reset(&self) {
        let hook: HookFn = Box::new(log_failure);
        self.current.store(Arc::new(hook));
    }

    pub(crate) fn report(&self, error: &CleanupError) {
        let hook = self.current.load_full();
        (hook.as_ref())(error);
    }
}

fn log_failure(error: &CleanupError) {
    tracing::warn!(error = %error, "cleanup action failed");
}
