//! Non-owning liveness probes and the `Reachable` target contract

use std::sync::{Arc, Weak};

use super::tracked::{ReclaimSubscription, Tracked};

/// Hook fired synchronously when a [`Tracked`] target loses its last strong handle.
pub type ReclaimHook = Box<dyn FnOnce() + Send + 'static>;

/// A non-owning view of a target that can report whether it has been reclaimed.
///
/// Implementations must never extend the target's lifetime.
pub trait WeakObserver: Send + Sync {
    /// Returns `true` once the observed target is gone for good.
    fn is_cleared(&self) -> bool;
}

impl<T: ?Sized + Send + Sync> WeakObserver for Weak<T> {
    fn is_cleared(&self) -> bool {
        self.strong_count() == 0
    }
}

/// Anything that can be registered as the target of a cleanup action.
///
/// # Examples
///
/// ```
/// use lifeline::reclaim::{Reachable, WeakObserver};
/// use std::sync::Arc;
///
/// let socket = Arc::new(String::from("fd:12"));
/// let observer = socket.observer();
/// assert!(!observer.is_cleared());
///
/// drop(socket);
/// assert!(observer.is_cleared());
/// ```
pub trait Reachable {
    /// Produce a liveness probe for this target.
    fn observer(&self) -> Box<dyn WeakObserver>;

    /// Subscribe `hook` to run when the target is dropped.
    ///
    /// Returns `None` when the target has no drop notification, in which case
    /// reclamation is only discovered by a census.
    fn on_reclaimed(&self, hook: ReclaimHook) -> Option<ReclaimSubscription> {
        drop(hook);
        None
    }
}

impl<T: ?Sized + Send + Sync + 'static> Reachable for Arc<T> {
    fn observer(&self) -> Box<dyn WeakObserver> {
        Box::new(Arc::downgrade(self))
    }
}

impl<T: ?Sized + Send + Sync + 'static> Reachable for Weak<T> {
    fn observer(&self) -> Box<dyn WeakObserver> {
        Box::new(self.clone())
    }
}

impl<T: Send + Sync + 'static> Reachable for Tracked<T> {
    fn observer(&self) -> Box<dyn WeakObserver> {
        Box::new(self.downgrade())
    }

    fn on_reclaimed(&self, hook: ReclaimHook) -> Option<ReclaimSubscription> {
        Some(self.subscribe(hook))
    }
}
