//! Ownership-tracked strong handles with synchronous drop notification
//!
//! A [`Tracked<T>`] behaves like an `Arc<T>` whose final drop runs every
//! subscribed reclaim hook on the dropping thread. The cleanup registry uses
//! this to enqueue a record the instant its target goes away, instead of
//! waiting for the next census.

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::observer::ReclaimHook;

/// Keyed hooks, so a subscriber can withdraw its own hook before the value dies.
#[derive(Default)]
struct HookList {
    next_key: AtomicU64,
    hooks: Mutex<Vec<(u64, ReclaimHook)>>,
}

struct TrackedInner<T> {
    value: T,
    hooks: Arc<HookList>,
}

impl<T> Drop for TrackedInner<T> {
    fn drop(&mut self) {
        let hooks = std::mem::take(&mut *self.hooks.hooks.lock());
        for (_, hook) in hooks {
            hook();
        }
    }
}

/// A hook subscribed to a [`Tracked`] value, returned so it can be withdrawn.
///
/// Dropping a subscription does not withdraw the hook; only
/// [`cancel`](Self::cancel) does. Holding one never keeps the value alive.
pub struct ReclaimSubscription {
    key: u64,
    hooks: Weak<HookList>,
}

impl ReclaimSubscription {
    /// Remove the hook. Returns `false` if it already ran or was already removed.
    pub fn cancel(&self) -> bool {
        let Some(list) = self.hooks.upgrade() else {
            return false;
        };
        let mut hooks = list.hooks.lock();
        let before = hooks.len();
        hooks.retain(|(key, _)| *key != self.key);
        hooks.len() != before
    }
}

impl fmt::Debug for ReclaimSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReclaimSubscription")
            .field("key", &self.key)
            .finish()
    }
}

/// Strong handle to a value whose reclamation is reported to subscribers.
///
/// # Examples
///
/// ```
/// use lifeline::reclaim::Tracked;
///
/// let conn = Tracked::new(42u16);
/// let weak = conn.downgrade();
/// assert_eq!(*conn, 42);
///
/// drop(conn);
/// assert!(weak.upgrade().is_none());
/// ```
pub struct Tracked<T> {
    inner: Arc<TrackedInner<T>>,
}

impl<T> Tracked<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(TrackedInner {
                value,
                hooks: Arc::new(HookList::default()),
            }),
        }
    }

    /// Non-owning handle to the same value.
    pub fn downgrade(&self) -> TrackedWeak<T> {
        TrackedWeak {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Number of live strong handles.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Number of hooks waiting for this value's reclamation.
    pub fn pending_hooks(&self) -> usize {
        self.inner.hooks.hooks.lock().len()
    }

    pub(crate) fn subscribe(&self, hook: ReclaimHook) -> ReclaimSubscription {
        let list = &self.inner.hooks;
        let key = list.next_key.fetch_add(1, Ordering::Relaxed);
        list.hooks.lock().push((key, hook));
        ReclaimSubscription {
            key,
            hooks: Arc::downgrade(list),
        }
    }

    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }
}

impl<T> Clone for Tracked<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Deref for Tracked<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("value", &self.inner.value)
            .field("strong_count", &self.strong_count())
            .finish()
    }
}

/// Weak counterpart of [`Tracked`].
pub struct TrackedWeak<T> {
    inner: Weak<TrackedInner<T>>,
}

impl<T> TrackedWeak<T> {
    pub fn upgrade(&self) -> Option<Tracked<T>> {
        self.inner.upgrade().map(|inner| Tracked { inner })
    }

    pub fn is_cleared(&self) -> bool {
        self.inner.strong_count() == 0
    }
}

impl<T> Clone for TrackedWeak<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for TrackedWeak<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedWeak")
            .field("cleared", &self.is_cleared())
            .finish()
    }
}

impl<T: Send + Sync> super::observer::WeakObserver for TrackedWeak<T> {
    fn is_cleared(&self) -> bool {
        TrackedWeak::is_cleared(self)
    }
}
