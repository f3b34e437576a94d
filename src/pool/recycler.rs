//! Bounded object pool whose leaked items are reclaimed by the cleanup registry

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::queue::ArrayQueue;

use crate::error::CleanupResult;
use crate::reclaim::Tracked;
use crate::registry::{CleanupHandle, CleanupRegistry};

type Factory<T> = Box<dyn Fn() -> T + Send + Sync + 'static>;
type Reset<T> = Box<dyn Fn(&mut T) + Send + Sync + 'static>;

struct PoolInner<T> {
    free: ArrayQueue<T>,
    factory: Factory<T>,
    reset: Reset<T>,
    outstanding: AtomicUsize,
    created: AtomicUsize,
    recycled: AtomicUsize,
    abandoned: AtomicUsize,
}

/// Token whose reclamation tells the pool a slot came back without its value.
#[derive(Debug)]
struct SlotLease;

/// Bounded pool of reusable values.
///
/// `acquire` hands out a [`Pooled`] item. Returning it with
/// [`release`](Recycler::release) resets the value and puts it back on the free
/// list. An item that is simply dropped loses its value, but the registry's
/// cleanup action still returns its slot, so the outstanding count stays honest.
///
/// # Examples
///
/// ```
/// use lifeline::pool::Recycler;
/// use lifeline::{CleanupRegistry, ReaperConfig};
///
/// let registry = CleanupRegistry::manual(ReaperConfig::default());
/// let pool = Recycler::new(4, &registry, || Vec::<u8>::with_capacity(64), |buf| buf.clear());
///
/// let mut buf = pool.acquire().unwrap();
/// buf.extend_from_slice(b"hello");
/// assert_eq!(pool.outstanding(), 1);
///
/// assert!(pool.release(buf));
/// assert_eq!(pool.outstanding(), 0);
/// assert_eq!(pool.free_len(), 1);
/// assert!(pool.acquire().unwrap().is_empty());
/// ```
pub struct Recycler<T> {
    inner: Arc<PoolInner<T>>,
    registry: CleanupRegistry,
}

impl<T: Send + 'static> Recycler<T> {
    /// Create a pool whose free list holds at most `capacity` values.
    ///
    /// The free list cannot be unbounded or empty, so a `capacity` of 0 is
    /// raised to 1. Items handed out are never limited by `capacity`.
    pub fn new<F, R>(capacity: usize, registry: &CleanupRegistry, factory: F, reset: R) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        R: Fn(&mut T) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(PoolInner {
                free: ArrayQueue::new(capacity.max(1)),
                factory: Box::new(factory),
                reset: Box::new(reset),
                outstanding: AtomicUsize::new(0),
                created: AtomicUsize::new(0),
                recycled: AtomicUsize::new(0),
                abandoned: AtomicUsize::new(0),
            }),
            registry: registry.clone(),
        }
    }

    /// Take a value from the free list, creating one if the list is empty.
    pub fn acquire(&self) -> CleanupResult<Pooled<T>> {
        let value = match self.inner.free.pop() {
            Some(value) => value,
            None => {
                self.inner.created.fetch_add(1, Ordering::Relaxed);
                (self.inner.factory)()
            }
        };

        let lease = Tracked::new(SlotLease);
        let pool = Arc::downgrade(&self.inner);
        let handle = self.registry.register_fn(&lease, move || {
            if let Some(pool) = pool.upgrade() {
                pool.abandoned.fetch_add(1, Ordering::Relaxed);
                pool.outstanding.fetch_sub(1, Ordering::AcqRel);
                tracing::debug!("pooled item dropped without release, slot reclaimed");
            }
        })?;
        self.inner.outstanding.fetch_add(1, Ordering::AcqRel);

        Ok(Pooled {
            value: Some(value),
            lease: Some(lease),
            handle,
            pool: Arc::downgrade(&self.inner),
        })
    }

    /// Return an item to this pool.
    ///
    /// Returns `false` if the item came from another pool; such an item is
    /// simply dropped. A value that does not fit on a full free list is dropped
    /// too, but its slot is still returned.
    pub fn release(&self, mut item: Pooled<T>) -> bool {
        if !std::ptr::eq(item.pool.as_ptr(), Arc::as_ptr(&self.inner)) {
            return false;
        }
        // The lease is still held here, so the record cannot have been queued.
        if !item.handle.clear() {
            return false;
        }
        drop(item.lease.take());

        if let Some(mut value) = item.value.take() {
            (self.inner.reset)(&mut value);
            if self.inner.free.push(value).is_ok() {
                self.inner.recycled.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.inner.outstanding.fetch_sub(1, Ordering::AcqRel);
        true
    }
}

impl<T> Recycler<T> {
    /// Items handed out and neither released nor reclaimed yet.
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    pub fn free_len(&self) -> usize {
        self.inner.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.inner.free.capacity()
    }

    pub fn stats(&self) -> RecyclerStats {
        RecyclerStats {
            capacity: self.capacity(),
            free: self.free_len(),
            outstanding: self.outstanding(),
            total_created: self.inner.created.load(Ordering::Relaxed),
            total_recycled: self.inner.recycled.load(Ordering::Relaxed),
            total_abandoned: self.inner.abandoned.load(Ordering::Relaxed),
        }
    }
}

impl<T> Clone for Recycler<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            registry: self.registry.clone(),
        }
    }
}

impl<T> fmt::Debug for Recycler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recycler")
            .field("stats", &self.stats())
            .finish()
    }
}

/// Statistics for a [`Recycler`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecyclerStats {
    pub capacity: usize,
    pub free: usize,
    pub outstanding: usize,
    /// Values built by the factory
    pub total_created: usize,
    /// Values reset and put back on the free list
    pub total_recycled: usize,
    /// Items dropped without `release` whose slot the registry reclaimed
    pub total_abandoned: usize,
}

/// A value on loan from a [`Recycler`].
pub struct Pooled<T> {
    value: Option<T>,
    lease: Option<Tracked<SlotLease>>,
    handle: CleanupHandle,
    pool: Weak<PoolInner<T>>,
}

impl<T> Pooled<T> {
    /// Registry handle tracking this item's lease.
    pub fn cleanup_handle(&self) -> &CleanupHandle {
        &self.handle
    }
}

impl<T> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value
            .as_ref()
            .unwrap_or_else(|| unreachable!("pooled value is present until release"))
    }
}

impl<T> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value
            .as_mut()
            .unwrap_or_else(|| unreachable!("pooled value is present until release"))
    }
}

impl<T: fmt::Debug> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("value", &self.value)
            .field("record", &self.handle.id())
            .finish()
    }
}
