//! Pool consumers of the cleanup registry
//!
//! [`Recycler`] is a bounded free list of reusable values. Every item it hands
//! out is registered with a [`CleanupRegistry`](crate::CleanupRegistry), so an
//! item that is dropped instead of released still gives its slot back.
//! [`RecyclableList`] is the canonical pooled value.

pub mod recyclable_list;
pub mod recycler;

pub use recyclable_list::{DEFAULT_INITIAL_CAPACITY, RecyclableList};
pub use recycler::{Pooled, Recycler, RecyclerStats};
