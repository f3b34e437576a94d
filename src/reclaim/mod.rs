//! Reclamation primitives
//!
//! Rust has no phantom references or runtime-maintained reference queues, so
//! this module models them explicitly:
//!
//! - **[`WeakObserver`]**: a probe that reports whether a target is gone without
//!   keeping it alive (`std::sync::Weak` implements it)
//! - **[`Reachable`]**: the contract every registrable target satisfies
//! - **[`Tracked`]**: a strong handle whose final drop fires reclaim hooks
//!   synchronously, for targets that want immediate notification
//! - **[`ReferenceQueue`]**: the blocking FIFO the reaper drains
//!
//! Targets without a drop hook (plain `Arc`/`Weak`) are discovered by the
//! registry's census instead.

pub mod observer;
pub mod queue;
pub mod tracked;

pub use observer::{Reachable, ReclaimHook, WeakObserver};
pub use queue::{ReferenceQueue, RemoveError};
pub use tracked::{ReclaimSubscription, Tracked, TrackedWeak};
