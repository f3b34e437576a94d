//! Reachability-triggered cleanup for values you do not own.
//!
//! Register a target and a cleanup action with a [`CleanupRegistry`]. Once the
//! target becomes unreachable the registry's reaper thread runs the action
//! exactly once, unless the registration was cleared first.
//!
//! ```
//! use lifeline::{CleanupRegistry, ReaperConfig, Tracked};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let registry = CleanupRegistry::manual(ReaperConfig::default());
//! let closed = Arc::new(AtomicUsize::new(0));
//!
//! let connection = Tracked::new("conn-1");
//! let counter = Arc::clone(&closed);
//! registry
//!     .register_fn(&connection, move || {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     })
//!     .unwrap();
//!
//! drop(connection);
//! assert_eq!(registry.run_pending(), 1);
//! assert_eq!(closed.load(Ordering::SeqCst), 1);
//! ```

pub mod config;
pub(crate) mod dispatcher;
pub mod error;
pub mod pool;
pub mod reclaim;
pub mod registry;
pub mod test_utils;

pub use config::{ReaperConfig, RestartPolicy};
pub use error::{CleanupError, CleanupResult};
pub use reclaim::{Reachable, Tracked};
pub use registry::{
    CleanupAction, CleanupHandle, CleanupRegistry, RecordId, RecordState, RegistryStats,
};
