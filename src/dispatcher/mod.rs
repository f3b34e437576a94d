//! The reaper: a dedicated thread that runs cleanup actions
//!
//! One reaper serves one registry. It blocks on the reference queue, runs each
//! reclaimed record's action in isolation, and removes the record from the
//! live set. While idle it runs a census every `census_interval` to discover
//! targets that have no drop hook.
//!
//! The dispatch loop runs under a supervisor: a panic that escapes the
//! per-action boundary is logged and, depending on [`RestartPolicy`], either
//! re-enters the loop or aborts the process. The reaper never exits silently.

pub(crate) mod hook;
pub(crate) mod priority;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::RestartPolicy;
use crate::error::{CleanupError, CleanupResult};
use crate::reclaim::RemoveError;
use crate::registry::Shared;
use crate::registry::record::panic_message;
use crate::registry::stats::Counters;

pub(crate) use hook::FailureHook;

/// Spawn the reaper thread for `shared`.
pub(crate) fn spawn(shared: Arc<Shared>) -> CleanupResult<JoinHandle<()>> {
    thread::Builder::new()
        .name(shared.config.thread_name.clone())
        .spawn(move || supervise(&shared))
        .map_err(|e| CleanupError::ThreadError(format!("failed to spawn reaper thread: {e}")))
}

/// Lowers the liveness flag however the reaper leaves `supervise`.
struct AliveGuard<'a>(&'a AtomicBool);

impl Drop for AliveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn supervise(shared: &Shared) {
    let _alive = AliveGuard(&shared.reaper_alive);
    let config = &shared.config;
    if config.lower_priority {
        match priority::lower_current_thread() {
            Ok(()) => tracing::debug!(nice = priority::REAPER_NICE, "reaper priority lowered"),
            Err(e) => tracing::debug!(error = %e, "could not lower reaper priority"),
        }
    }
    tracing::debug!(
        thread = %config.thread_name,
        census_interval_ms = config.census_interval.as_millis() as u64,
        "reaper started"
    );

    loop {
        match panic::catch_unwind(AssertUnwindSafe(|| serve(shared, config.census_interval))) {
            Ok(()) => break,
            Err(payload) => {
                Counters::bump(&shared.counters.restarts);
                let reason = panic_message(payload.as_ref());
                tracing::error!(
                    reason = %reason,
                    restarts = Counters::read(&shared.counters.restarts),
                    "panic escaped the reaper loop"
                );
                if config.restart_policy == RestartPolicy::Abort {
                    tracing::error!("reaper restart policy is abort, terminating process");
                    std::process::abort();
                }
            }
        }
    }

    tracing::debug!(thread = %config.thread_name, "reaper stopped");
}

/// Dispatch loop. Returns only on shutdown or when the queue disconnects.
fn serve(shared: &Shared, census_interval: Duration) {
    loop {
        if shared.is_shutting_down() {
            let drained = shared.drain();
            tracing::debug!(drained, "reaper drained queue before stopping");
            return;
        }

        match shared.queue.remove_timeout(census_interval) {
            Ok(record) => {
                shared.dispatch(record);
            }
            // Idle: look for targets without a drop hook, then wait again.
            Err(RemoveError::Timeout) => {
                shared.census();
            }
            Err(RemoveError::Disconnected) => return,
        }
    }
}
