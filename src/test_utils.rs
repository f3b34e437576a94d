//! Test utilities for lifeline tests
//!
//! Cleanup is eventual, so most assertions about it poll. These helpers keep
//! that polling consistent across unit tests, integration tests and benches.

use std::time::{Duration, Instant};

use crate::config::ReaperConfig;
use crate::error::CleanupResult;
use crate::registry::CleanupRegistry;

/// Upper bound tests wait for an eventual condition
pub const TEST_DEADLINE: Duration = Duration::from_secs(5);
/// Census interval used by test reapers, short enough to keep tests fast
pub const TEST_CENSUS_INTERVAL: Duration = Duration::from_millis(5);

/// Poll `condition` until it holds or `timeout` elapses.
///
/// # Examples
///
/// ```
/// use lifeline::test_utils::wait_until;
/// use std::time::Duration;
///
/// let mut calls = 0;
/// assert!(wait_until(Duration::from_secs(1), || {
///     calls += 1;
///     calls >= 3
/// }));
/// ```
pub fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Reaper configuration tuned for tests: fast census, normal priority.
pub fn test_config(name: &str) -> ReaperConfig {
    ReaperConfig {
        thread_name: name.to_string(),
        census_interval: TEST_CENSUS_INTERVAL,
        lower_priority: false,
        ..ReaperConfig::default()
    }
}

/// Start a registry with [`test_config`].
pub fn start_test_registry(name: &str) -> CleanupResult<CleanupRegistry> {
    CleanupRegistry::start(test_config(name))
}
