//! Reaper configuration

use std::time::Duration;

use crate::error::{CleanupError, CleanupResult};

/// Environment variable overriding [`ReaperConfig::thread_name`]
pub const ENV_THREAD_NAME: &str = "LIFELINE_THREAD_NAME";
/// Environment variable overriding [`ReaperConfig::census_interval`], in milliseconds
pub const ENV_CENSUS_INTERVAL_MS: &str = "LIFELINE_CENSUS_INTERVAL_MS";
/// Environment variable overriding [`ReaperConfig::lower_priority`]
pub const ENV_LOWER_PRIORITY: &str = "LIFELINE_LOWER_PRIORITY";
/// Environment variable overriding [`ReaperConfig::restart_policy`]
pub const ENV_RESTART_POLICY: &str = "LIFELINE_RESTART_POLICY";

/// What the reaper does when a panic escapes its per-action isolation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartPolicy {
    /// Log the escape and re-enter the dispatch loop on the same thread
    #[default]
    Restart,
    /// Treat the escape as fatal and abort the process
    Abort,
}

impl std::str::FromStr for RestartPolicy {
    type Err = CleanupError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "restart" => Ok(RestartPolicy::Restart),
            "abort" => Ok(RestartPolicy::Abort),
            other => Err(CleanupError::InvalidConfig(format!(
                "unknown restart policy '{other}', expected 'restart' or 'abort'"
            ))),
        }
    }
}

/// Configuration for the reaper thread that drives a
/// [`CleanupRegistry`](crate::CleanupRegistry).
///
/// # Examples
///
/// ```
/// use lifeline::{ReaperConfig, RestartPolicy};
/// use std::time::Duration;
///
/// let default_config = ReaperConfig::default();
/// assert_eq!(default_config.census_interval, Duration::from_millis(100));
/// assert_eq!(default_config.restart_policy, RestartPolicy::Restart);
///
/// let custom = ReaperConfig {
///     thread_name: "socket-reaper".to_string(),
///     census_interval: Duration::from_millis(10),
///     lower_priority: false,
///     restart_policy: RestartPolicy::Abort,
/// };
/// assert!(custom.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    pub thread_name: String,
    /// How long the reaper waits on an empty queue before running a census
    pub census_interval: Duration,
    /// Drop the reaper to the lowest scheduling priority where the OS allows it
    pub lower_priority: bool,
    pub restart_policy: RestartPolicy,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            thread_name: "lifeline-reaper".to_string(),
            census_interval: Duration::from_millis(100),
            lower_priority: true,
            restart_policy: RestartPolicy::Restart,
        }
    }
}

impl ReaperConfig {
    /// Build a configuration from the defaults overlaid with `LIFELINE_*`
    /// environment variables.
    pub fn from_env() -> CleanupResult<Self> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Overlay values produced by `lookup` on top of `self`.
    ///
    /// `lookup` receives one of the `ENV_*` keys and returns its raw value, if set.
    pub fn overlay<F>(mut self, lookup: F) -> CleanupResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup(ENV_THREAD_NAME) {
            self.thread_name = name;
        }
        if let Some(raw) = lookup(ENV_CENSUS_INTERVAL_MS) {
            let millis: u64 = raw.trim().parse().map_err(|_| {
                CleanupError::InvalidConfig(format!(
                    "{ENV_CENSUS_INTERVAL_MS} must be an integer, got '{raw}'"
                ))
            })?;
            self.census_interval = Duration::from_millis(millis);
        }
        if let Some(raw) = lookup(ENV_LOWER_PRIORITY) {
            self.lower_priority = parse_flag(ENV_LOWER_PRIORITY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_RESTART_POLICY) {
            self.restart_policy = raw.parse()?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject configurations the reaper cannot run with.
    pub fn validate(&self) -> CleanupResult<()> {
        if self.census_interval.is_zero() {
            return Err(CleanupError::InvalidConfig(
                "census interval must be non-zero".to_string(),
            ));
        }
        if self.thread_name.trim().is_empty() {
            return Err(CleanupError::InvalidConfig(
                "thread name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_flag(key: &str, raw: &str) -> CleanupResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CleanupError::InvalidConfig(format!(
            "{key} must be a boolean, got '{raw}'"
        ))),
    }
}
