//! Error types for the lifeline cleanup registry.

use thiserror::Error;

use crate::registry::RecordId;

/// Errors that can occur while registering or running cleanup actions.
///
/// Only [`CleanupError::InvalidArgument`] is ever returned to a caller of
/// `register`/`clear`. Action failures are reported to the registry's failure
/// hook on the reaper thread, since the registering thread is long gone by then.
///
/// # Examples
///
/// ```
/// use lifeline::error::{CleanupError, CleanupResult};
///
/// let invalid = CleanupError::InvalidArgument("target already reclaimed".to_string());
/// assert_eq!(invalid.to_string(), "Invalid argument: target already reclaimed");
///
/// let failure: CleanupResult<()> = Err(CleanupError::ThreadError("spawn refused".into()));
/// assert!(failure.is_err());
/// ```
#[derive(Error, Debug)]
pub enum CleanupError {
    /// The registration target is not a live object
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// A cleanup action returned an error or panicked on the reaper thread
    #[error("Cleanup action for record {id} failed: {reason}")]
    CleanupActionFailure { id: RecordId, reason: String },
    /// A configuration value could not be parsed or is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// The reaper thread could not be spawned or joined
    #[error("Thread error: {0}")]
    ThreadError(String),
}

impl CleanupError {
    /// Whether this error originated from running a cleanup action.
    pub fn is_action_failure(&self) -> bool {
        matches!(self, CleanupError::CleanupActionFailure { .. })
    }
}

/// Result type for registry operations
pub type CleanupResult<T> = Result<T, CleanupError>;
