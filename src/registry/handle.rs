//! Caller-held handles for cancelling a registration

use std::fmt;
use std::sync::Weak;

use super::Shared;
use super::record::RecordId;

/// Returned by [`CleanupRegistry::register`](crate::CleanupRegistry::register).
///
/// Dropping a handle does not cancel anything; only [`clear`](Self::clear) does.
/// The handle does not keep the record or the registry alive.
#[derive(Clone)]
pub struct CleanupHandle {
    id: RecordId,
    shared: Weak<Shared>,
}

impl CleanupHandle {
    pub(super) fn new(id: RecordId, shared: Weak<Shared>) -> Self {
        Self { id, shared }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Cancel the registration without running its action.
    ///
    /// Returns `true` only for the call that actually cancelled the record.
    /// Clearing a handle whose action already ran, or that was already cleared,
    /// is a no-op that returns `false`.
    pub fn clear(&self) -> bool {
        self.shared
            .upgrade()
            .is_some_and(|shared| shared.clear(self.id))
    }

    /// Whether the record is still in the registry's live set.
    pub fn is_live(&self) -> bool {
        self.shared
            .upgrade()
            .is_some_and(|shared| shared.live.contains(self.id))
    }

    pub(super) fn belongs_to(&self, shared: &std::sync::Arc<Shared>) -> bool {
        std::ptr::eq(self.shared.as_ptr(), std::sync::Arc::as_ptr(shared))
    }
}

impl fmt::Debug for CleanupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanupHandle")
            .field("id", &self.id)
            .field("live", &self.is_live())
            .finish()
    }
}
