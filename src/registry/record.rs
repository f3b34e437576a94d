//! Tracking records and their single-shot state machine

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::reclaim::{ReclaimSubscription, WeakObserver};

/// A cleanup action: runs at most once, on the reaper thread.
///
/// Returning `Err` (or panicking) is reported as a
/// [`CleanupActionFailure`](crate::CleanupError::CleanupActionFailure).
pub type CleanupAction = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

static NEXT_RECORD_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one registration. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(u64);

impl RecordId {
    pub(crate) fn next() -> Self {
        Self(NEXT_RECORD_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a tracking record.
///
/// `Live -> Queued -> Running -> Cleaned`, or `Live | Queued -> Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordState {
    Live = 0,
    Queued = 1,
    Running = 2,
    Cleaned = 3,
    Cancelled = 4,
}

impl RecordState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => RecordState::Live,
            1 => RecordState::Queued,
            2 => RecordState::Running,
            3 => RecordState::Cleaned,
            _ => RecordState::Cancelled,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RecordState::Cleaned | RecordState::Cancelled)
    }
}

/// Outcome of running a record's action.
#[derive(Debug)]
pub(crate) enum ActionOutcome {
    /// The action ran and returned `Ok`
    Completed,
    /// The record was registered without an action
    Empty,
    /// The action returned `Err` or panicked
    Failed(String),
}

/// Pairs a weak observer of the target with the action to run once it is gone.
pub(crate) struct TrackingRecord {
    id: RecordId,
    referent: Box<dyn WeakObserver>,
    action: Mutex<Option<CleanupAction>>,
    /// Drop hook on the target, withdrawn when the record is cancelled
    subscription: Mutex<Option<ReclaimSubscription>>,
    state: AtomicU8,
}

impl TrackingRecord {
    pub(crate) fn new(referent: Box<dyn WeakObserver>, action: Option<CleanupAction>) -> Self {
        Self {
            id: RecordId::next(),
            referent,
            action: Mutex::new(action),
            subscription: Mutex::new(None),
            state: AtomicU8::new(RecordState::Live as u8),
        }
    }

    pub(crate) fn id(&self) -> RecordId {
        self.id
    }

    pub(crate) fn state(&self) -> RecordState {
        RecordState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn is_referent_cleared(&self) -> bool {
        self.referent.is_cleared()
    }

    fn transition(&self, from: RecordState, to: RecordState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// `Live -> Queued`. Only the caller that wins this transition may enqueue.
    pub(crate) fn mark_queued(&self) -> bool {
        self.transition(RecordState::Live, RecordState::Queued)
    }

    /// `Queued -> Running`. Fails if the record was cancelled after queuing.
    pub(crate) fn begin_cleanup(&self) -> bool {
        self.transition(RecordState::Queued, RecordState::Running)
    }

    /// Remember the target's drop hook so cancellation can withdraw it.
    ///
    /// A cancellation that won before the hook was attached is honored here.
    pub(crate) fn attach(&self, subscription: ReclaimSubscription) {
        *self.subscription.lock() = Some(subscription);
        if self.state() == RecordState::Cancelled {
            self.withdraw_hook();
        }
    }

    fn withdraw_hook(&self) {
        if let Some(subscription) = self.subscription.lock().take() {
            subscription.cancel();
        }
    }

    /// `Live | Queued -> Cancelled`, dropping the action unrun and withdrawing
    /// the target's drop hook.
    pub(crate) fn cancel(&self) -> bool {
        let cancelled = self.transition(RecordState::Live, RecordState::Cancelled)
            || self.transition(RecordState::Queued, RecordState::Cancelled);
        if cancelled {
            drop(self.action.lock().take());
            self.withdraw_hook();
        }
        cancelled
    }

    /// Run the action in isolation and move to `Cleaned`.
    ///
    /// Must only be called after a successful [`begin_cleanup`](Self::begin_cleanup).
    pub(crate) fn run(&self) -> ActionOutcome {
        debug_assert_eq!(self.state(), RecordState::Running);
        let action = self.action.lock().take();

        let outcome = match action {
            None => ActionOutcome::Empty,
            Some(action) => match panic::catch_unwind(AssertUnwindSafe(action)) {
                Ok(Ok(())) => ActionOutcome::Completed,
                Ok(Err(error)) => ActionOutcome::Failed(format!("{error:#}")),
                Err(payload) => ActionOutcome::Failed(panic_message(payload.as_ref())),
            },
        };

        self.state
            .store(RecordState::Cleaned as u8, Ordering::Release);
        outcome
    }
}

impl fmt::Debug for TrackingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingRecord")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("referent_cleared", &self.is_referent_cleared())
            .finish()
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked with a non-string payload".to_string()
    }
}
