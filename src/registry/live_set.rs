//! The live set: sole strong anchor of every outstanding tracking record

use std::sync::Arc;

use dashmap::DashMap;

use super::record::{RecordId, RecordState, TrackingRecord};

/// Concurrent set of records keyed by identity.
///
/// Sharded, so unrelated registrations never contend on one lock. A record
/// that leaves this set (after cleanup, or on cancellation) is free to be
/// dropped as soon as the reference queue lets go of it.
#[derive(Debug, Default)]
pub(crate) struct LiveSet {
    records: DashMap<RecordId, Arc<TrackingRecord>>,
}

impl LiveSet {
    pub(crate) fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    pub(crate) fn insert(&self, record: Arc<TrackingRecord>) {
        let previous = self.records.insert(record.id(), record);
        debug_assert!(previous.is_none(), "record ids are never reused");
    }

    pub(crate) fn remove(&self, id: RecordId) -> Option<Arc<TrackingRecord>> {
        self.records.remove(&id).map(|(_, record)| record)
    }

    pub(crate) fn get(&self, id: RecordId) -> Option<Arc<TrackingRecord>> {
        self.records.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub(crate) fn contains(&self, id: RecordId) -> bool {
        self.records.contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    /// Records still `Live` whose target has been reclaimed.
    ///
    /// Clones the matching records out so no shard lock is held while the
    /// caller enqueues them.
    pub(crate) fn reclaimed(&self) -> Vec<Arc<TrackingRecord>> {
        self.records
            .iter()
            .filter(|entry| {
                let record = entry.value();
                record.state() == RecordState::Live && record.is_referent_cleared()
            })
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}
