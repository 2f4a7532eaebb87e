#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative live-entity state for the Horde wave orchestrator.
//!
//! The [`EntityLifecycleTracker`] owns the set of live entities together with
//! the reverse entity-to-type mapping that death reports require, and keeps the
//! [`TypeCapTracker`] in lockstep with it so that the sum of the per-type
//! counts always equals the size of the live set.

mod caps;

use std::collections::BTreeMap;

use horde_core::{
    EntityId, EntityTypeDescriptor, EntityTypeId, LifecycleError, LiveEntityRecord, SpawnPoint,
};

pub use caps::TypeCapTracker;

/// Live-entity set paired with per-type accounting.
#[derive(Clone, Debug, Default)]
pub struct EntityLifecycleTracker {
    live: BTreeMap<EntityId, LiveEntityRecord>,
    caps: TypeCapTracker,
}

impl EntityLifecycleTracker {
    /// Creates an empty tracker with no configured caps.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the caps for the provided types.
    pub fn configure_caps<'a, I>(&mut self, descriptors: I)
    where
        I: IntoIterator<Item = &'a EntityTypeDescriptor>,
    {
        for descriptor in descriptors {
            self.caps.configure(*descriptor);
        }
    }

    /// Starts tracking a freshly created entity.
    ///
    /// Fails when the handle is already tracked or the type is at its cap; in
    /// both cases the tracker is left untouched.
    pub fn register(
        &mut self,
        entity: EntityId,
        type_id: EntityTypeId,
        position: SpawnPoint,
    ) -> Result<LiveEntityRecord, LifecycleError> {
        if self.live.contains_key(&entity) {
            return Err(LifecycleError::DuplicateRegistration(entity));
        }
        if !self.caps.increment(type_id) {
            return Err(LifecycleError::CapExceeded(type_id));
        }

        let record = LiveEntityRecord {
            entity,
            type_id,
            position,
        };
        let _ = self.live.insert(entity, record);
        Ok(record)
    }

    /// Stops tracking an entity that reported its death.
    ///
    /// Unknown handles are ignored and yield `None`.
    pub fn remove(&mut self, entity: EntityId) -> Option<LiveEntityRecord> {
        let record = self.live.remove(&entity)?;
        self.caps.decrement(record.type_id);
        Some(record)
    }

    /// Forgets every live entity and zeros every per-type count.
    pub fn reset(&mut self) {
        self.live.clear();
        self.caps.reset();
    }

    /// Number of tracked entities.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Number of tracked entities of the provided type.
    #[must_use]
    pub fn live_count_by_type(&self, type_id: EntityTypeId) -> usize {
        self.caps.currently_alive(type_id) as usize
    }

    /// Reports whether the handle is tracked.
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.live.contains_key(&entity)
    }

    /// Read-only access to the per-type accounting.
    #[must_use]
    pub fn caps(&self) -> &TypeCapTracker {
        &self.caps
    }
}

/// Query functions that provide read-only access to the tracked entities.
pub mod query {
    use super::EntityLifecycleTracker;
    use horde_core::{EntityId, EntityTypeId, LiveEntityRecord};

    /// Number of live entities.
    #[must_use]
    pub fn live_count(tracker: &EntityLifecycleTracker) -> usize {
        tracker.live_count()
    }

    /// Number of live entities of the provided type.
    #[must_use]
    pub fn live_count_by_type(tracker: &EntityLifecycleTracker, type_id: EntityTypeId) -> usize {
        tracker.live_count_by_type(type_id)
    }

    /// Looks up the record of a live entity.
    #[must_use]
    pub fn record(tracker: &EntityLifecycleTracker, entity: EntityId) -> Option<LiveEntityRecord> {
        tracker.live.get(&entity).copied()
    }

    /// Captures a read-only view of the live entities ordered by handle.
    #[must_use]
    pub fn live_view(tracker: &EntityLifecycleTracker) -> LiveView {
        LiveView {
            records: tracker.live.values().copied().collect(),
        }
    }

    /// Read-only snapshot describing every live entity.
    #[derive(Clone, Debug, Default)]
    pub struct LiveView {
        records: Vec<LiveEntityRecord>,
    }

    impl LiveView {
        /// Iterator over the captured records in handle order.
        pub fn iter(&self) -> impl Iterator<Item = &LiveEntityRecord> {
            self.records.iter()
        }

        /// Number of captured records.
        #[must_use]
        pub fn len(&self) -> usize {
            self.records.len()
        }

        /// Reports whether the snapshot is empty.
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.records.is_empty()
        }

        /// Consumes the view, yielding the underlying records.
        #[must_use]
        pub fn into_vec(self) -> Vec<LiveEntityRecord> {
            self.records
        }
    }
}
