//! Per-type live-count accounting.

use std::collections::BTreeMap;

use horde_core::{EntityTypeDescriptor, EntityTypeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TypeCount {
    alive: u32,
    cap: u32,
}

/// Tracks how many entities of each type are alive and refuses to exceed caps.
///
/// Types that were never configured are uncapped; counts for every type are
/// always non-negative.
#[derive(Clone, Debug, Default)]
pub struct TypeCapTracker {
    counts: BTreeMap<EntityTypeId, TypeCount>,
}

impl TypeCapTracker {
    /// Creates a tracker with no configured caps.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the cap for the described type, keeping its current count.
    pub fn configure(&mut self, descriptor: EntityTypeDescriptor) {
        let entry = self
            .counts
            .entry(descriptor.type_id())
            .or_insert(TypeCount { alive: 0, cap: 0 });
        entry.cap = descriptor.cap();
    }

    /// Cap installed for the type, if any.
    #[must_use]
    pub fn cap(&self, type_id: EntityTypeId) -> Option<u32> {
        self.counts
            .get(&type_id)
            .map(|count| count.cap)
            .filter(|cap| *cap > 0)
    }

    /// Records one more live entity of the type.
    ///
    /// Returns `false` without changing the count when the cap is reached.
    pub fn increment(&mut self, type_id: EntityTypeId) -> bool {
        let entry = self.counts.entry(type_id).or_insert(TypeCount {
            alive: 0,
            cap: 0,
        });
        let cap = if entry.cap == 0 { u32::MAX } else { entry.cap };
        if entry.alive >= cap {
            return false;
        }
        entry.alive += 1;
        true
    }

    /// Records one fewer live entity of the type, clamping at zero.
    pub fn decrement(&mut self, type_id: EntityTypeId) {
        if let Some(entry) = self.counts.get_mut(&type_id) {
            entry.alive = entry.alive.saturating_sub(1);
        }
    }

    /// Number of live entities of the type.
    #[must_use]
    pub fn currently_alive(&self, type_id: EntityTypeId) -> u32 {
        self.counts.get(&type_id).map_or(0, |count| count.alive)
    }

    /// Remaining creations the type admits before reaching its cap.
    #[must_use]
    pub fn headroom(&self, descriptor: EntityTypeDescriptor) -> u32 {
        descriptor
            .cap()
            .saturating_sub(self.currently_alive(descriptor.type_id()))
    }

    /// Sum of the live counts of every type.
    #[must_use]
    pub fn total_alive(&self) -> usize {
        self.counts
            .values()
            .map(|count| count.alive as usize)
            .sum()
    }

    /// Zeros every count. Installed caps are kept.
    pub fn reset(&mut self) {
        for count in self.counts.values_mut() {
            count.alive = 0;
        }
    }
}
