#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Horde wave orchestrator.
//!
//! This crate defines the message surface that connects the owning session,
//! the wave orchestrator and the spawning system. Owners submit [`Command`]
//! values describing desired transitions, the orchestrator executes them and
//! broadcasts [`Event`] values describing what happened. Entity creation and
//! entity templates are supplied by collaborators through the
//! [`EntityFactory`] and [`EntityCatalog`] traits.

use std::{collections::BTreeMap, fmt, num::NonZeroU32, time::Duration};

use serde::{Deserialize, Serialize};

/// Maximum number of simultaneously live entities of one type unless configured otherwise.
pub const DEFAULT_TYPE_CAP: NonZeroU32 = match NonZeroU32::new(10) {
    Some(cap) => cap,
    None => panic!("default cap must be non-zero"),
};

/// Default suspension between two consecutive creations.
pub const DEFAULT_SPAWN_INTERVAL: Duration = Duration::from_millis(200);

/// Default suspension before the first creation of a wave.
pub const DEFAULT_START_DELAY: Duration = Duration::from_secs(1);

/// Commands that express all permissible orchestrator transitions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Starts the provided wave, preempting any wave already in progress.
    StartWave {
        /// Index of the wave to start.
        wave: WaveIndex,
    },
    /// Cancels spawning permanently and forgets every tracked entity.
    StopWave,
    /// Advances the logical clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Reports that an entity left play.
    ReportDeath {
        /// Identifier of the entity that died.
        entity: EntityId,
    },
}

/// Events broadcast by the orchestrator after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Announces that a wave began and its spawn phase is underway.
    WaveStarted {
        /// Immutable description of the wave.
        wave: WaveState,
    },
    /// Confirms that the factory materialised a new entity.
    EntitySpawned {
        /// Wave the entity belongs to.
        wave: WaveIndex,
        /// Live record registered for the entity.
        record: LiveEntityRecord,
    },
    /// Reports that the remaining creations for one type were abandoned.
    SpawnAborted {
        /// Wave whose spawn phase abandoned the type.
        wave: WaveIndex,
        /// Type whose queue was abandoned.
        type_id: EntityTypeId,
        /// Specific reason the creation failed.
        reason: SpawnAbortReason,
    },
    /// Confirms that a tracked entity was removed after reporting its death.
    EntityRemoved {
        /// Live record that was removed.
        record: LiveEntityRecord,
    },
    /// Announces that every creation of the wave has been issued.
    SpawnPhaseFinished {
        /// Wave whose spawn phase ended.
        wave: WaveIndex,
    },
    /// Announces that a wave concluded.
    WaveCompleted {
        /// Wave that concluded.
        wave: WaveIndex,
        /// How the wave concluded.
        outcome: WaveOutcome,
    },
    /// Announces that a wave was cancelled without completing.
    WaveStopped {
        /// Wave that was cancelled.
        wave: WaveIndex,
    },
    /// Announces that the owning session will not start further waves.
    RunEnded {
        /// Last wave the session started.
        wave: WaveIndex,
        /// How the run concluded.
        outcome: RunOutcome,
    },
}

/// Index of a wave within a run. The first wave of a run is wave one.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct WaveIndex(u32);

impl WaveIndex {
    /// Creates a new wave index with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Index of the wave that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for WaveIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle assigned to an entity by the factory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new entity handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of an entity type within the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityTypeId(u32);

impl EntityTypeId {
    /// Creates a new type identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type {}", self.0)
    }
}

/// World position at which an entity is materialised.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    /// Horizontal coordinate in world units.
    pub x: f32,
    /// Vertical coordinate in world units.
    pub y: f32,
}

impl SpawnPoint {
    /// Creates a new spawn point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle from which spawn positions are drawn.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnArea {
    x_min: f32,
    x_max: f32,
    y_min: f32,
    y_max: f32,
}

impl SpawnArea {
    /// Creates a rectangle from its bounds.
    ///
    /// Bounds are not validated here so that configuration loaded from disk
    /// can be reported with its position; see [`SpawnArea::is_well_formed`].
    #[must_use]
    pub const fn new(x_min: f32, x_max: f32, y_min: f32, y_max: f32) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Lower horizontal bound.
    #[must_use]
    pub const fn x_min(&self) -> f32 {
        self.x_min
    }

    /// Upper horizontal bound.
    #[must_use]
    pub const fn x_max(&self) -> f32 {
        self.x_max
    }

    /// Lower vertical bound.
    #[must_use]
    pub const fn y_min(&self) -> f32 {
        self.y_min
    }

    /// Upper vertical bound.
    #[must_use]
    pub const fn y_max(&self) -> f32 {
        self.y_max
    }

    /// Reports whether the bounds are finite and ordered and the extents fit in an `f32`.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let finite = [
            self.x_min,
            self.x_max,
            self.y_min,
            self.y_max,
            self.x_max - self.x_min,
            self.y_max - self.y_min,
        ]
        .iter()
        .all(|value| value.is_finite());
        finite && self.x_min <= self.x_max && self.y_min <= self.y_max
    }

    /// Reports whether the point lies inside the rectangle, bounds included.
    #[must_use]
    pub fn contains(&self, point: SpawnPoint) -> bool {
        (self.x_min..=self.x_max).contains(&point.x) && (self.y_min..=self.y_max).contains(&point.y)
    }
}

/// Static description of an entity type used to gate creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityTypeDescriptor {
    type_id: EntityTypeId,
    cap: NonZeroU32,
}

impl EntityTypeDescriptor {
    /// Creates a new descriptor for the type with the provided cap.
    #[must_use]
    pub const fn new(type_id: EntityTypeId, cap: NonZeroU32) -> Self {
        Self { type_id, cap }
    }

    /// Identifier of the described type.
    #[must_use]
    pub const fn type_id(&self) -> EntityTypeId {
        self.type_id
    }

    /// Maximum number of simultaneously live entities of this type.
    #[must_use]
    pub const fn cap(&self) -> u32 {
        self.cap.get()
    }
}

/// Combat-facing statistics handed to the factory when materialising an entity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityStats {
    /// Display name.
    pub name: String,
    /// Encyclopedia description.
    pub description: String,
    /// Base attack value.
    pub attack: i32,
    /// Per-level attack multiplier.
    pub attack_mul: f32,
    /// Base health.
    pub max_hp: i32,
    /// Per-level health multiplier.
    pub max_hp_mul: f32,
    /// Base attack range.
    pub attack_range: i32,
    /// Per-level attack range multiplier.
    pub attack_range_mul: f32,
    /// Attacks per second.
    pub attack_speed: f32,
    /// Movement speed in world units per second.
    pub move_speed: f32,
    /// Lower bound of the experience reward.
    pub min_exp: i32,
    /// Upper bound of the experience reward.
    pub max_exp: i32,
    /// Item identifiers that may drop on death.
    pub drop_items: Vec<i32>,
}

/// Catalog record combining a type's cap with its statistics.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityTemplate {
    /// Cap descriptor of the type.
    pub descriptor: EntityTypeDescriptor,
    /// Statistics handed to the factory.
    pub stats: EntityStats,
}

impl EntityTemplate {
    /// Creates a template from its descriptor and statistics.
    #[must_use]
    pub fn new(descriptor: EntityTypeDescriptor, stats: EntityStats) -> Self {
        Self { descriptor, stats }
    }

    /// Identifier of the type this template describes.
    #[must_use]
    pub const fn type_id(&self) -> EntityTypeId {
        self.descriptor.type_id()
    }
}

/// Immutable description of a running wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaveState {
    wave: WaveIndex,
    target: NonZeroU32,
}

impl WaveState {
    /// Creates the state for a wave with a non-empty spawn budget.
    #[must_use]
    pub const fn new(wave: WaveIndex, target: NonZeroU32) -> Self {
        Self { wave, target }
    }

    /// Index of the wave.
    #[must_use]
    pub const fn wave(&self) -> WaveIndex {
        self.wave
    }

    /// Aggregate number of creations the wave may issue across all types.
    #[must_use]
    pub const fn target(&self) -> u32 {
        self.target.get()
    }
}

/// Phase of the orchestrator state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WavePhase {
    /// No wave is running.
    #[default]
    Idle,
    /// The spawn phase is issuing creations.
    Spawning,
    /// Every creation was issued; waiting for live entities to die.
    Draining,
}

/// How a wave concluded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaveOutcome {
    /// Every creation was issued and every spawned entity died.
    Cleared,
    /// The sizing policy produced no budget, so nothing was spawned.
    Empty,
    /// Configuration prevented the wave from spawning anything.
    Misconfigured,
}

/// How a session run concluded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunOutcome {
    /// The final wave was cleared.
    Victory,
    /// The player lost and the session was told the game is over.
    Defeat,
    /// A wave could not be spawned, so the run cannot continue.
    Aborted,
}

/// Reasons a type's remaining creations were abandoned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpawnAbortReason {
    /// The factory failed to materialise the entity.
    FactoryFailed,
    /// The type already reached its cap.
    CapReached,
    /// The catalog has no template for the type.
    UnknownType,
}

/// Record of an entity tracked as live.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LiveEntityRecord {
    /// Handle returned by the factory.
    pub entity: EntityId,
    /// Type the entity was created as.
    pub type_id: EntityTypeId,
    /// Position the entity was created at.
    pub position: SpawnPoint,
}

/// Lookup service mapping type identifiers to templates.
pub trait EntityCatalog {
    /// Returns the template for the type, if the catalog knows it.
    fn describe(&self, type_id: EntityTypeId) -> Option<&EntityTemplate>;
}

impl EntityCatalog for BTreeMap<EntityTypeId, EntityTemplate> {
    fn describe(&self, type_id: EntityTypeId) -> Option<&EntityTemplate> {
        self.get(&type_id)
    }
}

impl EntityCatalog for Vec<EntityTemplate> {
    fn describe(&self, type_id: EntityTypeId) -> Option<&EntityTemplate> {
        self.iter().find(|template| template.type_id() == type_id)
    }
}

/// Capability that materialises entities in the host world.
///
/// Every successful call must return a handle that was never returned before.
pub trait EntityFactory {
    /// Creates an entity from the template at the provided position.
    fn create(
        &mut self,
        template: &EntityTemplate,
        position: SpawnPoint,
    ) -> Result<EntityId, FactoryError>;
}

/// Configuration problems that prevent a wave from spawning.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// No spawn area was configured.
    #[error("no spawn areas are configured")]
    NoSpawnAreas,
    /// No entity type was configured for spawning.
    #[error("no entity types are configured for spawning")]
    NoEntityTypes,
    /// The spawn order references a type the catalog does not know.
    #[error("{0} is not present in the entity catalog")]
    UnknownEntityType(EntityTypeId),
    /// A spawn area has non-finite or inverted bounds.
    #[error("spawn area {index} has non-finite or inverted bounds")]
    MalformedSpawnArea {
        /// Position of the offending area in the configured list.
        index: usize,
    },
}

/// Failure reported by an [`EntityFactory`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("factory could not create {type_id}: {reason}")]
pub struct FactoryError {
    /// Type the factory was asked to create.
    pub type_id: EntityTypeId,
    /// Human readable explanation.
    pub reason: String,
}

impl FactoryError {
    /// Creates a new factory failure.
    #[must_use]
    pub fn new(type_id: EntityTypeId, reason: impl Into<String>) -> Self {
        Self {
            type_id,
            reason: reason.into(),
        }
    }
}

/// Invariant violations detected by the live-entity bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// The factory handed out a handle that is already tracked.
    #[error("entity {0} is already registered")]
    DuplicateRegistration(EntityId),
    /// Registering the entity would exceed its type's cap.
    #[error("{0} is already at its cap")]
    CapExceeded(EntityTypeId),
}
