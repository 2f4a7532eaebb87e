#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Time-stepped spawning system that paces entity creation for a wave.
//!
//! A [`SpawnScheduler`] walks the configured entity types in order and, for
//! each one, issues as many creations as the type's cap and the wave budget
//! allow. Creations are separated by a fixed suspension; the scheduler does
//! not own a clock and instead consumes the logical time handed to
//! [`SpawnScheduler::advance`], so pacing is reproducible without a wall clock.

mod areas;
mod cancel;

use std::time::Duration;

use horde_core::{
    ConfigurationError, EntityCatalog, EntityFactory, EntityTypeDescriptor, Event, LifecycleError,
    SpawnAbortReason, WaveIndex, WaveState, DEFAULT_SPAWN_INTERVAL, DEFAULT_START_DELAY,
};
use horde_world::EntityLifecycleTracker;
use rand::Rng;
use tracing::{debug, info, warn};

pub use areas::SpawnAreaSet;
pub use cancel::CancellationToken;

/// Suspensions applied by the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnPacing {
    spawn_interval: Duration,
    start_delay: Duration,
}

impl SpawnPacing {
    /// Creates pacing from the delay after each creation and the delay before the first.
    #[must_use]
    pub const fn new(spawn_interval: Duration, start_delay: Duration) -> Self {
        Self {
            spawn_interval,
            start_delay,
        }
    }

    /// Suspension following every creation. Zero disables it.
    #[must_use]
    pub const fn spawn_interval(&self) -> Duration {
        self.spawn_interval
    }

    /// Suspension before the first type is processed.
    #[must_use]
    pub const fn start_delay(&self) -> Duration {
        self.start_delay
    }
}

impl Default for SpawnPacing {
    fn default() -> Self {
        Self::new(DEFAULT_SPAWN_INTERVAL, DEFAULT_START_DELAY)
    }
}

/// Why a run stopped issuing creations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FinishReason {
    /// Every type's queue was exhausted.
    Exhausted,
    /// The run observed its cancellation token.
    Cancelled,
}

/// Progress reported by [`SpawnScheduler::advance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpawnProgress {
    /// The run is suspended and needs more time.
    Pending,
    /// The run finished during this call. Reported exactly once per run.
    Finished(FinishReason),
    /// The run had already finished before this call.
    Spent,
}

/// Unrecoverable failures surfaced by a run.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SpawnError {
    /// The run cannot sample positions or resolve types.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// The live-entity bookkeeping rejected a factory result.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Collaborators a run needs while issuing creations.
pub struct SpawnContext<'a, F: ?Sized, C: ?Sized, R: ?Sized> {
    /// Live-entity bookkeeping updated on every successful creation.
    pub tracker: &'a mut EntityLifecycleTracker,
    /// Capability materialising entities.
    pub factory: &'a mut F,
    /// Template lookup.
    pub catalog: &'a C,
    /// Regions positions are drawn from.
    pub areas: &'a SpawnAreaSet,
    /// Randomness used for area and position selection.
    pub rng: &'a mut R,
}

#[derive(Clone, Copy, Debug)]
struct TypeQueue {
    descriptor: EntityTypeDescriptor,
    remaining: u32,
    aborted: bool,
}

/// Cancellable run issuing the creations of one wave.
#[derive(Debug)]
pub struct SpawnScheduler {
    wave: WaveState,
    types: Vec<EntityTypeDescriptor>,
    pacing: SpawnPacing,
    token: CancellationToken,
    cursor: usize,
    current: Option<TypeQueue>,
    budget: u32,
    pending_delay: Duration,
    spawned: u32,
    finished: bool,
}

impl SpawnScheduler {
    /// Prepares a run for the wave over `types` in the given order.
    ///
    /// Nothing is created until the run is advanced; the first advance waits
    /// out the pacing's start delay before the first type is processed.
    #[must_use]
    pub fn run(
        wave: WaveState,
        types: Vec<EntityTypeDescriptor>,
        pacing: SpawnPacing,
        token: CancellationToken,
    ) -> Self {
        Self {
            wave,
            types,
            pacing,
            token,
            cursor: 0,
            current: None,
            budget: wave.target(),
            pending_delay: pacing.start_delay(),
            spawned: 0,
            finished: false,
        }
    }

    /// Wave this run belongs to.
    #[must_use]
    pub const fn wave(&self) -> WaveState {
        self.wave
    }

    /// Token observed by this run.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Number of successful creations issued so far.
    #[must_use]
    pub const fn spawned(&self) -> u32 {
        self.spawned
    }

    /// Creations the wave budget still admits.
    #[must_use]
    pub const fn remaining_budget(&self) -> u32 {
        self.budget
    }

    /// Reports whether the run has stopped issuing creations.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Consumes `dt` of logical time, issuing every creation that falls due.
    ///
    /// Cancellation is checked before every creation and whenever a
    /// suspension elapses. Errors end the run without a finish report.
    pub fn advance<F, C, R>(
        &mut self,
        dt: Duration,
        ctx: &mut SpawnContext<'_, F, C, R>,
        out_events: &mut Vec<Event>,
    ) -> Result<SpawnProgress, SpawnError>
    where
        F: EntityFactory + ?Sized,
        C: EntityCatalog + ?Sized,
        R: Rng + ?Sized,
    {
        if self.finished {
            return Ok(SpawnProgress::Spent);
        }

        match self.step(dt, ctx, out_events) {
            Ok(progress) => Ok(progress),
            Err(error) => {
                self.finished = true;
                self.current = None;
                Err(error)
            }
        }
    }

    fn step<F, C, R>(
        &mut self,
        dt: Duration,
        ctx: &mut SpawnContext<'_, F, C, R>,
        out_events: &mut Vec<Event>,
    ) -> Result<SpawnProgress, SpawnError>
    where
        F: EntityFactory + ?Sized,
        C: EntityCatalog + ?Sized,
        R: Rng + ?Sized,
    {
        let mut elapsed = dt;

        loop {
            if self.token.is_cancelled() {
                return Ok(self.finish(FinishReason::Cancelled));
            }

            if !self.pending_delay.is_zero() {
                if elapsed < self.pending_delay {
                    self.pending_delay -= elapsed;
                    return Ok(SpawnProgress::Pending);
                }
                elapsed -= self.pending_delay;
                self.pending_delay = Duration::ZERO;
                continue;
            }

            let queue = match self.current {
                Some(queue) => queue,
                None => match self.types.get(self.cursor).copied() {
                    Some(descriptor) => self.open_queue(descriptor, ctx.tracker),
                    None => return Ok(self.finish(FinishReason::Exhausted)),
                },
            };

            if queue.aborted || queue.remaining == 0 {
                self.current = None;
                self.cursor += 1;
                continue;
            }

            let outcome = spawn_one(self.wave.wave(), queue.descriptor, ctx, out_events)?;
            let mut queue = TypeQueue {
                remaining: queue.remaining - 1,
                ..queue
            };
            match outcome {
                None => {
                    self.spawned += 1;
                    self.budget = self.budget.saturating_sub(1);
                }
                Some(reason) => {
                    queue.aborted = true;
                    out_events.push(Event::SpawnAborted {
                        wave: self.wave.wave(),
                        type_id: queue.descriptor.type_id(),
                        reason,
                    });
                }
            }
            self.current = Some(queue);
            self.pending_delay = self.pacing.spawn_interval();
        }
    }

    fn open_queue(
        &mut self,
        descriptor: EntityTypeDescriptor,
        tracker: &EntityLifecycleTracker,
    ) -> TypeQueue {
        let headroom = tracker.caps().headroom(descriptor);
        let remaining = headroom.min(self.budget);
        debug!(
            wave = self.wave.wave().get(),
            type_id = descriptor.type_id().get(),
            headroom,
            remaining,
            "opening spawn queue"
        );
        let queue = TypeQueue {
            descriptor,
            remaining,
            aborted: false,
        };
        self.current = Some(queue);
        queue
    }

    fn finish(&mut self, reason: FinishReason) -> SpawnProgress {
        self.finished = true;
        self.current = None;
        info!(
            wave = self.wave.wave().get(),
            spawned = self.spawned,
            ?reason,
            "spawn run finished"
        );
        SpawnProgress::Finished(reason)
    }
}

/// Issues a single creation. `Ok(None)` means the entity is now live.
fn spawn_one<F, C, R>(
    wave: WaveIndex,
    descriptor: EntityTypeDescriptor,
    ctx: &mut SpawnContext<'_, F, C, R>,
    out_events: &mut Vec<Event>,
) -> Result<Option<SpawnAbortReason>, SpawnError>
where
    F: EntityFactory + ?Sized,
    C: EntityCatalog + ?Sized,
    R: Rng + ?Sized,
{
    let type_id = descriptor.type_id();
    if ctx.tracker.caps().currently_alive(type_id) >= descriptor.cap() {
        debug!(wave = wave.get(), type_id = type_id.get(), "type at cap");
        return Ok(Some(SpawnAbortReason::CapReached));
    }

    let Some(template) = ctx.catalog.describe(type_id) else {
        warn!(wave = wave.get(), type_id = type_id.get(), "type missing from catalog");
        return Ok(Some(SpawnAbortReason::UnknownType));
    };

    let position = ctx.areas.sample(&mut *ctx.rng)?;

    let entity = match ctx.factory.create(template, position) {
        Ok(entity) => entity,
        Err(error) => {
            warn!(wave = wave.get(), %error, "entity factory failed");
            return Ok(Some(SpawnAbortReason::FactoryFailed));
        }
    };

    let record = ctx.tracker.register(entity, type_id, position)?;
    debug!(
        wave = wave.get(),
        entity = entity.get(),
        type_id = type_id.get(),
        x = position.x,
        y = position.y,
        "entity spawned"
    );
    out_events.push(Event::EntitySpawned { wave, record });
    Ok(None)
}
