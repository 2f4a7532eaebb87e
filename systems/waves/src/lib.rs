#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave orchestration: sizing, spawn-run lifecycle and completion detection.
//!
//! The [`WaveOrchestrator`] is the only owner of the live-entity bookkeeping.
//! It starts one [`SpawnScheduler`] per wave, forwards logical time to it, and
//! applies death reports. A wave completes once its spawn phase finished and
//! the last live entity was removed; the owner learns about it through
//! [`Event::WaveCompleted`], emitted at most once per wave.

mod sizing;

use std::{num::NonZeroU32, time::Duration};

use horde_core::{
    Command, ConfigurationError, EntityCatalog, EntityFactory, EntityId, EntityTypeDescriptor,
    EntityTypeId, Event, LifecycleError, LiveEntityRecord, WaveIndex, WaveOutcome, WavePhase,
    WaveState,
};
use horde_system_spawning::{
    CancellationToken, SpawnAreaSet, SpawnContext, SpawnError, SpawnPacing, SpawnProgress,
    SpawnScheduler,
};
use horde_world::EntityLifecycleTracker;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info, warn};

pub use sizing::{WaveSizePolicy, WaveSizing};

/// Errors surfaced to the owner of an orchestrator.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WaveError {
    /// The wave could not start because of its configuration.
    #[error("wave cannot start: {0}")]
    Configuration(#[from] ConfigurationError),
    /// The live-entity bookkeeping detected a broken invariant.
    #[error("live-entity bookkeeping failed: {0}")]
    Lifecycle(#[from] LifecycleError),
}

impl From<SpawnError> for WaveError {
    fn from(error: SpawnError) -> Self {
        match error {
            SpawnError::Configuration(error) => Self::Configuration(error),
            SpawnError::Lifecycle(error) => Self::Lifecycle(error),
        }
    }
}

/// Static configuration consumed by [`WaveOrchestrator::new`].
#[derive(Clone, Debug, Default)]
pub struct OrchestratorConfig {
    /// Regions spawn positions are drawn from.
    pub areas: SpawnAreaSet,
    /// Entity types processed by every wave, in priority order.
    pub spawn_order: Vec<EntityTypeId>,
    /// Suspensions applied by the spawn runs.
    pub pacing: SpawnPacing,
    /// Seed of the position sampler.
    pub seed: u64,
}

/// Owner of a wave's spawn run and of the live-entity bookkeeping.
#[derive(Debug)]
pub struct WaveOrchestrator<F, C, P = WaveSizing> {
    factory: F,
    catalog: C,
    policy: P,
    rng: ChaCha8Rng,
    areas: SpawnAreaSet,
    spawn_order: Vec<EntityTypeId>,
    pacing: SpawnPacing,
    tracker: EntityLifecycleTracker,
    run: Option<SpawnScheduler>,
    wave: Option<WaveState>,
    phase: WavePhase,
    completion_reported: bool,
}

impl<F, C, P> WaveOrchestrator<F, C, P>
where
    F: EntityFactory,
    C: EntityCatalog,
    P: WaveSizePolicy,
{
    /// Creates an idle orchestrator from its configuration and collaborators.
    #[must_use]
    pub fn new(config: OrchestratorConfig, factory: F, catalog: C, policy: P) -> Self {
        Self {
            factory,
            catalog,
            policy,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            areas: config.areas,
            spawn_order: config.spawn_order,
            pacing: config.pacing,
            tracker: EntityLifecycleTracker::new(),
            run: None,
            wave: None,
            phase: WavePhase::Idle,
            completion_reported: true,
        }
    }

    /// Applies a command, broadcasting the resulting events.
    pub fn apply(&mut self, command: Command, out_events: &mut Vec<Event>) -> Result<(), WaveError> {
        match command {
            Command::StartWave { wave } => self.start_wave(wave, out_events).map(|_| ()),
            Command::StopWave => {
                self.stop_wave(out_events);
                Ok(())
            }
            Command::Tick { dt } => self.advance(dt, out_events),
            Command::ReportDeath { entity } => {
                let _ = self.remove(entity, out_events);
                Ok(())
            }
        }
    }

    /// Starts the wave, cancelling any wave in progress first.
    ///
    /// Returns `Ok(None)` for an empty wave, which completes immediately. A
    /// configuration error also completes the wave immediately, with
    /// [`WaveOutcome::Misconfigured`], before being returned.
    pub fn start_wave(
        &mut self,
        wave: WaveIndex,
        out_events: &mut Vec<Event>,
    ) -> Result<Option<WaveState>, WaveError> {
        self.cancel_run(out_events);

        let types = match self.resolve_spawn_types() {
            Ok(types) => types,
            Err(error) => {
                warn!(wave = wave.get(), %error, "wave misconfigured");
                self.tracker.reset();
                out_events.push(Event::WaveCompleted {
                    wave,
                    outcome: WaveOutcome::Misconfigured,
                });
                return Err(error.into());
            }
        };

        let target = self.policy.target(wave);
        let Some(target) = clamp_target(target) else {
            info!(wave = wave.get(), target, "empty wave");
            self.tracker.reset();
            out_events.push(Event::WaveCompleted {
                wave,
                outcome: WaveOutcome::Empty,
            });
            return Ok(None);
        };

        self.tracker.reset();
        self.tracker.configure_caps(&types);

        let state = WaveState::new(wave, target);
        self.run = Some(SpawnScheduler::run(
            state,
            types,
            self.pacing,
            CancellationToken::new(),
        ));
        self.wave = Some(state);
        self.phase = WavePhase::Spawning;
        self.completion_reported = false;

        info!(wave = wave.get(), target = state.target(), "wave started");
        out_events.push(Event::WaveStarted { wave: state });

        self.advance(Duration::ZERO, out_events)?;
        Ok(Some(state))
    }

    /// Cancels spawning and forgets every tracked entity without completing the wave.
    ///
    /// An unfinished spawn phase is reported as finished before the wave is stopped.
    pub fn stop_wave(&mut self, out_events: &mut Vec<Event>) {
        self.cancel_run(out_events);
        self.tracker.reset();
    }

    /// Forwards logical time to the running spawn phase, if any.
    pub fn advance(&mut self, dt: Duration, out_events: &mut Vec<Event>) -> Result<(), WaveError> {
        let Some(run) = self.run.as_mut() else {
            return Ok(());
        };

        let mut ctx = SpawnContext {
            tracker: &mut self.tracker,
            factory: &mut self.factory,
            catalog: &self.catalog,
            areas: &self.areas,
            rng: &mut self.rng,
        };

        match run.advance(dt, &mut ctx, out_events) {
            Ok(SpawnProgress::Pending | SpawnProgress::Spent) => Ok(()),
            Ok(SpawnProgress::Finished(reason)) => {
                let wave = run.wave().wave();
                debug!(wave = wave.get(), ?reason, "spawn phase finished");
                self.run = None;
                self.phase = WavePhase::Draining;
                out_events.push(Event::SpawnPhaseFinished { wave });
                self.check_completion(out_events);
                Ok(())
            }
            Err(spawn_error) => {
                error!(%spawn_error, "spawn run failed, abandoning wave");
                self.stop_wave(out_events);
                Err(spawn_error.into())
            }
        }
    }

    /// Applies a death report. Unknown or already removed handles are ignored.
    pub fn remove(
        &mut self,
        entity: EntityId,
        out_events: &mut Vec<Event>,
    ) -> Option<LiveEntityRecord> {
        let record = self.tracker.remove(entity)?;
        debug!(
            entity = entity.get(),
            type_id = record.type_id.get(),
            live = self.tracker.live_count(),
            "entity removed"
        );
        out_events.push(Event::EntityRemoved { record });
        self.check_completion(out_events);
        Some(record)
    }

    /// Budget the sizing policy assigns to the wave, before caps apply.
    #[must_use]
    pub fn target_for(&self, wave: WaveIndex) -> i64 {
        self.policy.target(wave)
    }

    /// Current phase of the state machine.
    #[must_use]
    pub const fn phase(&self) -> WavePhase {
        self.phase
    }

    /// State of the running or draining wave.
    #[must_use]
    pub const fn current_wave(&self) -> Option<WaveState> {
        self.wave
    }

    /// Number of live entities.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.tracker.live_count()
    }

    /// Number of live entities of the provided type.
    #[must_use]
    pub fn live_count_by_type(&self, type_id: EntityTypeId) -> usize {
        self.tracker.live_count_by_type(type_id)
    }

    /// Live count of the type as seen by its cap accounting.
    #[must_use]
    pub fn currently_alive(&self, type_id: EntityTypeId) -> u32 {
        self.tracker.caps().currently_alive(type_id)
    }

    /// Read-only access to the live-entity bookkeeping.
    #[must_use]
    pub fn tracker(&self) -> &EntityLifecycleTracker {
        &self.tracker
    }

    /// Read-only access to the entity factory.
    #[must_use]
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Mutable access to the entity factory.
    pub fn factory_mut(&mut self) -> &mut F {
        &mut self.factory
    }

    /// Read-only access to the catalog.
    #[must_use]
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    fn resolve_spawn_types(&self) -> Result<Vec<EntityTypeDescriptor>, ConfigurationError> {
        self.areas.validate()?;
        if self.spawn_order.is_empty() {
            return Err(ConfigurationError::NoEntityTypes);
        }
        self.spawn_order
            .iter()
            .map(|type_id| {
                self.catalog
                    .describe(*type_id)
                    .map(|template| template.descriptor)
                    .ok_or(ConfigurationError::UnknownEntityType(*type_id))
            })
            .collect()
    }

    fn cancel_run(&mut self, out_events: &mut Vec<Event>) {
        if let Some(run) = self.run.take() {
            run.token().cancel();
            let wave = run.wave().wave();
            debug!(wave = wave.get(), spawned = run.spawned(), "spawn run cancelled");
            if !run.is_finished() {
                out_events.push(Event::SpawnPhaseFinished { wave });
            }
        }
        if let Some(state) = self.wave.take() {
            if self.phase != WavePhase::Idle {
                info!(wave = state.wave().get(), "wave stopped");
                out_events.push(Event::WaveStopped { wave: state.wave() });
            }
        }
        self.phase = WavePhase::Idle;
        self.completion_reported = true;
    }

    fn check_completion(&mut self, out_events: &mut Vec<Event>) {
        if self.completion_reported
            || self.phase != WavePhase::Draining
            || self.tracker.live_count() != 0
        {
            return;
        }
        let Some(state) = self.wave.take() else {
            return;
        };

        self.completion_reported = true;
        self.phase = WavePhase::Idle;
        info!(wave = state.wave().get(), "wave cleared");
        out_events.push(Event::WaveCompleted {
            wave: state.wave(),
            outcome: WaveOutcome::Cleared,
        });
    }
}

fn clamp_target(target: i64) -> Option<NonZeroU32> {
    if target <= 0 {
        return None;
    }
    NonZeroU32::new(u32::try_from(target).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_targets_are_empty() {
        assert_eq!(clamp_target(0), None);
        assert_eq!(clamp_target(-4), None);
    }

    #[test]
    fn oversized_targets_saturate() {
        assert_eq!(clamp_target(i64::MAX).map(NonZeroU32::get), Some(u32::MAX));
        assert_eq!(clamp_target(7).map(NonZeroU32::get), Some(7));
    }
}
