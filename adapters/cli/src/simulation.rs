//! Toy attrition model driving a session with a fixed logical tick.
//!
//! The player deals a fixed amount of damage per second to the oldest live
//! entity while every live entity deals its attack to the player. When the
//! player's health runs out the session is told the game is over.

use std::{collections::BTreeMap, time::Duration};

use anyhow::Result;
use horde_core::{
    EntityCatalog, EntityFactory, EntityId, EntityTemplate, EntityTypeId, Event, FactoryError,
    RunOutcome, SpawnPoint, WaveIndex, WaveOutcome,
};
use horde_system_session::{GameSession, SessionConfig, SessionStatus};
use horde_system_waves::{WaveOrchestrator, WaveSizing};
use horde_world::query;
use tracing::{debug, info, trace};

use crate::scenario::{Catalog, Scenario};

/// Session type driven by the simulator.
type HordeSession = GameSession<SimulatedFactory, Catalog, WaveSizing>;

/// Factory handing out sequential handles.
#[derive(Debug, Default)]
pub(crate) struct SimulatedFactory {
    next_id: u64,
}

impl EntityFactory for SimulatedFactory {
    fn create(
        &mut self,
        template: &EntityTemplate,
        position: SpawnPoint,
    ) -> Result<EntityId, FactoryError> {
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| FactoryError::new(template.type_id(), "entity handles exhausted"))?;
        trace!(
            entity = self.next_id,
            name = %template.stats.name,
            x = position.x,
            y = position.y,
            "materialised entity"
        );
        Ok(EntityId::new(self.next_id))
    }
}

/// Knobs of a simulation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SimulationOptions {
    pub(crate) seed: u64,
    pub(crate) final_wave: Option<WaveIndex>,
    pub(crate) tick: Duration,
    pub(crate) max_ticks: u64,
}

/// What happened to a single wave.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct WaveSummary {
    pub(crate) wave: WaveIndex,
    pub(crate) target: u32,
    pub(crate) spawned: u32,
    pub(crate) defeated: u32,
    pub(crate) aborted_types: u32,
    pub(crate) started_at: Duration,
    pub(crate) ended_at: Option<Duration>,
    pub(crate) outcome: Option<WaveOutcome>,
}

impl WaveSummary {
    fn new(wave: WaveIndex, target: u32, started_at: Duration) -> Self {
        Self {
            wave,
            target,
            spawned: 0,
            defeated: 0,
            aborted_types: 0,
            started_at,
            ended_at: None,
            outcome: None,
        }
    }
}

/// Result of a simulation run.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SimulationReport {
    pub(crate) waves: Vec<WaveSummary>,
    pub(crate) outcome: Option<RunOutcome>,
    pub(crate) elapsed: Duration,
    pub(crate) ticks: u64,
    pub(crate) player_hp: f32,
}

/// Attrition model wrapped around a session.
pub(crate) struct Simulation {
    session: HordeSession,
    player_hp: f32,
    player_dps: f32,
    health: BTreeMap<EntityId, f32>,
    now: Duration,
    waves: Vec<WaveSummary>,
}

impl Simulation {
    /// Builds a simulation for the scenario.
    pub(crate) fn new(scenario: &Scenario, options: SimulationOptions) -> Self {
        let orchestrator = WaveOrchestrator::new(
            scenario.orchestrator_config(options.seed),
            SimulatedFactory::default(),
            scenario.catalog(),
            scenario.sizing,
        );
        let session = GameSession::new(
            orchestrator,
            SessionConfig {
                final_wave: options.final_wave,
            },
        );
        Self {
            session,
            player_hp: scenario.player.max_hp,
            player_dps: scenario.player.damage_per_second,
            health: BTreeMap::new(),
            now: Duration::ZERO,
            waves: Vec::new(),
        }
    }

    /// Runs until the session ends or the tick budget is spent.
    pub(crate) fn run(mut self, tick: Duration, max_ticks: u64) -> Result<SimulationReport> {
        self.session.start()?;
        self.absorb();

        let mut ticks = 0;
        while ticks < max_ticks && self.session.status() == SessionStatus::Running {
            ticks += 1;
            self.now += tick;
            self.session.tick(tick)?;
            self.absorb();

            let seconds = tick.as_secs_f32();
            self.player_attacks(seconds);
            self.entities_attack(seconds);
        }

        let outcome = match self.session.status() {
            SessionStatus::Ended(outcome) => Some(outcome),
            SessionStatus::NotStarted | SessionStatus::Running => None,
        };
        info!(ticks, ?outcome, player_hp = self.player_hp, "simulation finished");
        Ok(SimulationReport {
            waves: self.waves,
            outcome,
            elapsed: self.now,
            ticks,
            player_hp: self.player_hp.max(0.0),
        })
    }

    fn player_attacks(&mut self, seconds: f32) {
        let mut damage = self.player_dps * seconds;
        while damage > 0.0 {
            let Some(target) = self.oldest_live() else {
                return;
            };
            let hp = self.health.entry(target).or_insert(1.0);
            let dealt = damage.min(*hp);
            *hp -= dealt;
            damage -= dealt;
            if *hp > 0.0 {
                return;
            }

            debug!(entity = target.get(), "entity defeated");
            let _ = self.health.remove(&target);
            self.session.report_death(target);
            self.absorb();
        }
    }

    fn entities_attack(&mut self, seconds: f32) {
        let orchestrator = self.session.orchestrator();
        let incoming: f32 = query::live_view(orchestrator.tracker())
            .iter()
            .map(|record| damage_per_second(orchestrator.catalog(), record.type_id))
            .sum::<f32>()
            * seconds;
        if incoming <= 0.0 || self.session.status() != SessionStatus::Running {
            return;
        }

        self.player_hp -= incoming;
        if self.player_hp <= 0.0 {
            info!(at = ?self.now, "player defeated");
            self.session.game_over();
            self.absorb();
        }
    }

    fn oldest_live(&self) -> Option<EntityId> {
        query::live_view(self.session.orchestrator().tracker())
            .iter()
            .next()
            .map(|record| record.entity)
    }

    /// Folds the events of the last session call into the health table and summaries.
    fn absorb(&mut self) {
        let catalog = self.session.orchestrator().catalog();
        for event in self.session.events() {
            match event {
                Event::WaveStarted { wave } => {
                    self.waves
                        .push(WaveSummary::new(wave.wave(), wave.target(), self.now));
                }
                Event::EntitySpawned { wave, record } => {
                    let hp = catalog
                        .describe(record.type_id)
                        .map_or(1, |template| template.stats.max_hp.max(1));
                    let _ = self.health.insert(record.entity, hp as f32);
                    if let Some(summary) = summary_for(&mut self.waves, *wave) {
                        summary.spawned += 1;
                    }
                }
                Event::SpawnAborted { wave, .. } => {
                    if let Some(summary) = summary_for(&mut self.waves, *wave) {
                        summary.aborted_types += 1;
                    }
                }
                Event::EntityRemoved { .. } => {
                    if let Some(summary) = self.waves.last_mut() {
                        summary.defeated += 1;
                    }
                }
                Event::WaveCompleted { wave, outcome } => {
                    if summary_for(&mut self.waves, *wave).is_none() {
                        self.waves.push(WaveSummary::new(*wave, 0, self.now));
                    }
                    if let Some(summary) = summary_for(&mut self.waves, *wave) {
                        summary.outcome = Some(*outcome);
                        summary.ended_at = Some(self.now);
                    }
                }
                Event::WaveStopped { wave } => {
                    self.health.clear();
                    if let Some(summary) = summary_for(&mut self.waves, *wave) {
                        summary.ended_at = Some(self.now);
                    }
                }
                Event::SpawnPhaseFinished { .. } | Event::RunEnded { .. } => {}
            }
        }
    }
}

fn summary_for(waves: &mut [WaveSummary], wave: WaveIndex) -> Option<&mut WaveSummary> {
    waves.iter_mut().rev().find(|summary| summary.wave == wave)
}

fn damage_per_second(catalog: &Catalog, type_id: EntityTypeId) -> f32 {
    catalog.describe(type_id).map_or(0.0, |template| {
        let attack = template.stats.attack.max(0) as f32;
        if template.stats.attack_speed > 0.0 {
            attack * template.stats.attack_speed
        } else {
            attack
        }
    })
}

/// Runs a full simulation of the scenario.
pub(crate) fn simulate(scenario: &Scenario, options: SimulationOptions) -> Result<SimulationReport> {
    Simulation::new(scenario, options).run(options.tick, options.max_ticks)
}
