use std::{num::NonZeroU32, time::Duration};

use horde_core::{
    EntityFactory, EntityId, EntityStats, EntityTemplate, EntityTypeDescriptor, EntityTypeId,
    Event, FactoryError, RunOutcome, SpawnArea, SpawnPoint, WaveIndex, WaveOutcome,
};
use horde_system_session::{GameSession, SessionConfig, SessionStatus};
use horde_system_spawning::{SpawnAreaSet, SpawnPacing};
use horde_system_waves::{OrchestratorConfig, WaveOrchestrator, WaveSizePolicy, WaveSizing};

#[derive(Debug, Default)]
struct CountingFactory {
    next_id: u64,
}

impl EntityFactory for CountingFactory {
    fn create(
        &mut self,
        _template: &EntityTemplate,
        _position: SpawnPoint,
    ) -> Result<EntityId, FactoryError> {
        self.next_id += 1;
        Ok(EntityId::new(self.next_id))
    }
}

#[derive(Clone, Copy, Debug)]
struct FixedTarget(i64);

impl WaveSizePolicy for FixedTarget {
    fn target(&self, _wave: WaveIndex) -> i64 {
        self.0
    }
}

type Session<P = WaveSizing> = GameSession<CountingFactory, Vec<EntityTemplate>, P>;

fn session_with<P: WaveSizePolicy>(
    areas: SpawnAreaSet,
    policy: P,
    final_wave: Option<u32>,
) -> Session<P> {
    let descriptor = EntityTypeDescriptor::new(
        EntityTypeId::new(0),
        NonZeroU32::new(2).expect("non-zero cap"),
    );
    let config = OrchestratorConfig {
        areas,
        spawn_order: vec![descriptor.type_id()],
        pacing: SpawnPacing::new(Duration::ZERO, Duration::ZERO),
        seed: 3,
    };
    let orchestrator = WaveOrchestrator::new(
        config,
        CountingFactory::default(),
        vec![EntityTemplate::new(descriptor, EntityStats::default())],
        policy,
    );
    GameSession::new(
        orchestrator,
        SessionConfig {
            final_wave: final_wave.map(WaveIndex::new),
        },
    )
}

fn session(final_wave: Option<u32>) -> Session {
    session_with(
        SpawnAreaSet::new(vec![SpawnArea::new(0.0, 4.0, 0.0, 4.0)]),
        WaveSizing::default(),
        final_wave,
    )
}

fn live_entities<P: WaveSizePolicy>(session: &Session<P>) -> Vec<EntityId> {
    horde_world::query::live_view(session.orchestrator().tracker())
        .iter()
        .map(|record| record.entity)
        .collect()
}

fn clear_current_wave<P: WaveSizePolicy>(session: &mut Session<P>) -> Vec<Event> {
    let mut events = Vec::new();
    for entity in live_entities(session) {
        session.report_death(entity);
        events.extend_from_slice(session.events());
    }
    events
}

fn completions(events: &[Event]) -> Vec<(u32, WaveOutcome)> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::WaveCompleted { wave, outcome } => Some((wave.get(), *outcome)),
            _ => None,
        })
        .collect()
}

#[test]
fn cleared_wave_starts_the_next_on_the_following_tick() {
    let mut session = session(None);
    session.start().expect("start");
    assert_eq!(session.status(), SessionStatus::Running);
    assert_eq!(live_entities(&session).len(), 2);

    let events = clear_current_wave(&mut session);
    assert_eq!(completions(&events), vec![(1, WaveOutcome::Cleared)]);
    assert_eq!(session.pending_wave(), Some(WaveIndex::new(2)));
    assert_eq!(session.current_wave(), Some(WaveIndex::new(1)));

    session.tick(Duration::from_millis(16)).expect("tick");
    assert!(session.events().iter().any(|event| matches!(
        event,
        Event::WaveStarted { wave } if wave.wave() == WaveIndex::new(2)
    )));
    assert_eq!(session.current_wave(), Some(WaveIndex::new(2)));
    assert_eq!(session.waves_cleared(), 1);
}

#[test]
fn starting_twice_is_a_no_op() {
    let mut session = session(None);
    session.start().expect("start");
    let live = live_entities(&session);

    session.start().expect("second start");

    assert!(session.events().is_empty());
    assert_eq!(live_entities(&session), live);
    assert_eq!(session.current_wave(), Some(WaveIndex::new(1)));
}

#[test]
fn game_over_stops_the_run_for_good() {
    let mut session = session(None);
    session.start().expect("start");
    let live = live_entities(&session);

    session.game_over();
    assert_eq!(
        session.events(),
        &[
            Event::WaveStopped {
                wave: WaveIndex::new(1)
            },
            Event::RunEnded {
                wave: WaveIndex::new(1),
                outcome: RunOutcome::Defeat,
            },
        ]
    );
    assert_eq!(session.status(), SessionStatus::Ended(RunOutcome::Defeat));

    for entity in live {
        session.report_death(entity);
        assert!(session.events().is_empty());
    }
    session.tick(Duration::from_secs(5)).expect("tick");
    assert!(session.events().is_empty());
    assert_eq!(session.orchestrator().live_count(), 0);
}

#[test]
fn clearing_the_final_wave_is_a_victory() {
    let mut session = session(Some(1));
    session.start().expect("start");

    let events = clear_current_wave(&mut session);

    assert!(events.contains(&Event::RunEnded {
        wave: WaveIndex::new(1),
        outcome: RunOutcome::Victory,
    }));
    assert_eq!(session.pending_wave(), None);
    session.tick(Duration::from_secs(1)).expect("tick");
    assert!(session.events().is_empty());
}

#[test]
fn misconfigured_wave_aborts_the_run() {
    let mut session = session_with(SpawnAreaSet::default(), WaveSizing::default(), None);

    assert!(session.start().is_err());

    assert_eq!(completions(session.events()), vec![(1, WaveOutcome::Misconfigured)]);
    assert_eq!(session.status(), SessionStatus::Ended(RunOutcome::Aborted));
    session.tick(Duration::from_secs(1)).expect("tick");
    assert!(session.events().is_empty());
}

#[test]
fn empty_waves_advance_one_per_tick() {
    let areas = SpawnAreaSet::new(vec![SpawnArea::new(0.0, 1.0, 0.0, 1.0)]);
    let mut session = session_with(areas, FixedTarget(0), Some(3));

    session.start().expect("start");
    assert_eq!(completions(session.events()), vec![(1, WaveOutcome::Empty)]);
    assert_eq!(session.waves_cleared(), 1);

    session.tick(Duration::ZERO).expect("tick");
    assert_eq!(completions(session.events()), vec![(2, WaveOutcome::Empty)]);
    assert_eq!(session.status(), SessionStatus::Running);
    assert_eq!(session.waves_cleared(), 2);
    assert_eq!(session.pending_wave(), Some(WaveIndex::new(3)));

    session.tick(Duration::ZERO).expect("tick");
    assert_eq!(completions(session.events()), vec![(3, WaveOutcome::Empty)]);
    assert_eq!(session.status(), SessionStatus::Ended(RunOutcome::Victory));
    assert_eq!(session.waves_cleared(), 3);
}
