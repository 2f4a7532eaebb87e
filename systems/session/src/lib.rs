#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session controller chaining waves for a single run.
//!
//! The [`GameSession`] owns a [`WaveOrchestrator`] and reacts to its
//! completions: a cleared or empty wave schedules the next one, which starts on
//! the following tick. The run ends on a misconfigured wave, on game over, or
//! once the optional final wave is cleared.

use std::time::Duration;

use horde_core::{
    EntityCatalog, EntityFactory, EntityId, Event, RunOutcome, WaveIndex, WaveOutcome,
};
use horde_system_waves::{WaveError, WaveOrchestrator, WaveSizePolicy, WaveSizing};
use tracing::{info, warn};

/// Lifecycle of a session run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// [`GameSession::start`] was not called yet.
    #[default]
    NotStarted,
    /// Waves are being chained.
    Running,
    /// No further wave will start.
    Ended(RunOutcome),
}

/// Options controlling how a run is chained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Wave after whose clearance the run ends victorious.
    pub final_wave: Option<WaveIndex>,
}

/// Owner of the orchestrator for the duration of a run.
#[derive(Debug)]
pub struct GameSession<F, C, P = WaveSizing> {
    orchestrator: WaveOrchestrator<F, C, P>,
    config: SessionConfig,
    status: SessionStatus,
    current: Option<WaveIndex>,
    pending: Option<WaveIndex>,
    waves_cleared: u32,
    events: Vec<Event>,
}

impl<F, C, P> GameSession<F, C, P>
where
    F: EntityFactory,
    C: EntityCatalog,
    P: WaveSizePolicy,
{
    /// Wraps an idle orchestrator.
    #[must_use]
    pub fn new(orchestrator: WaveOrchestrator<F, C, P>, config: SessionConfig) -> Self {
        Self {
            orchestrator,
            config,
            status: SessionStatus::NotStarted,
            current: None,
            pending: None,
            waves_cleared: 0,
            events: Vec::new(),
        }
    }

    /// Starts the first wave. Later calls do nothing.
    pub fn start(&mut self) -> Result<(), WaveError> {
        self.events.clear();
        if self.status != SessionStatus::NotStarted {
            return Ok(());
        }

        info!(final_wave = ?self.config.final_wave.map(|wave| wave.get()), "session started");
        self.status = SessionStatus::Running;
        self.launch(WaveIndex::new(1))
    }

    /// Advances the run by `dt` of logical time.
    ///
    /// A wave scheduled by an earlier completion starts before time is
    /// forwarded, so at most one wave transition happens per tick.
    pub fn tick(&mut self, dt: Duration) -> Result<(), WaveError> {
        self.events.clear();
        if self.status != SessionStatus::Running {
            return Ok(());
        }

        if let Some(wave) = self.pending.take() {
            self.launch(wave)?;
            if self.status != SessionStatus::Running {
                return Ok(());
            }
        }

        let from = self.events.len();
        let result = self.orchestrator.advance(dt, &mut self.events);
        self.settle(from, result.is_err());
        result
    }

    /// Forwards a death report to the orchestrator.
    pub fn report_death(&mut self, entity: EntityId) {
        self.events.clear();
        if self.status != SessionStatus::Running {
            return;
        }
        let _ = self.orchestrator.remove(entity, &mut self.events);
        self.settle(0, false);
    }

    /// Stops the run for good. Ticks and death reports are ignored afterwards.
    pub fn game_over(&mut self) {
        self.events.clear();
        if matches!(self.status, SessionStatus::Ended(_)) {
            return;
        }
        self.pending = None;
        self.orchestrator.stop_wave(&mut self.events);
        self.end(RunOutcome::Defeat);
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Last wave the session started.
    #[must_use]
    pub const fn current_wave(&self) -> Option<WaveIndex> {
        self.current
    }

    /// Wave scheduled to start on the next tick.
    #[must_use]
    pub const fn pending_wave(&self) -> Option<WaveIndex> {
        self.pending
    }

    /// Number of waves that concluded cleared or empty.
    #[must_use]
    pub const fn waves_cleared(&self) -> u32 {
        self.waves_cleared
    }

    /// Events produced by the most recent call.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Read-only access to the owned orchestrator.
    #[must_use]
    pub fn orchestrator(&self) -> &WaveOrchestrator<F, C, P> {
        &self.orchestrator
    }

    fn launch(&mut self, wave: WaveIndex) -> Result<(), WaveError> {
        self.current = Some(wave);
        let from = self.events.len();
        let result = self.orchestrator.start_wave(wave, &mut self.events);
        self.settle(from, matches!(result, Err(WaveError::Lifecycle(_))));
        result.map(|_| ())
    }

    /// Reacts to the completions among the events appended since `from`.
    fn settle(&mut self, from: usize, failed: bool) {
        let completions: Vec<(WaveIndex, WaveOutcome)> = self.events[from..]
            .iter()
            .filter_map(|event| match event {
                Event::WaveCompleted { wave, outcome } => Some((*wave, *outcome)),
                _ => None,
            })
            .collect();

        for (wave, outcome) in completions {
            match outcome {
                WaveOutcome::Cleared | WaveOutcome::Empty => {
                    self.waves_cleared += 1;
                    if self.config.final_wave.is_some_and(|last| wave >= last) {
                        self.end(RunOutcome::Victory);
                    } else {
                        self.pending = Some(wave.next());
                    }
                }
                WaveOutcome::Misconfigured => {
                    warn!(wave = wave.get(), "wave misconfigured, ending run");
                    self.end(RunOutcome::Aborted);
                }
            }
        }

        if failed && self.status == SessionStatus::Running {
            self.end(RunOutcome::Aborted);
        }
    }

    fn end(&mut self, outcome: RunOutcome) {
        if matches!(self.status, SessionStatus::Ended(_)) {
            return;
        }
        self.status = SessionStatus::Ended(outcome);
        self.pending = None;
        let wave = self.current.unwrap_or(WaveIndex::new(0));
        info!(
            wave = wave.get(),
            ?outcome,
            waves_cleared = self.waves_cleared,
            "run ended"
        );
        self.events.push(Event::RunEnded { wave, outcome });
    }
}
