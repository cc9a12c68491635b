//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads - the caller is responsible for calling `tick()`
//! periodically. Remaining time is always derived from absolute timestamps
//! (`target - (now - start)`), never from counted ticks, so sleep, throttling
//! or a restarted process lose no time.
//!
//! ## State Transitions
//!
//! ```text
//! Idle(phase) -> Running -> Paused -> Running -> Idle(next) | Running(next)
//!                   \__________ reset ___________/-> Idle(phase)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let (mut engine, recovered) = TimerEngine::restore(settings, store, Box::new(SystemClock));
//! engine.start(Some("write the report".into()));
//! // In a loop:
//! engine.tick(); // Returns Event::PhaseCompleted when the phase ends
//! ```

use serde::{Deserialize, Serialize};

use super::duration::{format_remaining, resolve_duration, MS_PER_MINUTE};
use super::phase::{Phase, TimerStatus};
use super::snapshot::{CyclePosition, SessionSnapshot, SnapshotStore};
use crate::clock::Clock;
use crate::events::Event;
use crate::session::{ms_to_datetime, Distraction, DistractionKind, SessionReport};
use crate::storage::TimerSettings;

/// Renderable timer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    pub phase: Phase,
    pub status: TimerStatus,
    pub remaining_ms: u64,
    pub target_duration_ms: u64,
    pub completed_focus_sessions: u32,
}

/// Everything a renderer needs, in one serializable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerView {
    #[serde(flatten)]
    pub state: EngineState,
    pub phase_label: String,
    pub remaining: String,
    /// 0.0 .. 1.0 progress within the current phase.
    pub progress: f64,
    pub session_id: String,
    pub intention: String,
    pub distractions: Vec<Distraction>,
    pub session_start_ms: Option<u64>,
}

/// Core timer engine.
///
/// Owns the phase/status state exclusively and mirrors it into the
/// [`SnapshotStore`] after every state-affecting operation.
pub struct TimerEngine {
    settings: TimerSettings,
    state: EngineState,
    session_id: String,
    intention: String,
    distractions: Vec<Distraction>,
    /// When the user pressed start for the current phase instance.
    session_start_ms: Option<u64>,
    /// While running: the instant from which `target_duration_ms` elapses.
    start_timestamp_ms: Option<u64>,
    /// While paused: when the pause happened.
    paused_at_ms: Option<u64>,
    paused_remaining_ms: Option<u64>,
    store: Box<dyn SnapshotStore>,
    clock: Box<dyn Clock>,
}

impl std::fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEngine")
            .field("state", &self.state)
            .field("session_id", &self.session_id)
            .field("start_timestamp_ms", &self.start_timestamp_ms)
            .field("paused_remaining_ms", &self.paused_remaining_ms)
            .finish_non_exhaustive()
    }
}

impl TimerEngine {
    /// Build an engine and reconstruct its state from the persisted snapshot.
    ///
    /// Returns the events produced by recovery: a phase that ran out while
    /// nothing was watching yields a `PhaseCompleted` with `recovered: true`
    /// (unless `recover_missed_completions` is off, in which case the stale
    /// snapshot is dropped silently).
    pub fn restore(
        settings: TimerSettings,
        store: impl SnapshotStore + 'static,
        clock: Box<dyn Clock>,
    ) -> (Self, Vec<Event>) {
        let phase = Phase::Focus;
        let target = resolve_duration(phase, &settings);
        let mut engine = Self {
            state: EngineState {
                phase,
                status: TimerStatus::Idle,
                remaining_ms: target,
                target_duration_ms: target,
                completed_focus_sessions: 0,
            },
            settings,
            session_id: new_session_id(),
            intention: String::new(),
            distractions: Vec::new(),
            session_start_ms: None,
            start_timestamp_ms: None,
            paused_at_ms: None,
            paused_remaining_ms: None,
            store: Box::new(store),
            clock,
        };
        let events = engine.recover();
        (engine, events)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn status(&self) -> TimerStatus {
        self.state.status
    }

    pub fn remaining_ms(&self) -> u64 {
        self.state.remaining_ms
    }

    pub fn intention(&self) -> &str {
        &self.intention
    }

    pub fn distractions(&self) -> &[Distraction] {
        &self.distractions
    }

    pub fn session_start_time(&self) -> Option<u64> {
        self.session_start_ms
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    /// 0.0 .. 1.0 progress within the current phase.
    pub fn progress(&self) -> f64 {
        let total = self.state.target_duration_ms;
        if total == 0 {
            return 0.0;
        }
        1.0 - (self.state.remaining_ms as f64 / total as f64)
    }

    pub fn view(&self) -> TimerView {
        TimerView {
            state: self.state,
            phase_label: self.state.phase.label().to_string(),
            remaining: format_remaining(self.state.remaining_ms),
            progress: self.progress(),
            session_id: self.session_id.clone(),
            intention: self.intention.clone(),
            distractions: self.distractions.clone(),
            session_start_ms: self.session_start_ms,
        }
    }

    /// The snapshot that mirrors the current state, `None` when idle.
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        let (start_timestamp, paused_remaining_ms) = match self.state.status {
            TimerStatus::Idle => return None,
            TimerStatus::Running => (self.start_timestamp_ms?, None),
            TimerStatus::Paused => (self.paused_at_ms?, self.paused_remaining_ms),
        };
        Some(SessionSnapshot {
            id: self.session_id.clone(),
            phase: self.state.phase,
            target_duration_ms: self.state.target_duration_ms,
            start_timestamp,
            paused_remaining_ms,
            completed_focus_sessions: self.state.completed_focus_sessions,
            intention: self.intention.clone(),
            distractions: self.distractions.clone(),
            session_start_ms: self.session_start_ms,
        })
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start the current phase from idle. No-op otherwise.
    pub fn start(&mut self, intention: Option<String>) -> Vec<Event> {
        if self.state.status != TimerStatus::Idle {
            return Vec::new();
        }
        if let Some(intention) = intention {
            self.intention = intention;
        }
        let now = self.now();
        vec![self.begin(now)]
    }

    pub fn pause(&mut self) -> Vec<Event> {
        let mut events = self.settle();
        if self.state.status != TimerStatus::Running {
            return events;
        }
        let now = self.now();
        self.paused_remaining_ms = Some(self.state.remaining_ms);
        self.paused_at_ms = Some(now);
        self.start_timestamp_ms = None;
        self.state.status = TimerStatus::Paused;
        self.persist();
        tracing::debug!(remaining_ms = self.state.remaining_ms, "timer paused");
        events.push(Event::TimerPaused {
            remaining_ms: self.state.remaining_ms,
            at: ms_to_datetime(now),
        });
        events
    }

    pub fn resume(&mut self) -> Vec<Event> {
        if self.state.status != TimerStatus::Paused {
            return Vec::new();
        }
        let now = self.now();
        let paused_remaining = self
            .paused_remaining_ms
            .take()
            .unwrap_or(self.state.remaining_ms);
        let already_elapsed = self
            .state
            .target_duration_ms
            .saturating_sub(paused_remaining);
        self.start_timestamp_ms = Some(now.saturating_sub(already_elapsed));
        self.paused_at_ms = None;
        self.state.remaining_ms = paused_remaining;
        self.state.status = TimerStatus::Running;
        self.persist();
        tracing::debug!(remaining_ms = paused_remaining, "timer resumed");
        vec![Event::TimerResumed {
            remaining_ms: paused_remaining,
            at: ms_to_datetime(now),
        }]
    }

    /// Return to idle in the same phase with a fresh duration.
    ///
    /// A started focus phase is reported as abandoned first.
    pub fn reset(&mut self) -> Vec<Event> {
        let mut events = self.settle();
        let phase = self.state.phase;
        if self.state.status == TimerStatus::Idle {
            self.intention.clear();
            self.land_idle(phase);
            return events;
        }
        let now = self.now();
        if phase == Phase::Focus && self.session_start_ms.is_some() {
            let report = self.report(now, false);
            tracing::info!(session_id = %report.session_id, "focus session abandoned");
            events.push(Event::SessionAbandoned {
                report,
                at: ms_to_datetime(now),
            });
        }
        self.intention.clear();
        self.land_idle(phase);
        events.push(Event::TimerReset {
            phase,
            at: ms_to_datetime(now),
        });
        events
    }

    /// End the current phase early and land idle in the next one.
    ///
    /// Only a running focus phase counts as completed.
    pub fn skip(&mut self) -> Vec<Event> {
        let mut events = self.settle();
        let now = self.now();
        let from = self.state.phase;
        let counted = from == Phase::Focus && self.state.status == TimerStatus::Running;
        let report = counted.then(|| self.report(now, true));
        let next = self.advance(counted);
        if let Some(report) = report {
            events.push(Event::PhaseCompleted {
                report,
                next_phase: next,
                auto_advanced: false,
                recovered: false,
                at: ms_to_datetime(now),
            });
        }
        if next.is_break() {
            self.intention.clear();
        }
        self.land_idle(next);
        tracing::debug!(%from, to = %next, counted, "phase skipped");
        events.push(Event::TimerSkipped {
            from,
            to: next,
            at: ms_to_datetime(now),
        });
        events
    }

    /// Extend the current phase instance by one minute.
    pub fn add_minute(&mut self) -> Vec<Event> {
        let mut events = self.settle();
        let now = self.now();
        self.state.target_duration_ms = self.state.target_duration_ms.saturating_add(MS_PER_MINUTE);
        self.state.remaining_ms = self.state.remaining_ms.saturating_add(MS_PER_MINUTE);
        if let Some(paused) = self.paused_remaining_ms.as_mut() {
            *paused = paused.saturating_add(MS_PER_MINUTE);
        }
        self.persist();
        events.push(Event::MinuteAdded {
            remaining_ms: self.state.remaining_ms,
            target_duration_ms: self.state.target_duration_ms,
            at: ms_to_datetime(now),
        });
        events
    }

    /// Log a distraction against the running phase. No-op otherwise.
    pub fn add_distraction(&mut self, kind: DistractionKind, note: impl Into<String>) -> Vec<Event> {
        let mut events = self.settle();
        if self.state.status != TimerStatus::Running {
            return events;
        }
        let now = self.now();
        let started = self.session_start_ms.unwrap_or(now);
        let distraction = Distraction {
            kind,
            note: note.into(),
            offset_seconds: now.saturating_sub(started) / 1000,
        };
        self.distractions.push(distraction.clone());
        self.persist();
        events.push(Event::DistractionLogged {
            distraction,
            at: ms_to_datetime(now),
        });
        events
    }

    pub fn set_intention(&mut self, intention: impl Into<String>) {
        self.intention = intention.into();
        self.persist();
    }

    /// Swap settings. An idle timer picks up the new duration immediately;
    /// a phase in progress keeps the target it was started with.
    pub fn update_settings(&mut self, settings: TimerSettings) {
        self.settings = settings;
        if self.state.status == TimerStatus::Idle {
            let target = resolve_duration(self.state.phase, &self.settings);
            self.state.target_duration_ms = target;
            self.state.remaining_ms = target;
            self.persist();
        }
    }

    /// Re-derive remaining time from the clock and process a completion if
    /// the phase has run out. Call periodically.
    pub fn tick(&mut self) -> Vec<Event> {
        if self.state.status != TimerStatus::Running {
            return Vec::new();
        }
        let now = self.now();
        self.refresh_remaining(now);
        if self.state.remaining_ms == 0 {
            self.complete_phase(now, true, false)
        } else {
            Vec::new()
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Catch up with the clock before applying a user operation, so a phase
    /// that already ran out is completed first.
    fn settle(&mut self) -> Vec<Event> {
        self.tick()
    }

    fn refresh_remaining(&mut self, now: u64) {
        if let Some(start) = self.start_timestamp_ms {
            let elapsed = now.saturating_sub(start);
            self.state.remaining_ms = self.state.target_duration_ms.saturating_sub(elapsed);
        }
    }

    /// Start counting down the current phase at `now` with the current target.
    fn begin(&mut self, now: u64) -> Event {
        self.session_id = new_session_id();
        self.distractions.clear();
        self.session_start_ms = Some(now);
        self.start_timestamp_ms = Some(now);
        self.paused_at_ms = None;
        self.paused_remaining_ms = None;
        self.state.status = TimerStatus::Running;
        self.state.remaining_ms = self.state.target_duration_ms;
        self.persist();
        tracing::debug!(
            phase = %self.state.phase,
            duration_ms = self.state.target_duration_ms,
            "phase started"
        );
        Event::TimerStarted {
            session_id: self.session_id.clone(),
            phase: self.state.phase,
            duration_ms: self.state.target_duration_ms,
            at: ms_to_datetime(now),
        }
    }

    /// Natural completion of the current phase at `ended_at`.
    fn complete_phase(&mut self, ended_at: u64, allow_auto_advance: bool, recovered: bool) -> Vec<Event> {
        let report = self.report(ended_at, true);
        let counted = self.state.phase == Phase::Focus;
        let next = self.advance(counted);
        let auto_advanced = allow_auto_advance && self.settings.auto_advance;
        tracing::info!(
            phase = %report.phase,
            next = %next,
            completed_focus_sessions = self.state.completed_focus_sessions,
            recovered,
            "phase completed"
        );

        if next.is_break() {
            self.intention.clear();
        }
        let mut events = vec![Event::PhaseCompleted {
            report,
            next_phase: next,
            auto_advanced,
            recovered,
            at: ms_to_datetime(ended_at),
        }];

        if auto_advanced {
            let now = self.now();
            self.state.phase = next;
            self.state.target_duration_ms = resolve_duration(next, &self.settings);
            events.push(self.begin(now));
        } else {
            self.land_idle(next);
        }
        events
    }

    /// The only place the focus counter changes.
    fn advance(&mut self, counted: bool) -> Phase {
        if counted {
            self.state.completed_focus_sessions += 1;
        }
        self.state.phase.successor(
            self.state.completed_focus_sessions,
            counted,
            self.settings.long_break_interval,
        )
    }

    fn land_idle(&mut self, phase: Phase) {
        self.enter_idle(phase);
        self.persist();
    }

    fn enter_idle(&mut self, phase: Phase) {
        let target = resolve_duration(phase, &self.settings);
        self.state = EngineState {
            phase,
            status: TimerStatus::Idle,
            remaining_ms: target,
            target_duration_ms: target,
            completed_focus_sessions: self.state.completed_focus_sessions,
        };
        self.session_id = new_session_id();
        self.distractions.clear();
        self.session_start_ms = None;
        self.start_timestamp_ms = None;
        self.paused_at_ms = None;
        self.paused_remaining_ms = None;
    }

    fn report(&self, ended_at: u64, completed: bool) -> SessionReport {
        SessionReport {
            session_id: self.session_id.clone(),
            phase: self.state.phase,
            intention: self.intention.clone(),
            distractions: self.distractions.clone(),
            started_at_ms: self
                .session_start_ms
                .or(self.start_timestamp_ms)
                .unwrap_or(ended_at),
            ended_at_ms: ended_at,
            completed_focus_sessions: self.state.completed_focus_sessions,
            phase_durations: self.settings.phase_durations(),
            completed,
        }
    }

    /// Mirror the in-memory state into the store.
    fn persist(&mut self) {
        match self.snapshot() {
            Some(snapshot) => self.store.put(Some(&snapshot)),
            None => {
                let configured = resolve_duration(self.state.phase, &self.settings);
                self.store.put(None);
                self.store.put_cycle(&CyclePosition {
                    phase: self.state.phase,
                    completed_focus_sessions: self.state.completed_focus_sessions,
                    added_ms: self.state.target_duration_ms.saturating_sub(configured),
                    intention: self.intention.clone(),
                });
            }
        }
    }

    fn recover(&mut self) -> Vec<Event> {
        let Some(snapshot) = self.store.get() else {
            if let Some(position) = self.store.get_cycle() {
                self.state.completed_focus_sessions = position.completed_focus_sessions;
                self.intention = position.intention;
                self.enter_idle(position.phase);
                self.state.target_duration_ms =
                    self.state.target_duration_ms.saturating_add(position.added_ms);
                self.state.remaining_ms = self.state.target_duration_ms;
            }
            return Vec::new();
        };

        let now = self.now();
        let target = snapshot.target_duration_ms;
        self.session_id = snapshot.id;
        self.intention = snapshot.intention;
        self.distractions = snapshot.distractions;
        self.state = EngineState {
            phase: snapshot.phase,
            status: TimerStatus::Idle,
            remaining_ms: target,
            target_duration_ms: target,
            completed_focus_sessions: snapshot.completed_focus_sessions,
        };

        if let Some(paused) = snapshot.paused_remaining_ms {
            let paused = paused.min(target);
            let effective_start = snapshot
                .start_timestamp
                .saturating_sub(target - paused);
            self.session_start_ms = Some(snapshot.session_start_ms.unwrap_or(effective_start));
            self.paused_at_ms = Some(snapshot.start_timestamp);
            self.paused_remaining_ms = Some(paused);
            self.state.status = TimerStatus::Paused;
            self.state.remaining_ms = paused;
            tracing::info!(phase = %self.state.phase, remaining_ms = paused, "restored paused session");
            return Vec::new();
        }

        self.session_start_ms = Some(snapshot.session_start_ms.unwrap_or(snapshot.start_timestamp));
        let elapsed = now.saturating_sub(snapshot.start_timestamp);
        if elapsed < target {
            self.start_timestamp_ms = Some(snapshot.start_timestamp);
            self.state.status = TimerStatus::Running;
            self.state.remaining_ms = target - elapsed;
            tracing::info!(
                phase = %self.state.phase,
                remaining_ms = self.state.remaining_ms,
                "restored running session"
            );
            return Vec::new();
        }

        if self.settings.recover_missed_completions {
            self.start_timestamp_ms = Some(snapshot.start_timestamp);
            self.state.status = TimerStatus::Running;
            self.state.remaining_ms = 0;
            let ended_at = snapshot.start_timestamp.saturating_add(target);
            self.complete_phase(ended_at, false, true)
        } else {
            tracing::info!(phase = %self.state.phase, "discarding session that ended while away");
            self.land_idle(self.state.phase);
            Vec::new()
        }
    }
}

fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
