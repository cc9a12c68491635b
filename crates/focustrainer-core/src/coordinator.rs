//! Composition root for one timer.
//!
//! The [`Coordinator`] owns the engine, the session recorder and the chime
//! player. Every user operation is forwarded to the engine and the returned
//! events are dispatched: completion and abandonment reports go to the
//! recorder, completions and skips ring the chime when sound is enabled.

use serde::Serialize;

use crate::chime::ChimePlayer;
use crate::clock::Clock;
use crate::events::Event;
use crate::session::{DistractionKind, Reflection, SessionRecorder};
use crate::storage::Config;
use crate::timer::{SnapshotStore, TimerEngine};

/// What one operation did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Outcome {
    pub events: Vec<Event>,
    /// Ids of history records created while dispatching `events`.
    pub recorded: Vec<String>,
}

impl Outcome {
    /// Append what a later operation did.
    pub fn absorb(&mut self, later: Outcome) {
        self.events.extend(later.events);
        self.recorded.extend(later.recorded);
    }
}

pub struct Coordinator<R: SessionRecorder> {
    engine: TimerEngine,
    recorder: R,
    chime: Box<dyn ChimePlayer>,
    sound_enabled: bool,
    /// Latest completed focus record still waiting for a reflection.
    pending_reflection: Option<String>,
}

impl<R: SessionRecorder> Coordinator<R> {
    pub fn new(engine: TimerEngine, recorder: R, chime: Box<dyn ChimePlayer>, sound_enabled: bool) -> Self {
        Self {
            engine,
            recorder,
            chime,
            sound_enabled,
            pending_reflection: None,
        }
    }

    /// Restore the engine from `store` and dispatch whatever recovery found.
    pub fn restore(
        config: &Config,
        store: impl SnapshotStore + 'static,
        clock: Box<dyn Clock>,
        recorder: R,
        chime: Box<dyn ChimePlayer>,
    ) -> (Self, Outcome) {
        let (engine, events) = TimerEngine::restore(config.timer.clone(), store, clock);
        let mut coordinator = Self::new(engine, recorder, chime, config.notifications.sound_enabled);
        let outcome = coordinator.dispatch(events);
        (coordinator, outcome)
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    pub fn pending_reflection(&self) -> Option<&str> {
        self.pending_reflection.as_deref()
    }

    /// Pick up edited settings. An idle timer takes the new durations at
    /// once; a phase in progress keeps its target.
    pub fn apply_config(&mut self, config: &Config) {
        self.engine.update_settings(config.timer.clone());
        self.sound_enabled = config.notifications.sound_enabled;
    }

    // ── Operations ───────────────────────────────────────────────────

    pub fn start(&mut self, intention: Option<String>) -> Outcome {
        self.chime.prepare();
        let events = self.engine.start(intention);
        self.dispatch(events)
    }

    pub fn pause(&mut self) -> Outcome {
        let events = self.engine.pause();
        self.dispatch(events)
    }

    pub fn resume(&mut self) -> Outcome {
        self.chime.prepare();
        let events = self.engine.resume();
        self.dispatch(events)
    }

    pub fn reset(&mut self) -> Outcome {
        let events = self.engine.reset();
        self.dispatch(events)
    }

    pub fn skip(&mut self) -> Outcome {
        let events = self.engine.skip();
        self.dispatch(events)
    }

    pub fn add_minute(&mut self) -> Outcome {
        let events = self.engine.add_minute();
        self.dispatch(events)
    }

    pub fn add_distraction(&mut self, kind: DistractionKind, note: impl Into<String>) -> Outcome {
        let events = self.engine.add_distraction(kind, note);
        self.dispatch(events)
    }

    pub fn set_intention(&mut self, intention: impl Into<String>) {
        self.engine.set_intention(intention);
    }

    pub fn tick(&mut self) -> Outcome {
        let events = self.engine.tick();
        self.dispatch(events)
    }

    /// Attach a reflection to the pending completed session, if any.
    pub fn reflect(&mut self, reflection: Reflection) -> bool {
        match self.pending_reflection.take() {
            Some(id) => self.recorder.attach_reflection(&id, reflection),
            None => false,
        }
    }

    /// Attach a reflection to an arbitrary record.
    pub fn reflect_on(&mut self, id: &str, reflection: Reflection) -> bool {
        let attached = self.recorder.attach_reflection(id, reflection);
        if attached && self.pending_reflection.as_deref() == Some(id) {
            self.pending_reflection = None;
        }
        attached
    }

    /// Record reports and ring the chime at most once per operation.
    fn dispatch(&mut self, events: Vec<Event>) -> Outcome {
        let mut recorded = Vec::new();
        let mut chime = false;
        for event in &events {
            if let Some(report) = event.report() {
                if let Some(id) = self.recorder.record(report) {
                    if report.completed {
                        self.pending_reflection = Some(id.clone());
                    }
                    recorded.push(id);
                }
            }
            chime |= matches!(event, Event::PhaseCompleted { .. } | Event::TimerSkipped { .. });
        }
        if chime && self.sound_enabled {
            self.chime.play();
        }
        Outcome { events, recorded }
    }
}
