//! Integration tests for rebuilding the timer from a persisted snapshot.

use focustrainer_core::timer::{CyclePosition, SessionSnapshot, SnapshotStore};
use focustrainer_core::{
    Event, ManualClock, MemorySnapshotStore, Phase, TimerEngine, TimerSettings, TimerStatus,
};

const NOW: u64 = 1_700_000_000_000;
const FOCUS_MS: u64 = 1_500_000;

fn snapshot(start_timestamp: u64, paused_remaining_ms: Option<u64>, completed: u32) -> SessionSnapshot {
    SessionSnapshot {
        id: "snap-1".into(),
        phase: Phase::Focus,
        target_duration_ms: FOCUS_MS,
        start_timestamp,
        paused_remaining_ms,
        completed_focus_sessions: completed,
        intention: "refactor parser".into(),
        distractions: Vec::new(),
        session_start_ms: None,
    }
}

fn restore(settings: TimerSettings, store: &MemorySnapshotStore) -> (TimerEngine, Vec<Event>) {
    TimerEngine::restore(settings, store.clone(), Box::new(ManualClock::new(NOW)))
}

#[test]
fn test_paused_snapshot_restores_paused() {
    let store = MemorySnapshotStore::with_snapshot(snapshot(NOW - 3_600_000, Some(900_000), 1));
    let (engine, events) = restore(TimerSettings::default(), &store);

    assert!(events.is_empty());
    assert_eq!(engine.status(), TimerStatus::Paused);
    assert_eq!(engine.remaining_ms(), 900_000);
    assert_eq!(engine.state().completed_focus_sessions, 1);
    assert_eq!(engine.intention(), "refactor parser");
    assert_eq!(engine.session_id(), "snap-1");
}

#[test]
fn test_running_snapshot_resumes_from_wall_clock() {
    let store = MemorySnapshotStore::with_snapshot(snapshot(NOW - 300_000, None, 0));
    let (engine, events) = restore(TimerSettings::default(), &store);

    assert!(events.is_empty());
    assert_eq!(engine.status(), TimerStatus::Running);
    assert_eq!(engine.remaining_ms(), 1_200_000);
    assert_eq!(engine.session_start_time(), Some(NOW - 300_000));
}

#[test]
fn test_missed_completion_is_reported_on_restore() {
    let started = NOW - 2 * FOCUS_MS;
    let store = MemorySnapshotStore::with_snapshot(snapshot(started, None, 3));
    let (engine, events) = restore(TimerSettings::default(), &store);

    assert_eq!(events.len(), 1);
    match &events[0] {
        Event::PhaseCompleted {
            report,
            next_phase,
            auto_advanced,
            recovered,
            ..
        } => {
            assert!(recovered);
            assert!(!auto_advanced);
            assert_eq!(*next_phase, Phase::LongBreak);
            assert_eq!(report.ended_at_ms, started + FOCUS_MS);
            assert_eq!(report.intention, "refactor parser");
            assert!(report.completed);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(engine.status(), TimerStatus::Idle);
    assert_eq!(engine.phase(), Phase::LongBreak);
    assert_eq!(engine.state().completed_focus_sessions, 4);
    assert!(store.peek().is_none());
    assert_eq!(
        store.get_cycle(),
        Some(CyclePosition::new(Phase::LongBreak, 4))
    );
}

#[test]
fn test_missed_completion_can_be_discarded() {
    let settings = TimerSettings {
        recover_missed_completions: false,
        ..TimerSettings::default()
    };
    let store = MemorySnapshotStore::with_snapshot(snapshot(NOW - 2 * FOCUS_MS, None, 3));
    let (engine, events) = restore(settings, &store);

    assert!(events.is_empty());
    assert_eq!(engine.status(), TimerStatus::Idle);
    assert_eq!(engine.phase(), Phase::Focus);
    assert_eq!(engine.state().completed_focus_sessions, 3);
    assert_eq!(engine.remaining_ms(), FOCUS_MS);
    assert!(store.peek().is_none());
}

#[test]
fn test_idle_position_survives_without_snapshot() {
    let store = MemorySnapshotStore::with_cycle(CyclePosition {
        added_ms: 120_000,
        ..CyclePosition::new(Phase::ShortBreak, 2)
    });
    let (engine, events) = restore(TimerSettings::default(), &store);

    assert!(events.is_empty());
    assert_eq!(engine.phase(), Phase::ShortBreak);
    assert_eq!(engine.status(), TimerStatus::Idle);
    assert_eq!(engine.remaining_ms(), 7 * 60_000);
    assert_eq!(engine.state().completed_focus_sessions, 2);
}

#[test]
fn test_malformed_snapshot_is_treated_as_absent() {
    assert!(SessionSnapshot::decode("{\"phase\":\"focus\"").is_none());
    assert!(SessionSnapshot::decode("not json").is_none());
}
