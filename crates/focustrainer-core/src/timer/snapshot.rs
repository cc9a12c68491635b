//! The persisted shadow of an in-progress phase and the port it is stored
//! through.
//!
//! Exactly one snapshot slot exists. The engine writes it after every
//! operation that leaves the timer running or paused and clears it whenever
//! the timer lands in idle; it reads it once, at construction.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

use super::phase::{Phase, TimerStatus};
use crate::session::Distraction;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub phase: Phase,
    pub target_duration_ms: u64,
    /// Instant from which `target_duration_ms` of continuous running would
    /// complete the phase. While paused this is the pause instant.
    pub start_timestamp: u64,
    /// Set iff the timer is paused.
    pub paused_remaining_ms: Option<u64>,
    pub completed_focus_sessions: u32,
    #[serde(default)]
    pub intention: String,
    #[serde(default)]
    pub distractions: Vec<Distraction>,
    /// Wall-clock instant the user pressed start. Older snapshots lack it.
    #[serde(default)]
    pub session_start_ms: Option<u64>,
}

impl SessionSnapshot {
    pub fn status(&self) -> TimerStatus {
        if self.paused_remaining_ms.is_some() {
            TimerStatus::Paused
        } else {
            TimerStatus::Running
        }
    }

    /// Parse a stored snapshot. Anything unreadable or inconsistent counts
    /// as "no snapshot".
    pub fn decode(raw: &str) -> Option<Self> {
        match serde_json::from_str::<SessionSnapshot>(raw) {
            Ok(snapshot) if snapshot.target_duration_ms > 0 => Some(snapshot),
            Ok(_) => {
                tracing::warn!("ignoring stored session with zero target duration");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed stored session");
                None
            }
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Where an idle timer sits in the focus/break cycle.
///
/// Written whenever an idle timer changes so that a restart without a
/// snapshot resumes at the right phase with the right counter, keeping
/// minutes added and the intention set while idle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CyclePosition {
    pub phase: Phase,
    pub completed_focus_sessions: u32,
    /// Minutes added on top of the configured duration, in ms.
    #[serde(default)]
    pub added_ms: u64,
    #[serde(default)]
    pub intention: String,
}

impl CyclePosition {
    pub fn new(phase: Phase, completed_focus_sessions: u32) -> Self {
        Self {
            phase,
            completed_focus_sessions,
            added_ms: 0,
            intention: String::new(),
        }
    }
}

/// Durable storage for the single current-session slot.
///
/// Implementations swallow and log their own I/O failures; the engine treats
/// a failed read as an empty slot.
pub trait SnapshotStore: Send {
    fn get(&self) -> Option<SessionSnapshot>;

    /// `None` deletes the slot.
    fn put(&mut self, snapshot: Option<&SessionSnapshot>);

    fn get_cycle(&self) -> Option<CyclePosition> {
        None
    }

    fn put_cycle(&mut self, _position: &CyclePosition) {}
}

/// In-memory slot. Clones share the slot, so a test can observe what the
/// engine wrote.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    slot: Arc<Mutex<Option<SessionSnapshot>>>,
    cycle: Arc<Mutex<Option<CyclePosition>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: SessionSnapshot) -> Self {
        let store = Self::default();
        *lock(&store.slot) = Some(snapshot);
        store
    }

    pub fn with_cycle(position: CyclePosition) -> Self {
        let store = Self::default();
        *lock(&store.cycle) = Some(position);
        store
    }

    /// Current slot contents.
    pub fn peek(&self) -> Option<SessionSnapshot> {
        self.get()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn get(&self) -> Option<SessionSnapshot> {
        lock(&self.slot).clone()
    }

    fn put(&mut self, snapshot: Option<&SessionSnapshot>) {
        *lock(&self.slot) = snapshot.cloned();
    }

    fn get_cycle(&self) -> Option<CyclePosition> {
        lock(&self.cycle).clone()
    }

    fn put_cycle(&mut self, position: &CyclePosition) {
        *lock(&self.cycle) = Some(position.clone());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            id: "abc".into(),
            phase: Phase::Focus,
            target_duration_ms: 1_500_000,
            start_timestamp: 1_000,
            paused_remaining_ms: None,
            completed_focus_sessions: 2,
            intention: "ship it".into(),
            distractions: Vec::new(),
            session_start_ms: Some(1_000),
        }
    }

    #[test]
    fn status_follows_paused_remaining() {
        let mut snap = snapshot();
        assert_eq!(snap.status(), TimerStatus::Running);
        snap.paused_remaining_ms = Some(10);
        assert_eq!(snap.status(), TimerStatus::Paused);
    }

    #[test]
    fn decode_rejects_garbage_and_zero_targets() {
        assert!(SessionSnapshot::decode("not valid json").is_none());
        assert!(SessionSnapshot::decode("{\"id\":\"x\"}").is_none());

        let mut snap = snapshot();
        snap.target_duration_ms = 0;
        assert!(SessionSnapshot::decode(&snap.encode().unwrap()).is_none());
    }

    #[test]
    fn decode_tolerates_missing_optional_fields() {
        let raw = r#"{
            "id": "legacy",
            "phase": "shortBreak",
            "target_duration_ms": 300000,
            "start_timestamp": 5,
            "paused_remaining_ms": null,
            "completed_focus_sessions": 1
        }"#;
        let snap = SessionSnapshot::decode(raw).unwrap();
        assert_eq!(snap.phase, Phase::ShortBreak);
        assert!(snap.intention.is_empty());
        assert!(snap.session_start_ms.is_none());
    }

    #[test]
    fn memory_store_clones_share_the_slot() {
        let store = MemorySnapshotStore::new();
        let mut writer = store.clone();
        writer.put(Some(&snapshot()));
        assert_eq!(store.peek().unwrap().id, "abc");
        writer.put(None);
        assert!(store.peek().is_none());
    }

    #[test]
    fn memory_store_keeps_cycle_position_separately() {
        let mut store = MemorySnapshotStore::new();
        assert!(store.get_cycle().is_none());
        let position = CyclePosition {
            added_ms: 60_000,
            ..CyclePosition::new(Phase::LongBreak, 4)
        };
        store.put_cycle(&position);
        store.put(None);
        assert_eq!(store.get_cycle(), Some(position));
    }

    #[test]
    fn cycle_position_without_idle_extras_still_decodes() {
        let position: CyclePosition =
            serde_json::from_str(r#"{"phase":"shortBreak","completed_focus_sessions":2}"#).unwrap();
        assert_eq!(position, CyclePosition::new(Phase::ShortBreak, 2));
    }
}
