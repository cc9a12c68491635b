//! Session history: what a finished or abandoned focus phase leaves behind.
//!
//! The timer engine produces a [`SessionReport`] inside its completion and
//! abandonment events. A [`SessionRecorder`] turns focus reports into
//! [`HistoryRecord`]s; a [`Reflection`] can be attached to a record once,
//! after the fact.

mod recorder;

pub use recorder::{MemoryRecorder, SessionRecorder};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ValidationError;
use crate::timer::Phase;

/// What pulled attention away during a focus phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistractionKind {
    Thought,
    Phone,
    Notification,
    Noise,
    Urge,
    Other,
}

impl DistractionKind {
    pub const ALL: [DistractionKind; 6] = [
        DistractionKind::Thought,
        DistractionKind::Phone,
        DistractionKind::Notification,
        DistractionKind::Noise,
        DistractionKind::Urge,
        DistractionKind::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DistractionKind::Thought => "thought",
            DistractionKind::Phone => "phone",
            DistractionKind::Notification => "notification",
            DistractionKind::Noise => "noise",
            DistractionKind::Urge => "urge",
            DistractionKind::Other => "other",
        }
    }
}

impl FromStr for DistractionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lowered)
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "distraction".into(),
                message: format!("unknown kind '{s}'"),
            })
    }
}

/// A logged distraction. Append-only within a phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distraction {
    pub kind: DistractionKind,
    #[serde(default)]
    pub note: String,
    /// Seconds from the session start.
    pub offset_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReflectionQuality {
    Great,
    Okay,
    Struggled,
}

impl FromStr for ReflectionQuality {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "great" => Ok(ReflectionQuality::Great),
            "okay" | "ok" => Ok(ReflectionQuality::Okay),
            "struggled" => Ok(ReflectionQuality::Struggled),
            _ => Err(ValidationError::InvalidValue {
                field: "quality".into(),
                message: format!("expected great, okay or struggled, got '{s}'"),
            }),
        }
    }
}

/// End-of-session reflection written by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    pub quality: ReflectionQuality,
    #[serde(default)]
    pub biggest_distraction: Option<DistractionKind>,
    #[serde(default)]
    pub note: String,
}

/// Configured phase lengths in minutes at the time a session was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDurations {
    pub focus: u32,
    pub short_break: u32,
    pub long_break: u32,
}

/// Context of a phase instance that just ended, carried by completion and
/// abandonment events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: String,
    pub phase: Phase,
    pub intention: String,
    pub distractions: Vec<Distraction>,
    /// Epoch ms the user started this phase.
    pub started_at_ms: u64,
    /// Epoch ms the phase ended (completion, skip, abandonment).
    pub ended_at_ms: u64,
    /// Counter value before this phase was accounted for.
    pub completed_focus_sessions: u32,
    pub phase_durations: PhaseDurations,
    /// `false` for an abandoned phase.
    pub completed: bool,
}

/// A persisted focus session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub phase_durations: PhaseDurations,
    pub intention: String,
    pub distractions: Vec<Distraction>,
    pub reflection: Option<Reflection>,
    pub completed: bool,
}

impl HistoryRecord {
    /// Build a fresh record (new id, no reflection) from a report.
    pub fn from_report(report: &SessionReport) -> Self {
        let end_time = ms_to_datetime(report.ended_at_ms);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            date: end_time.date_naive(),
            start_time: ms_to_datetime(report.started_at_ms),
            end_time,
            phase_durations: report.phase_durations,
            intention: report.intention.clone(),
            distractions: report.distractions.clone(),
            reflection: None,
            completed: report.completed,
        }
    }
}

pub(crate) fn ms_to_datetime(ms: u64) -> DateTime<Utc> {
    i64::try_from(ms)
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn report(phase: Phase, completed: bool) -> SessionReport {
        SessionReport {
            session_id: "s-1".into(),
            phase,
            intention: "write the parser".into(),
            distractions: vec![Distraction {
                kind: DistractionKind::Phone,
                note: String::new(),
                offset_seconds: 42,
            }],
            started_at_ms: 1_700_000_000_000,
            ended_at_ms: 1_700_001_500_000,
            completed_focus_sessions: 0,
            phase_durations: PhaseDurations {
                focus: 25,
                short_break: 5,
                long_break: 15,
            },
            completed,
        }
    }

    #[test]
    fn record_from_report_copies_context() {
        let record = HistoryRecord::from_report(&report(Phase::Focus, true));
        assert_eq!(record.intention, "write the parser");
        assert_eq!(record.distractions.len(), 1);
        assert!(record.completed);
        assert!(record.reflection.is_none());
        assert_eq!(record.date.to_string(), "2023-11-14");
        assert_eq!(record.start_time.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(record.end_time.timestamp_millis(), 1_700_001_500_000);
    }

    #[test]
    fn distraction_kind_parses_case_insensitively() {
        assert_eq!(
            "Phone".parse::<DistractionKind>().unwrap(),
            DistractionKind::Phone
        );
        assert!("email".parse::<DistractionKind>().is_err());
    }

    #[test]
    fn reflection_quality_accepts_ok_alias() {
        assert_eq!(
            "ok".parse::<ReflectionQuality>().unwrap(),
            ReflectionQuality::Okay
        );
        assert!("meh".parse::<ReflectionQuality>().is_err());
    }
}
