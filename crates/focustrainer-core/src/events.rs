use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{Distraction, SessionReport};
use crate::timer::Phase;

/// Every state change of the timer produces an Event.
///
/// Operations return the events they caused, in order. The coordinator routes
/// completion and abandonment events to the session recorder; everything
/// else is informational for renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        session_id: String,
        phase: Phase,
        duration_ms: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        phase: Phase,
        at: DateTime<Utc>,
    },
    TimerSkipped {
        from: Phase,
        to: Phase,
        at: DateTime<Utc>,
    },
    MinuteAdded {
        remaining_ms: u64,
        target_duration_ms: u64,
        at: DateTime<Utc>,
    },
    DistractionLogged {
        distraction: Distraction,
        at: DateTime<Utc>,
    },
    /// A phase reached its end, naturally or through a skip of a running
    /// focus phase.
    PhaseCompleted {
        report: SessionReport,
        next_phase: Phase,
        /// The next phase was started immediately.
        auto_advanced: bool,
        /// Completion happened while nothing was observing the timer and was
        /// detected on restore.
        recovered: bool,
        at: DateTime<Utc>,
    },
    /// A started focus phase was reset before completing.
    SessionAbandoned {
        report: SessionReport,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// The session context carried by completion and abandonment events.
    pub fn report(&self) -> Option<&SessionReport> {
        match self {
            Event::PhaseCompleted { report, .. } | Event::SessionAbandoned { report, .. } => {
                Some(report)
            }
            _ => None,
        }
    }

    pub fn is_completion(&self) -> bool {
        matches!(self, Event::PhaseCompleted { .. })
    }
}
