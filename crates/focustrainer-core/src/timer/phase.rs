use serde::{Deserialize, Serialize};

/// One segment of the work/rest cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Focus,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Focus => "Focus",
            Phase::ShortBreak => "Short Break",
            Phase::LongBreak => "Long Break",
        }
    }

    pub fn is_break(self) -> bool {
        !matches!(self, Phase::Focus)
    }

    /// The phase that follows `self`.
    ///
    /// `completed_focus_sessions` is the counter after the current phase has
    /// been accounted for; `counted` says whether the current phase added to
    /// it. Only a counted focus phase can lead to a long break, and it does
    /// so on every `long_break_interval`-th completion.
    pub fn successor(
        self,
        completed_focus_sessions: u32,
        counted: bool,
        long_break_interval: u32,
    ) -> Phase {
        match self {
            Phase::Focus => {
                let interval = long_break_interval.max(1);
                if counted && completed_focus_sessions % interval == 0 {
                    Phase::LongBreak
                } else {
                    Phase::ShortBreak
                }
            }
            Phase::ShortBreak | Phase::LongBreak => Phase::Focus,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Countdown status, independent of the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
}
