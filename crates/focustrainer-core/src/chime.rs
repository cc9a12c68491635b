//! Audible cue on phase transitions.
//!
//! Players are owned by the [`Coordinator`](crate::coordinator::Coordinator),
//! never by the engine.

use std::io::{IsTerminal, Write};

pub trait ChimePlayer: Send {
    /// Called right after a user gesture (start, resume) so the player can
    /// acquire whatever output it needs before the phase ends.
    fn prepare(&mut self);

    fn play(&mut self);
}

/// Plays nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentChime;

impl ChimePlayer for SilentChime {
    fn prepare(&mut self) {}

    fn play(&mut self) {}
}

/// Rings the terminal bell on stderr, if stderr is a terminal.
#[derive(Debug, Default)]
pub struct TerminalBell {
    available: Option<bool>,
}

impl TerminalBell {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChimePlayer for TerminalBell {
    fn prepare(&mut self) {
        if self.available.is_none() {
            self.available = Some(std::io::stderr().is_terminal());
        }
    }

    fn play(&mut self) {
        self.prepare();
        if self.available != Some(true) {
            return;
        }
        let mut stderr = std::io::stderr();
        if let Err(e) = stderr.write_all(b"\x07").and_then(|()| stderr.flush()) {
            tracing::debug!(error = %e, "could not ring terminal bell");
        }
    }
}
