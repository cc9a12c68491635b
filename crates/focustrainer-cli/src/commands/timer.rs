use std::ops::ControlFlow;
use std::time::Duration;

use clap::Subcommand;
use serde::Serialize;

use focustrainer_core::storage::{Database, SqliteSnapshotStore};
use focustrainer_core::timer::{self, TimerStatus, TimerView, TICK_INTERVAL};
use focustrainer_core::{Config, Coordinator, DistractionKind, Outcome, SystemClock, TerminalBell};

use super::print_json;

/// Floor for `watch --interval-ms`.
const MIN_WATCH_INTERVAL_MS: u64 = 50;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start the current phase
    Start {
        /// What this focus phase is for
        #[arg(long)]
        intention: Option<String>,
    },
    /// Pause the running phase
    Pause,
    /// Resume a paused phase
    Resume,
    /// Return to idle in the current phase
    Reset,
    /// End the current phase and move to the next one
    Skip,
    /// Extend the current phase by one minute
    AddMinute,
    /// Log a distraction against the running phase
    Distraction {
        /// thought, phone, notification, noise, urge or other
        kind: DistractionKind,
        #[arg(long, default_value = "")]
        note: String,
    },
    /// Set the intention of the current phase
    Intention { text: String },
    /// Print current timer state as JSON
    Status,
    /// Keep ticking and print a line whenever the display changes
    Watch {
        #[arg(long, default_value_t = TICK_INTERVAL.as_millis() as u64)]
        interval_ms: u64,
        /// Stop after the first completed phase
        #[arg(long)]
        until_complete: bool,
    },
}

#[derive(Serialize)]
struct TimerReport {
    timer: TimerView,
    #[serde(flatten)]
    outcome: Outcome,
}

fn open(config: &Config) -> Result<(Coordinator<Database>, Outcome), Box<dyn std::error::Error>> {
    let store = SqliteSnapshotStore::open()?;
    let recorder = Database::open()?;
    Ok(Coordinator::restore(
        config,
        store,
        Box::new(SystemClock),
        recorder,
        Box::new(TerminalBell::new()),
    ))
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let (mut coordinator, mut outcome) = open(&config)?;

    let later = match action {
        TimerAction::Start { intention } => coordinator.start(intention),
        TimerAction::Pause => coordinator.pause(),
        TimerAction::Resume => coordinator.resume(),
        TimerAction::Reset => coordinator.reset(),
        TimerAction::Skip => coordinator.skip(),
        TimerAction::AddMinute => coordinator.add_minute(),
        TimerAction::Distraction { kind, note } => coordinator.add_distraction(kind, note),
        TimerAction::Intention { text } => {
            coordinator.set_intention(text);
            Outcome::default()
        }
        TimerAction::Status => coordinator.tick(),
        TimerAction::Watch {
            interval_ms,
            until_complete,
        } => {
            print_line(&coordinator.engine().view(), &outcome);
            return watch(&mut coordinator, interval_ms, until_complete);
        }
    };
    outcome.absorb(later);

    print_json(&TimerReport {
        timer: coordinator.engine().view(),
        outcome,
    })
}

fn watch(
    coordinator: &mut Coordinator<Database>,
    interval_ms: u64,
    until_complete: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let period = Duration::from_millis(interval_ms.max(MIN_WATCH_INTERVAL_MS));
    let mut shown = coordinator.engine().view().remaining;

    runtime.block_on(timer::run_until(coordinator, period, |coordinator, view, outcome| {
        if view.remaining != shown || !outcome.events.is_empty() {
            shown.clone_from(&view.remaining);
            print_line(view, outcome);
        }
        let completed = outcome.events.iter().any(|e| e.is_completion());
        if completed {
            // settings edited while watching apply from the next phase on
            coordinator.apply_config(&Config::load_or_default());
        }
        if (until_complete && completed) || view.state.status != TimerStatus::Running {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }));
    Ok(())
}

/// One compact JSON line per update, for piping into other tools.
fn print_line(view: &TimerView, outcome: &Outcome) {
    let report = serde_json::json!({
        "timer": view,
        "events": outcome.events,
        "recorded": outcome.recorded,
    });
    println!("{report}");
}
