//! Periodic tick driver.
//!
//! Ticking only refreshes the view; the countdown itself is derived from the
//! wall clock, so a late or skipped tick never loses time.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::coordinator::{Coordinator, Outcome};
use crate::session::SessionRecorder;
use crate::timer::TimerView;

/// Default refresh period for interactive displays.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Tick `coordinator` every `period` until `observe` breaks.
///
/// `observe` sees the view after every tick together with what that tick did,
/// and may act on the coordinator before the next tick.
pub async fn run_until<R, F>(coordinator: &mut Coordinator<R>, period: Duration, mut observe: F)
where
    R: SessionRecorder,
    F: FnMut(&mut Coordinator<R>, &TimerView, &Outcome) -> ControlFlow<()>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        let outcome = coordinator.tick();
        let view = coordinator.engine().view();
        if observe(&mut *coordinator, &view, &outcome).is_break() {
            tracing::debug!(phase = %view.state.phase, "tick driver stopped");
            break;
        }
    }
}
