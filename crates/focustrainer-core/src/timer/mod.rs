mod driver;
mod duration;
mod engine;
mod phase;
mod snapshot;

pub use driver::{run_until, TICK_INTERVAL};
pub use duration::{format_remaining, minutes_to_ms, resolve_duration, MS_PER_MINUTE};
pub use engine::{EngineState, TimerEngine, TimerView};
pub use phase::{Phase, TimerStatus};
pub use snapshot::{CyclePosition, MemorySnapshotStore, SessionSnapshot, SnapshotStore};
