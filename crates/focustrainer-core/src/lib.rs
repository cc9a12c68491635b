//! # Focus Trainer Core Library
//!
//! This library provides the core logic for Focus Trainer, a focus/break
//! interval timer. Every operation is available through the standalone CLI
//! binary, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine. The caller drives
//!   `tick()`; remaining time is always derived from absolute timestamps
//! - **Snapshot Store**: The engine mirrors itself into a store after every
//!   state change and rebuilds itself from it on startup
//! - **Session Recorder**: Completed and abandoned focus sessions become
//!   history records that can later receive a reflection
//! - **Storage**: SQLite for history and snapshots, TOML for configuration
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`Coordinator`]: Wires engine, recorder and chime together
//! - [`Database`]: History and snapshot persistence
//! - [`Config`]: Application configuration management

pub mod chime;
pub mod clock;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod session;
pub mod storage;
pub mod timer;

pub use chime::{ChimePlayer, SilentChime, TerminalBell};
pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{Coordinator, Outcome};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use session::{
    Distraction, DistractionKind, HistoryRecord, MemoryRecorder, Reflection, ReflectionQuality,
    SessionRecorder, SessionReport,
};
pub use storage::{Config, Database, SqliteSnapshotStore, TimerSettings};
pub use timer::{
    EngineState, MemorySnapshotStore, Phase, SessionSnapshot, SnapshotStore, TimerEngine,
    TimerStatus, TimerView,
};
