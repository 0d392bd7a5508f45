//! # Pomotimer Core Library
//!
//! Core logic for the pomotimer focus-session timer. The interesting part
//! is keeping a countdown honest when the process is starved or suspended:
//! wake-ups arrive late, sometimes many seconds late, and the remaining
//! time must still match the real time that passed.
//!
//! ## Architecture
//!
//! - **Countdown Engine**: a clock-injected state machine with fixed-origin
//!   drift correction and catch-up after stalls
//! - **Timer Driver**: one tokio task per engine holding the single pending
//!   wake-up; commands in over mpsc, events out over broadcast
//! - **Session Orchestrator**: work / short break / long break sequencing,
//!   auto-resume, notifier and recorder collaborators
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`CountdownEngine`]: core timer state machine
//! - [`TimerHandle`]: command/event handle to a running engine task
//! - [`SessionOrchestrator`]: session state machine
//! - [`Config`]: application configuration management

pub mod error;
pub mod events;
pub mod session;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, NotifyError, RecordError, TimerError};
pub use events::{SessionEvent, TimerEvent, TimerEventKind};
pub use session::{
    LogNotifier, NoopRecorder, Notifier, OrchestratorHandle, SessionCycle, SessionDescriptor,
    SessionKind, SessionOrchestrator, SessionRecorder, SessionStatus, SettingsSource,
    SharedSettings, TimerSettings,
};
pub use storage::{Config, ConfigFileSource};
pub use timer::{CountdownEngine, TimerHandle, TimerPhase, TimerSnapshot};
