//! Session sequencing on top of the countdown engine.
//!
//! The orchestrator consults three collaborators: a [`SettingsSource`] for
//! durations, a [`Notifier`] for alerts and a [`SessionRecorder`] for
//! lifecycle facts. Only the settings are read; the other two are told
//! things and may fail without consequence.

mod collaborators;
mod kind;
mod orchestrator;
mod settings;

pub use collaborators::{LogNotifier, NoopRecorder, Notifier, SessionRecorder};
pub use kind::{SessionCycle, SessionDescriptor, SessionKind};
pub use orchestrator::{
    OrchestratorHandle, SessionCommand, SessionOrchestrator, SessionStatus, AUTO_RESUME_DELAY,
};
pub use settings::{SettingsSource, SharedSettings, TimerSettings};
