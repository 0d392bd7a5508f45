use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionDescriptor;
use crate::timer::TimerSnapshot;

/// What happened to the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerEventKind {
    Started,
    Paused,
    Resumed,
    Stopped,
    Reset,
    Tick,
    Completed,
}

/// Every state change of a countdown engine produces a TimerEvent.
///
/// The payload always describes the engine state *after* the transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEvent {
    pub kind: TimerEventKind,
    pub remaining_secs: u64,
    pub running: bool,
    pub paused: bool,
    pub at: DateTime<Utc>,
}

impl TimerEvent {
    pub fn new(kind: TimerEventKind, snapshot: TimerSnapshot) -> Self {
        Self {
            kind,
            remaining_secs: snapshot.remaining_secs,
            running: snapshot.running,
            paused: snapshot.paused,
            at: Utc::now(),
        }
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            remaining_secs: self.remaining_secs,
            running: self.running,
            paused: self.paused,
        }
    }
}

/// Events published by the session orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A session was loaded into the engine and is waiting for `start`.
    SessionLoaded {
        session: SessionDescriptor,
        at: DateTime<Utc>,
    },
    SessionStarted {
        session: SessionDescriptor,
        at: DateTime<Utc>,
    },
    /// A session ran out (or was skipped) and the next one was chosen.
    SessionCompleted {
        completed: SessionDescriptor,
        next: SessionDescriptor,
        completed_work_count: u64,
        at: DateTime<Utc>,
    },
    /// Pass-through of the underlying engine event.
    Timer(TimerEvent),
}
