//! Drift-corrected countdown engine.
//!
//! The engine is a clock-injected state machine. It never reads the clock
//! itself and owns no threads: every command and every scheduled wake-up
//! is handed the current monotonic time by the caller. The async driver in
//! [`super::driver`] supplies real time and keeps at most one wake-up armed.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Paused -> Running -> Idle
//!            \________________________/
//!                stop / reset / completed
//! ```
//!
//! ## Drift correction
//!
//! Wake-ups are scheduled against a fixed origin (`expected_deadline`
//! advances by exactly one second per wake-up), so scheduler lateness never
//! compounds. Seconds are counted separately against `last_tick`, which
//! also only ever moves in whole seconds. A wake-up that arrives after a
//! long stall therefore subtracts every second that really elapsed in one
//! step.
//!
//! ```ignore
//! let mut engine = CountdownEngine::new();
//! engine.start(1500, Instant::now())?;
//! // whenever engine.next_wake() is reached:
//! let events = engine.wake(Instant::now());
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::TimerError;
use crate::events::{TimerEvent, TimerEventKind};

/// Countdown granularity.
pub const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
}

/// Point-in-time view of the countdown, as carried by every event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub remaining_secs: u64,
    pub running: bool,
    pub paused: bool,
}

/// Reject zero-length durations.
pub fn validate_duration(secs: u64) -> Result<u64, TimerError> {
    if secs == 0 {
        return Err(TimerError::InvalidDuration { secs });
    }
    Ok(secs)
}

/// Core countdown state machine.
#[derive(Debug, Clone)]
pub struct CountdownEngine {
    phase: TimerPhase,
    remaining_secs: u64,
    /// When the next whole-second boundary should be observed.
    /// Only set while running.
    expected_deadline: Option<Instant>,
    /// Boundary of the last second that was actually counted.
    /// Only set while running.
    last_tick: Option<Instant>,
}

impl Default for CountdownEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CountdownEngine {
    pub fn new() -> Self {
        Self::with_remaining(0)
    }

    /// Idle engine with `remaining_secs` preloaded.
    pub fn with_remaining(remaining_secs: u64) -> Self {
        Self {
            phase: TimerPhase::Idle,
            remaining_secs,
            expected_deadline: None,
            last_tick: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    pub fn is_paused(&self) -> bool {
        self.phase == TimerPhase::Paused
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            remaining_secs: self.remaining_secs,
            running: self.is_running(),
            paused: self.is_paused(),
        }
    }

    /// Instant at which [`wake`](Self::wake) should next be called.
    /// `None` unless running.
    pub fn next_wake(&self) -> Option<Instant> {
        match self.phase {
            TimerPhase::Running => self.expected_deadline,
            _ => None,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start counting down.
    ///
    /// From idle or paused this loads `duration_secs`. While already running
    /// only the drift bookkeeping is re-anchored at `now`; the remaining
    /// time is left alone.
    pub fn start(&mut self, duration_secs: u64, now: Instant) -> Result<TimerEvent, TimerError> {
        validate_duration(duration_secs)?;
        if self.phase != TimerPhase::Running {
            self.remaining_secs = duration_secs;
        }
        self.anchor(now);
        self.phase = TimerPhase::Running;
        Ok(self.event(TimerEventKind::Started))
    }

    /// Pause a running countdown.
    ///
    /// Whole seconds that elapsed since the last counted boundary are
    /// flushed first, so a pause right after a stalled wake-up still
    /// reports the true remaining time. The partial second in flight is
    /// dropped. Returns no events when not running.
    pub fn pause(&mut self, now: Instant) -> Vec<TimerEvent> {
        if self.phase != TimerPhase::Running {
            return Vec::new();
        }
        let mut events = Vec::new();
        if let Some(tick) = self.catch_up(now) {
            events.push(tick);
        }
        if self.remaining_secs == 0 {
            self.finish();
            events.push(self.event(TimerEventKind::Completed));
            return events;
        }
        self.phase = TimerPhase::Paused;
        self.clear_anchor();
        events.push(self.event(TimerEventKind::Paused));
        events
    }

    /// Resume a paused countdown. Time spent paused is never counted.
    pub fn resume(&mut self, now: Instant) -> Option<TimerEvent> {
        if self.phase != TimerPhase::Paused {
            return None;
        }
        self.anchor(now);
        self.phase = TimerPhase::Running;
        Some(self.event(TimerEventKind::Resumed))
    }

    /// Stop and zero the countdown.
    pub fn stop(&mut self) -> TimerEvent {
        self.remaining_secs = 0;
        self.finish();
        self.event(TimerEventKind::Stopped)
    }

    /// Return to idle with `duration_secs` preloaded.
    pub fn reset(&mut self, duration_secs: u64) -> Result<TimerEvent, TimerError> {
        validate_duration(duration_secs)?;
        self.finish();
        self.remaining_secs = duration_secs;
        Ok(self.event(TimerEventKind::Reset))
    }

    /// Scheduled wake-up.
    ///
    /// Emits at most one `tick` (carrying every second counted by this
    /// wake-up) followed, at zero, by `completed`. Stale wake-ups delivered
    /// after a pause or stop produce nothing.
    pub fn wake(&mut self, now: Instant) -> Vec<TimerEvent> {
        if self.phase != TimerPhase::Running {
            return Vec::new();
        }
        let Some(deadline) = self.expected_deadline else {
            return Vec::new();
        };

        tracing::trace!(
            drift_ms = signed_millis(now, deadline),
            remaining_secs = self.remaining_secs,
            "countdown wake-up"
        );

        let mut events = Vec::new();
        if let Some(tick) = self.catch_up(now) {
            events.push(tick);
        }

        if self.remaining_secs == 0 {
            self.finish();
            events.push(self.event(TimerEventKind::Completed));
            return events;
        }

        self.expected_deadline = Some(next_deadline(deadline, now));
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Count whole seconds elapsed since `last_tick`.
    fn catch_up(&mut self, now: Instant) -> Option<TimerEvent> {
        let last = self.last_tick?;
        let elapsed = now.saturating_duration_since(last).as_secs();
        if elapsed == 0 {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(elapsed);
        self.last_tick = Some(last + Duration::from_secs(elapsed));
        Some(self.event(TimerEventKind::Tick))
    }

    fn anchor(&mut self, now: Instant) {
        self.expected_deadline = Some(now + TICK);
        self.last_tick = Some(now);
    }

    fn clear_anchor(&mut self) {
        self.expected_deadline = None;
        self.last_tick = None;
    }

    fn finish(&mut self) {
        self.phase = TimerPhase::Idle;
        self.clear_anchor();
    }

    fn event(&self, kind: TimerEventKind) -> TimerEvent {
        TimerEvent::new(kind, self.snapshot())
    }
}

/// Advance a deadline by one tick, skipping boundaries a stall already
/// passed. The wait until the result equals `max(0, TICK - drift)` whenever
/// the drift is below one tick.
fn next_deadline(deadline: Instant, now: Instant) -> Instant {
    let next = deadline + TICK;
    if next > now {
        return next;
    }
    let missed = now.duration_since(next).as_secs() + 1;
    next + Duration::from_secs(missed)
}

fn signed_millis(now: Instant, deadline: Instant) -> i64 {
    if now >= deadline {
        now.duration_since(deadline).as_millis() as i64
    } else {
        -(deadline.duration_since(now).as_millis() as i64)
    }
}
