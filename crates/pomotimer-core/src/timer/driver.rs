//! Async driver for the countdown engine.
//!
//! Each engine lives in its own tokio task. Callers never touch the engine
//! directly: commands go in over an unbounded mpsc channel and events come
//! out over a broadcast channel, in the order the transitions happened.
//! The task keeps at most one pending wake-up. Every command drops it
//! before doing anything else and a fresh one is armed afterwards if the
//! engine is still running.

use std::future::pending;
use std::pin::Pin;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant, Sleep};
use tracing::{debug, info, warn};

use super::engine::{validate_duration, CountdownEngine, TimerSnapshot};
use crate::error::TimerError;
use crate::events::{TimerEvent, TimerEventKind};

/// Buffered events per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 256;

/// Messages accepted by the engine task.
#[derive(Debug)]
pub enum TimerCommand {
    Start { duration_secs: u64 },
    Pause,
    Resume,
    Stop,
    Reset { duration_secs: u64 },
    Snapshot { reply: oneshot::Sender<TimerSnapshot> },
    Shutdown,
}

/// Cloneable handle to a running engine task.
///
/// All commands return immediately; their outcome arrives as a
/// [`TimerEvent`] on [`subscribe`](Self::subscribe).
#[derive(Debug, Clone)]
pub struct TimerHandle {
    commands: mpsc::UnboundedSender<TimerCommand>,
    events: broadcast::Sender<TimerEvent>,
    state: watch::Receiver<TimerSnapshot>,
}

/// Spawn an idle engine task on the current tokio runtime.
///
/// # Panics
///
/// Panics when called outside a tokio runtime.
pub fn spawn() -> TimerHandle {
    spawn_engine(CountdownEngine::new())
}

/// Spawn an idle engine task with `remaining_secs` preloaded.
pub fn spawn_with_remaining(remaining_secs: u64) -> TimerHandle {
    spawn_engine(CountdownEngine::with_remaining(remaining_secs))
}

fn spawn_engine(engine: CountdownEngine) -> TimerHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
    let (state_tx, state_rx) = watch::channel(engine.snapshot());

    tokio::spawn(run(engine, command_rx, event_tx.clone(), state_tx));

    TimerHandle {
        commands: command_tx,
        events: event_tx,
        state: state_rx,
    }
}

impl TimerHandle {
    /// Start (or re-anchor) the countdown.
    ///
    /// # Errors
    ///
    /// `InvalidDuration` for zero, checked before anything is sent.
    pub fn start(&self, duration_secs: u64) -> Result<(), TimerError> {
        validate_duration(duration_secs)?;
        self.send(TimerCommand::Start { duration_secs })
    }

    pub fn pause(&self) -> Result<(), TimerError> {
        self.send(TimerCommand::Pause)
    }

    pub fn resume(&self) -> Result<(), TimerError> {
        self.send(TimerCommand::Resume)
    }

    pub fn stop(&self) -> Result<(), TimerError> {
        self.send(TimerCommand::Stop)
    }

    /// Return to idle with `duration_secs` preloaded.
    ///
    /// # Errors
    ///
    /// `InvalidDuration` for zero, checked before anything is sent.
    pub fn reset(&self, duration_secs: u64) -> Result<(), TimerError> {
        validate_duration(duration_secs)?;
        self.send(TimerCommand::Reset { duration_secs })
    }

    /// Ask the engine task to exit. Pending wake-ups are dropped.
    pub fn shutdown(&self) -> Result<(), TimerError> {
        self.send(TimerCommand::Shutdown)
    }

    /// Query the engine state after every previously sent command has been
    /// applied and any overdue wake-up has been processed.
    pub async fn snapshot(&self) -> Result<TimerSnapshot, TimerError> {
        let (reply, rx) = oneshot::channel();
        self.send(TimerCommand::Snapshot { reply })?;
        rx.await.map_err(|_| TimerError::Disconnected)
    }

    /// Last published state. Does not wait for in-flight commands.
    pub fn latest(&self) -> TimerSnapshot {
        *self.state.borrow()
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    /// Watch the published state.
    pub fn watch(&self) -> watch::Receiver<TimerSnapshot> {
        self.state.clone()
    }

    fn send(&self, command: TimerCommand) -> Result<(), TimerError> {
        self.commands
            .send(command)
            .map_err(|_| TimerError::Disconnected)
    }
}

async fn run(
    mut engine: CountdownEngine,
    mut commands: mpsc::UnboundedReceiver<TimerCommand>,
    events: broadcast::Sender<TimerEvent>,
    state: watch::Sender<TimerSnapshot>,
) {
    debug!("countdown engine task started");
    let mut wake: Option<Pin<Box<Sleep>>> = None;

    loop {
        tokio::select! {
            command = commands.recv() => {
                // The command itself is the cancellation.
                drop(wake.take());
                let Some(command) = command else {
                    debug!("all timer handles dropped");
                    break;
                };
                let now = Instant::now();
                publish(&events, &state, settle(&mut engine, now));

                let emitted = match command {
                    TimerCommand::Start { duration_secs } => match engine.start(duration_secs, now) {
                        Ok(event) => vec![event],
                        Err(e) => {
                            warn!("rejected start: {e}");
                            Vec::new()
                        }
                    },
                    TimerCommand::Pause => engine.pause(now),
                    TimerCommand::Resume => engine.resume(now).into_iter().collect(),
                    TimerCommand::Stop => vec![engine.stop()],
                    TimerCommand::Reset { duration_secs } => match engine.reset(duration_secs) {
                        Ok(event) => vec![event],
                        Err(e) => {
                            warn!("rejected reset: {e}");
                            Vec::new()
                        }
                    },
                    TimerCommand::Snapshot { reply } => {
                        let _ = reply.send(engine.snapshot());
                        Vec::new()
                    }
                    TimerCommand::Shutdown => break,
                };
                publish(&events, &state, emitted);
                wake = engine.next_wake().map(|at| Box::pin(sleep_until(at)));
            }
            () = wait_for(&mut wake) => {
                publish(&events, &state, engine.wake(Instant::now()));
                wake = engine.next_wake().map(|at| Box::pin(sleep_until(at)));
            }
        }
    }

    debug!("countdown engine task stopped");
}

/// Process a wake-up whose deadline already passed, so commands and
/// queries always see the countdown corrected to `now`.
fn settle(engine: &mut CountdownEngine, now: Instant) -> Vec<TimerEvent> {
    match engine.next_wake() {
        Some(at) if at <= now => engine.wake(now),
        _ => Vec::new(),
    }
}

pub(crate) async fn wait_for(wake: &mut Option<Pin<Box<Sleep>>>) {
    match wake {
        Some(sleep) => sleep.as_mut().await,
        None => pending().await,
    }
}

fn publish(
    events: &broadcast::Sender<TimerEvent>,
    state: &watch::Sender<TimerSnapshot>,
    emitted: Vec<TimerEvent>,
) {
    for event in emitted {
        match event.kind {
            TimerEventKind::Tick => debug!(remaining_secs = event.remaining_secs, "tick"),
            kind => info!(?kind, remaining_secs = event.remaining_secs, "timer transition"),
        }
        state.send_replace(event.snapshot());
        // No subscribers is fine; the watch channel still has the state.
        let _ = events.send(event);
    }
}
