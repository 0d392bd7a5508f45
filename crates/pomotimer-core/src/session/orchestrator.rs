//! Session orchestrator.
//!
//! Sits on top of one countdown engine and decides what comes after each
//! completed session. It runs as its own task and owns its [`TimerHandle`]
//! exclusively; callers talk to it through an [`OrchestratorHandle`].

use std::pin::Pin;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{sleep, Sleep};
use tracing::{debug, error, info, warn};

use super::collaborators::{Notifier, SessionRecorder};
use super::kind::{SessionCycle, SessionDescriptor, SessionKind};
use super::settings::SettingsSource;
use crate::error::TimerError;
use crate::events::{SessionEvent, TimerEvent, TimerEventKind};
use crate::timer::{wait_for, TimerHandle, TimerSnapshot};

/// Pause between a completion and the automatic start of the next session.
pub const AUTO_RESUME_DELAY: Duration = Duration::from_secs(1);

const EVENT_CAPACITY: usize = 256;

#[derive(Debug)]
pub enum SessionCommand {
    Start,
    Pause,
    Resume,
    /// Stop the current session and treat it as completed.
    Skip,
    /// Reload the current session's duration from settings.
    Reset,
    /// Re-derive the loaded session if it has not been started yet.
    ReloadSettings,
    ResetWorkCount,
    Status { reply: oneshot::Sender<SessionStatus> },
    Shutdown,
}

/// Orchestrator state as returned by [`OrchestratorHandle::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session: SessionDescriptor,
    pub completed_work_count: u64,
    /// Whether the loaded session has been started at least once.
    pub started: bool,
    pub timer: TimerSnapshot,
}

#[derive(Debug, Clone)]
pub struct OrchestratorHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    events: broadcast::Sender<SessionEvent>,
}

impl OrchestratorHandle {
    pub fn start(&self) -> Result<(), TimerError> {
        self.send(SessionCommand::Start)
    }

    pub fn pause(&self) -> Result<(), TimerError> {
        self.send(SessionCommand::Pause)
    }

    pub fn resume(&self) -> Result<(), TimerError> {
        self.send(SessionCommand::Resume)
    }

    pub fn skip(&self) -> Result<(), TimerError> {
        self.send(SessionCommand::Skip)
    }

    pub fn reset(&self) -> Result<(), TimerError> {
        self.send(SessionCommand::Reset)
    }

    pub fn reload_settings(&self) -> Result<(), TimerError> {
        self.send(SessionCommand::ReloadSettings)
    }

    pub fn reset_work_count(&self) -> Result<(), TimerError> {
        self.send(SessionCommand::ResetWorkCount)
    }

    /// Stop the orchestrator and the engine it owns.
    pub fn shutdown(&self) -> Result<(), TimerError> {
        self.send(SessionCommand::Shutdown)
    }

    pub async fn status(&self) -> Result<SessionStatus, TimerError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Status { reply })?;
        rx.await.map_err(|_| TimerError::Disconnected)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn send(&self, command: SessionCommand) -> Result<(), TimerError> {
        self.commands
            .send(command)
            .map_err(|_| TimerError::Disconnected)
    }
}

pub struct SessionOrchestrator<S, N, R> {
    timer: TimerHandle,
    timer_events: broadcast::Receiver<TimerEvent>,
    settings: S,
    notifier: N,
    recorder: R,
    cycle: SessionCycle,
    current: SessionDescriptor,
    started: bool,
    auto_start: Option<Pin<Box<Sleep>>>,
    events: broadcast::Sender<SessionEvent>,
}

impl<S, N, R> SessionOrchestrator<S, N, R>
where
    S: SettingsSource,
    N: Notifier,
    R: SessionRecorder,
{
    /// Take ownership of `timer`, load a work session into it and spawn the
    /// orchestrator task.
    ///
    /// # Errors
    ///
    /// `InvalidDuration` when the configured work duration is zero.
    pub fn spawn(
        timer: TimerHandle,
        settings: S,
        notifier: N,
        recorder: R,
    ) -> Result<OrchestratorHandle, TimerError> {
        Self::spawn_with_cycle(timer, settings, notifier, recorder, SessionCycle::new())
    }

    /// Like [`spawn`](Self::spawn) but continuing an existing work count.
    pub fn spawn_with_cycle(
        timer: TimerHandle,
        settings: S,
        notifier: N,
        recorder: R,
        cycle: SessionCycle,
    ) -> Result<OrchestratorHandle, TimerError> {
        let work_secs = settings.settings().work_secs;
        let current = SessionDescriptor::new(SessionKind::Work, work_secs);

        let timer_events = timer.subscribe();
        timer.reset(current.duration_secs)?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);

        let orchestrator = Self {
            timer,
            timer_events,
            settings,
            notifier,
            recorder,
            cycle,
            current,
            started: false,
            auto_start: None,
            events: event_tx.clone(),
        };
        tokio::spawn(orchestrator.run(command_rx));

        Ok(OrchestratorHandle {
            commands: command_tx,
            events: event_tx,
        })
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        info!(session = ?self.current, "session orchestrator started");
        self.emit(SessionEvent::SessionLoaded {
            session: self.current,
            at: Utc::now(),
        });

        loop {
            let outcome = tokio::select! {
                command = commands.recv() => match command {
                    None | Some(SessionCommand::Shutdown) => break,
                    Some(command) => self.handle_command(command).await,
                },
                event = self.timer_events.recv() => match event {
                    Ok(event) => self.handle_timer_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "orchestrator lagged behind timer events");
                        Ok(())
                    }
                    Err(RecvError::Closed) => Err(TimerError::Disconnected),
                },
                () = wait_for(&mut self.auto_start) => {
                    self.auto_start = None;
                    debug!("auto-resuming next session");
                    self.start().await
                }
            };

            match outcome {
                Ok(()) => {}
                Err(TimerError::Disconnected) => {
                    error!("countdown engine is gone, stopping session orchestrator");
                    break;
                }
                Err(e) => warn!("session command failed: {e}"),
            }
        }

        let _ = self.timer.shutdown();
        info!("session orchestrator stopped");
    }

    async fn handle_command(&mut self, command: SessionCommand) -> Result<(), TimerError> {
        // Any manual command supersedes a pending auto-start.
        if !matches!(command, SessionCommand::Status { .. }) {
            self.auto_start = None;
        }

        match command {
            SessionCommand::Start => self.start().await,
            SessionCommand::Pause => self.timer.pause(),
            SessionCommand::Resume => self.timer.resume(),
            SessionCommand::Skip => {
                info!(kind = %self.current.kind, "skipping session");
                self.timer.stop()?;
                self.complete_current()
            }
            SessionCommand::Reset => self.load(self.current.kind),
            SessionCommand::ReloadSettings => {
                let timer = self.timer.snapshot().await?;
                if self.started || timer.running || timer.paused {
                    debug!("session in progress, keeping its frozen duration");
                    return Ok(());
                }
                self.load(self.current.kind)
            }
            SessionCommand::ResetWorkCount => {
                self.cycle.reset();
                Ok(())
            }
            SessionCommand::Status { reply } => {
                let timer = self.timer.snapshot().await?;
                let _ = reply.send(SessionStatus {
                    session: self.current,
                    completed_work_count: self.cycle.completed_work_count(),
                    started: self.started,
                    timer,
                });
                Ok(())
            }
            SessionCommand::Shutdown => Ok(()),
        }
    }

    async fn handle_timer_event(&mut self, event: TimerEvent) -> Result<(), TimerError> {
        let kind = event.kind;
        self.emit(SessionEvent::Timer(event));
        if kind != TimerEventKind::Completed {
            return Ok(());
        }

        // A skip may already have moved on and reloaded the engine.
        if self.timer.snapshot().await?.remaining_secs != 0 {
            debug!("ignoring completion of a session that was already replaced");
            return Ok(());
        }
        self.complete_current()
    }

    /// Start or continue the loaded session.
    async fn start(&mut self) -> Result<(), TimerError> {
        let timer = self.timer.snapshot().await?;
        if timer.running {
            return Ok(());
        }
        if timer.paused {
            return self.timer.resume();
        }

        let secs = if timer.remaining_secs > 0 {
            timer.remaining_secs
        } else {
            self.current.duration_secs
        };
        match self.timer.start(secs) {
            Err(e @ TimerError::InvalidDuration { .. }) => {
                warn!(kind = %self.current.kind, "cannot start session: {e}");
                return Ok(());
            }
            other => other?,
        }

        if !self.started {
            self.started = true;
            if let Err(e) = self.notifier.notify(self.current.kind, false) {
                warn!("notifier failed: {e}");
            }
            if let Err(e) = self.recorder.session_started(&self.current) {
                warn!("recorder failed: {e}");
            }
            self.emit(SessionEvent::SessionStarted {
                session: self.current,
                at: Utc::now(),
            });
        }
        Ok(())
    }

    fn complete_current(&mut self) -> Result<(), TimerError> {
        let completed = self.current;
        let settings = self.settings.settings();
        let next_kind = self
            .cycle
            .complete(completed.kind, settings.sessions_until_long_break);
        let next = SessionDescriptor::new(next_kind, settings.duration_for(next_kind));

        info!(
            completed = %completed.kind,
            next = %next.kind,
            completed_work_count = self.cycle.completed_work_count(),
            "session complete"
        );

        if let Err(e) = self.notifier.notify(completed.kind, true) {
            warn!("notifier failed: {e}");
        }
        if let Err(e) = self.recorder.session_completed(&completed) {
            warn!("recorder failed: {e}");
        }

        self.current = next;
        self.started = false;
        self.preload()?;

        self.emit(SessionEvent::SessionCompleted {
            completed,
            next,
            completed_work_count: self.cycle.completed_work_count(),
            at: Utc::now(),
        });

        if settings.auto_resume {
            self.auto_start = Some(Box::pin(sleep(AUTO_RESUME_DELAY)));
        }
        Ok(())
    }

    /// Replace the loaded session with a fresh one of `kind`.
    fn load(&mut self, kind: SessionKind) -> Result<(), TimerError> {
        let secs = self.settings.settings().duration_for(kind);
        self.current = SessionDescriptor::new(kind, secs);
        self.started = false;
        self.preload()?;
        self.emit(SessionEvent::SessionLoaded {
            session: self.current,
            at: Utc::now(),
        });
        Ok(())
    }

    /// Reset the engine to the loaded session. A zero duration from settings
    /// is logged and leaves the engine untouched.
    fn preload(&self) -> Result<(), TimerError> {
        match self.timer.reset(self.current.duration_secs) {
            Err(e @ TimerError::InvalidDuration { .. }) => {
                warn!(kind = %self.current.kind, "cannot load session: {e}");
                Ok(())
            }
            other => other,
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}
