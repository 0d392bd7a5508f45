use std::sync::Arc;

use clap::Args;
use pomotimer_core::timer;
use pomotimer_core::{
    Config, ConfigFileSource, NoopRecorder, OrchestratorHandle, SessionEvent, SessionKind,
    SessionOrchestrator, SessionRecorder, SettingsSource, TimerEventKind,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::output::{clock, JsonLinesRecorder, TerminalNotifier};

#[derive(Args)]
pub struct RunArgs {
    /// Work session length in minutes
    #[arg(long)]
    work: Option<u32>,
    /// Short break length in minutes
    #[arg(long)]
    short_break: Option<u32>,
    /// Long break length in minutes
    #[arg(long)]
    long_break: Option<u32>,
    /// Long break every N work sessions
    #[arg(long)]
    every: Option<u32>,
    /// Start the next session automatically
    #[arg(long)]
    auto_resume: bool,
    /// Exit after this many completed sessions
    #[arg(long)]
    cycles: Option<u64>,
    /// Print events as JSON lines instead of a clock
    #[arg(long)]
    json: bool,
    /// Print session start/completion records as JSON lines
    #[arg(long)]
    record: bool,
}

impl RunArgs {
    fn overrides_config(&self) -> bool {
        self.work.is_some()
            || self.short_break.is_some()
            || self.long_break.is_some()
            || self.every.is_some()
            || self.auto_resume
    }
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    if let Some(m) = args.work {
        config.timer.work_minutes = m;
    }
    if let Some(m) = args.short_break {
        config.timer.short_break_minutes = m;
    }
    if let Some(m) = args.long_break {
        config.timer.long_break_minutes = m;
    }
    if let Some(n) = args.every {
        config.timer.sessions_until_long_break = n;
    }
    if args.auto_resume {
        config.timer.auto_resume = true;
    }
    config.validate()?;

    // Without overrides the config file is re-read at every session
    // boundary, so edits apply to the next session.
    let settings: Arc<dyn SettingsSource> = if args.overrides_config() {
        Arc::new(config.timer_settings())
    } else {
        Arc::new(ConfigFileSource::new(Config::path()?)?)
    };
    let recorder: Arc<dyn SessionRecorder> = if args.record {
        Arc::new(JsonLinesRecorder)
    } else {
        Arc::new(NoopRecorder)
    };
    let notifier = TerminalNotifier::from_config(&config.notifications);

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(foreground(&args, settings, notifier, recorder));
    // The stdin reader blocks a pool thread until the next line arrives.
    runtime.shutdown_background();
    result
}

async fn foreground(
    args: &RunArgs,
    settings: Arc<dyn SettingsSource>,
    notifier: TerminalNotifier,
    recorder: Arc<dyn SessionRecorder>,
) -> Result<(), Box<dyn std::error::Error>> {
    let auto_resume = settings.settings().auto_resume;
    let handle = SessionOrchestrator::spawn(timer::spawn(), settings, notifier, recorder)?;
    let mut events = handle.subscribe();
    handle.start()?;

    if !args.json {
        eprintln!("commands: p pause, r resume/start, s skip, x reset, q quit");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut current = SessionKind::Work;
    let mut completed = 0u64;

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => {
                    if !dispatch(&handle, line.trim())? {
                        break;
                    }
                }
                None => {
                    debug!("stdin closed, running without input");
                    stdin_open = false;
                }
            },
            event = events.recv() => match event {
                Ok(event) => {
                    if args.json {
                        println!("{}", serde_json::to_string(&event)?);
                    } else {
                        print_event(&event, &mut current, auto_resume);
                    }
                    if matches!(event, SessionEvent::SessionCompleted { .. }) {
                        completed += 1;
                        if args.cycles.is_some_and(|limit| completed >= limit) {
                            break;
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "display fell behind"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    handle.shutdown()?;
    Ok(())
}

/// Apply one stdin command. Returns `false` on quit.
fn dispatch(handle: &OrchestratorHandle, input: &str) -> Result<bool, Box<dyn std::error::Error>> {
    match input {
        "p" => handle.pause()?,
        "r" => {
            // Picks up config edits while the loaded session is untouched.
            handle.reload_settings()?;
            handle.start()?;
        }
        "s" => handle.skip()?,
        "x" => handle.reset()?,
        "q" => return Ok(false),
        "" => {}
        other => eprintln!("unknown command: {other}"),
    }
    Ok(true)
}

fn print_event(event: &SessionEvent, current: &mut SessionKind, auto_resume: bool) {
    match event {
        SessionEvent::SessionLoaded { session, .. } | SessionEvent::SessionStarted { session, .. } => {
            *current = session.kind;
        }
        SessionEvent::SessionCompleted {
            completed, next, ..
        } => {
            *current = next.kind;
            println!(
                "{} complete. Next: {} ({})",
                completed.kind.label(),
                next.kind.label(),
                clock(next.duration_secs)
            );
            if !auto_resume {
                println!("press r to start");
            }
        }
        SessionEvent::Timer(timer) => match timer.kind {
            TimerEventKind::Started | TimerEventKind::Resumed | TimerEventKind::Tick => {
                println!("{:<12} {}", current.label(), clock(timer.remaining_secs));
            }
            TimerEventKind::Paused => {
                println!("{:<12} {} (paused)", current.label(), clock(timer.remaining_secs));
            }
            TimerEventKind::Stopped | TimerEventKind::Reset | TimerEventKind::Completed => {}
        },
    }
}
