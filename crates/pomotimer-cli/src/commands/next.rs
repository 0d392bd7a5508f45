use clap::Args;
use pomotimer_core::{Config, SessionCycle, SessionDescriptor, SessionKind};
use serde::Serialize;

#[derive(Args)]
pub struct NextArgs {
    /// Kind of the session that just finished (work, short_break, long_break)
    #[arg(long)]
    after: SessionKind,
    /// Work sessions completed before the one that finished
    #[arg(long, default_value = "0")]
    completed: u64,
    /// Long break every N work sessions (defaults to the configured value)
    #[arg(long)]
    every: Option<u32>,
}

#[derive(Serialize)]
struct NextSession {
    #[serde(flatten)]
    session: SessionDescriptor,
    completed_work_count: u64,
}

pub fn run(args: NextArgs) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Config::load()?.timer_settings();
    let every = args.every.unwrap_or(settings.sessions_until_long_break);

    let mut cycle = SessionCycle::with_completed(args.completed);
    let kind = cycle.complete(args.after, every);

    let next = NextSession {
        session: SessionDescriptor::new(kind, settings.duration_for(kind)),
        completed_work_count: cycle.completed_work_count(),
    };
    println!("{}", serde_json::to_string(&next)?);
    Ok(())
}
