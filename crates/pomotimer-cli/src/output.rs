//! Terminal-facing collaborators and formatting for `pomotimer run`.

use std::io::Write;

use chrono::{DateTime, Utc};
use pomotimer_core::storage::NotificationsConfig;
use pomotimer_core::{
    NotifyError, Notifier, RecordError, SessionDescriptor, SessionKind, SessionRecorder,
};
use serde::Serialize;

/// Prints a one-line notice on stderr, ringing the terminal bell unless
/// the sound theme is silent.
pub struct TerminalNotifier {
    enabled: bool,
    bell: bool,
}

impl TerminalNotifier {
    pub fn from_config(config: &NotificationsConfig) -> Self {
        Self {
            enabled: config.enabled,
            bell: config.audible(),
        }
    }

    fn notice(&self, kind: SessionKind, is_completion: bool) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let what = if is_completion { "finished" } else { "started" };
        let bell = if self.bell { "\x07" } else { "" };
        Some(format!("{bell}{} {what}", kind.label()))
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, kind: SessionKind, is_completion: bool) -> Result<(), NotifyError> {
        let Some(notice) = self.notice(kind, is_completion) else {
            return Ok(());
        };
        let mut stderr = std::io::stderr().lock();
        writeln!(stderr, "{notice}")?;
        stderr.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct Record<'a> {
    record: &'static str,
    session: &'a SessionDescriptor,
    at: DateTime<Utc>,
}

/// Writes one JSON object per session fact to stdout.
pub struct JsonLinesRecorder;

impl JsonLinesRecorder {
    fn write(&self, record: &'static str, session: &SessionDescriptor) -> Result<(), RecordError> {
        let line = serde_json::to_string(&Record {
            record,
            session,
            at: Utc::now(),
        })?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{line}")?;
        stdout.flush()?;
        Ok(())
    }
}

impl SessionRecorder for JsonLinesRecorder {
    fn session_started(&self, session: &SessionDescriptor) -> Result<(), RecordError> {
        self.write("session_started", session)
    }

    fn session_completed(&self, session: &SessionDescriptor) -> Result<(), RecordError> {
        self.write("session_completed", session)
    }
}

/// Seconds as `MM:SS`. Minutes are not wrapped at 60.
pub fn clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
