use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionKind {
    pub fn is_break(self) -> bool {
        !matches!(self, SessionKind::Work)
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionKind::Work => "Work",
            SessionKind::ShortBreak => "Short Break",
            SessionKind::LongBreak => "Long Break",
        }
    }
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SessionKind::Work => "work",
            SessionKind::ShortBreak => "short_break",
            SessionKind::LongBreak => "long_break",
        })
    }
}

impl std::str::FromStr for SessionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" => Ok(SessionKind::Work),
            "short_break" | "short-break" => Ok(SessionKind::ShortBreak),
            "long_break" | "long-break" => Ok(SessionKind::LongBreak),
            other => Err(format!("unknown session kind: {other}")),
        }
    }
}

/// One timed interval. The duration is fixed when the session is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    pub kind: SessionKind,
    pub duration_secs: u64,
}

impl SessionDescriptor {
    pub fn new(kind: SessionKind, duration_secs: u64) -> Self {
        Self {
            kind,
            duration_secs,
        }
    }
}

/// Work/break alternation with a long break every Nth work session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCycle {
    completed_work_count: u64,
}

impl SessionCycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_completed(completed_work_count: u64) -> Self {
        Self {
            completed_work_count,
        }
    }

    pub fn completed_work_count(&self) -> u64 {
        self.completed_work_count
    }

    /// Record a finished session and return the kind that follows it.
    ///
    /// `sessions_until_long_break` below 1 is treated as 1.
    pub fn complete(&mut self, finished: SessionKind, sessions_until_long_break: u32) -> SessionKind {
        if finished.is_break() {
            return SessionKind::Work;
        }
        self.completed_work_count += 1;
        let every = u64::from(sessions_until_long_break.max(1));
        if self.completed_work_count % every == 0 {
            SessionKind::LongBreak
        } else {
            SessionKind::ShortBreak
        }
    }

    pub fn reset(&mut self) {
        self.completed_work_count = 0;
    }
}
