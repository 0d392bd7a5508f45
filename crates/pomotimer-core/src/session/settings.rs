//! Read-only timer configuration as seen by the orchestrator.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use super::kind::SessionKind;

/// Durations and cycle policy, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    pub work_secs: u64,
    pub short_break_secs: u64,
    pub long_break_secs: u64,
    pub sessions_until_long_break: u32,
    pub auto_resume: bool,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_secs: 25 * 60,
            short_break_secs: 5 * 60,
            long_break_secs: 15 * 60,
            sessions_until_long_break: 4,
            auto_resume: false,
        }
    }
}

impl TimerSettings {
    pub fn duration_for(&self, kind: SessionKind) -> u64 {
        match kind {
            SessionKind::Work => self.work_secs,
            SessionKind::ShortBreak => self.short_break_secs,
            SessionKind::LongBreak => self.long_break_secs,
        }
    }
}

/// Configuration collaborator. Polled at every decision, never cached.
pub trait SettingsSource: Send + Sync + 'static {
    fn settings(&self) -> TimerSettings;
}

impl SettingsSource for TimerSettings {
    fn settings(&self) -> TimerSettings {
        self.clone()
    }
}

impl<T: SettingsSource + ?Sized> SettingsSource for Arc<T> {
    fn settings(&self) -> TimerSettings {
        (**self).settings()
    }
}

/// Settings that can be changed while an orchestrator is running.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<TimerSettings>>,
}

impl SharedSettings {
    pub fn new(settings: TimerSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    pub fn set(&self, settings: TimerSettings) {
        self.update(|current| *current = settings);
    }

    pub fn update(&self, f: impl FnOnce(&mut TimerSettings)) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard);
    }
}

impl SettingsSource for SharedSettings {
    fn settings(&self) -> TimerSettings {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
