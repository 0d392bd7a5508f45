//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Session durations and the long-break interval
//! - Auto-resume policy
//! - Notification preferences
//!
//! Configuration is stored at `~/.config/pomotimer/config.toml` unless
//! `POMOTIMER_CONFIG` points somewhere else.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::warn;

use super::data_dir;
use crate::error::ConfigError;
use crate::session::{SettingsSource, TimerSettings};

/// Timer-specific configuration. Durations are in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,
    #[serde(default = "default_short_break")]
    pub short_break_minutes: u32,
    #[serde(default = "default_long_break")]
    pub long_break_minutes: u32,
    #[serde(default = "default_sessions_until_long_break")]
    pub sessions_until_long_break: u32,
    #[serde(default)]
    pub auto_resume: bool,
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// `"silent"` shows notices without the audible bell.
    #[serde(default = "default_sound_theme")]
    pub sound_theme: String,
}

impl NotificationsConfig {
    pub fn audible(&self) -> bool {
        self.enabled && self.sound_theme != SILENT_THEME
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

// Default functions
fn default_work_minutes() -> u32 {
    25
}
fn default_short_break() -> u32 {
    5
}
fn default_long_break() -> u32 {
    15
}
fn default_sessions_until_long_break() -> u32 {
    4
}
fn default_true() -> bool {
    true
}
const SILENT_THEME: &str = "silent";

fn default_sound_theme() -> String {
    "default".into()
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            short_break_minutes: default_short_break(),
            long_break_minutes: default_long_break(),
            sessions_until_long_break: default_sessions_until_long_break(),
            auto_resume: false,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sound_theme: default_sound_theme(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => value
                    .parse::<bool>()
                    .map(serde_json::Value::Bool)
                    .map_err(|e| invalid(e.to_string()))?,
                serde_json::Value::Number(_) => value
                    .parse::<u64>()
                    .map(|n| serde_json::Value::Number(n.into()))
                    .map_err(|_| invalid(format!("cannot parse '{value}' as a whole number")))?,
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    return Err(invalid("cannot set a whole section".into()));
                }
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// Location of the config file.
    ///
    /// `POMOTIMER_CONFIG` overrides the default under [`data_dir`].
    pub fn path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var("POMOTIMER_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/pomotimer"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk or create the default file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            return Ok(cfg);
        }
        Self::load_from(&path)
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. Does not save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result fails [`validate`](Self::validate). The config is left
    /// unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("timer.work_minutes", self.timer.work_minutes),
            ("timer.short_break_minutes", self.timer.short_break_minutes),
            ("timer.long_break_minutes", self.timer.long_break_minutes),
        ];
        for (key, minutes) in durations {
            if minutes == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: "must be at least 1 minute".into(),
                });
            }
        }
        if self.timer.sessions_until_long_break < 2 {
            return Err(ConfigError::InvalidValue {
                key: "timer.sessions_until_long_break".into(),
                message: "must be at least 2".into(),
            });
        }
        Ok(())
    }

    pub fn timer_settings(&self) -> TimerSettings {
        TimerSettings {
            work_secs: u64::from(self.timer.work_minutes) * 60,
            short_break_secs: u64::from(self.timer.short_break_minutes) * 60,
            long_break_secs: u64::from(self.timer.long_break_minutes) * 60,
            sessions_until_long_break: self.timer.sessions_until_long_break,
            auto_resume: self.timer.auto_resume,
        }
    }
}

impl SettingsSource for Config {
    fn settings(&self) -> TimerSettings {
        self.timer_settings()
    }
}

/// Settings re-read from a config file on every poll.
///
/// Edits to the file take effect at the next session boundary. When the
/// file becomes unreadable or invalid the last good settings are kept.
#[derive(Debug)]
pub struct ConfigFileSource {
    path: PathBuf,
    last_good: RwLock<TimerSettings>,
}

impl ConfigFileSource {
    pub fn new(path: PathBuf) -> Result<Self, ConfigError> {
        let initial = Config::load_from(&path)?.timer_settings();
        Ok(Self {
            path,
            last_good: RwLock::new(initial),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsSource for ConfigFileSource {
    fn settings(&self) -> TimerSettings {
        match Config::load_from(&self.path) {
            Ok(cfg) => {
                let settings = cfg.timer_settings();
                if let Ok(mut last) = self.last_good.write() {
                    *last = settings.clone();
                }
                settings
            }
            Err(e) => {
                warn!(path = %self.path.display(), "keeping previous settings: {e}");
                match self.last_good.read() {
                    Ok(last) => last.clone(),
                    Err(poisoned) => poisoned.into_inner().clone(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[timer]\nwork_minutes = 50\n").unwrap();
        assert_eq!(parsed.timer.work_minutes, 50);
        assert_eq!(parsed.timer.short_break_minutes, 5);
        assert!(parsed.notifications.enabled);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timer.work_minutes").as_deref(), Some("25"));
        assert_eq!(cfg.get("timer.auto_resume").as_deref(), Some("false"));
        assert_eq!(cfg.get("notifications.sound_theme").as_deref(), Some("default"));
        assert!(cfg.get("timer.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("timer.auto_resume", "true").unwrap();
        cfg.set("timer.long_break_minutes", "20").unwrap();
        cfg.set("notifications.sound_theme", "chime").unwrap();
        assert!(cfg.timer.auto_resume);
        assert_eq!(cfg.timer.long_break_minutes, 20);
        assert_eq!(cfg.notifications.sound_theme, "chime");
    }

    #[test]
    fn silent_theme_mutes_the_bell() {
        let mut cfg = Config::default();
        assert!(cfg.notifications.audible());

        cfg.set("notifications.sound_theme", "silent").unwrap();
        assert!(!cfg.notifications.audible());

        cfg.set("notifications.sound_theme", "chime").unwrap();
        cfg.set("notifications.enabled", "false").unwrap();
        assert!(!cfg.notifications.audible());
    }

    #[test]
    fn stale_notification_keys_are_ignored() {
        let cfg: Config = toml::from_str("[notifications]\nvibrate = false\n").unwrap();
        assert_eq!(cfg.notifications, NotificationsConfig::default());
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.set("timer.nonexistent", "1").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(_)));
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.set("timer.auto_resume", "maybe").is_err());
        assert!(cfg.set("timer.work_minutes", "-5").is_err());
        assert!(cfg.set("timer", "1").is_err());
    }

    #[test]
    fn set_rejects_values_that_fail_validation() {
        let mut cfg = Config::default();
        assert!(cfg.set("timer.sessions_until_long_break", "1").is_err());
        assert!(cfg.set("timer.work_minutes", "0").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn timer_settings_converts_minutes() {
        let cfg = Config::default();
        let settings = cfg.timer_settings();
        assert_eq!(settings, TimerSettings::default());
    }

    #[test]
    fn save_and_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set("timer.work_minutes", "45").unwrap();
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.timer.work_minutes, 45);
    }

    #[test]
    fn load_from_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn load_from_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[timer]\nsessions_until_long_break = 1\n").unwrap();
        assert!(Config::load_from(&path).is_err());

        std::fs::write(&path, "not = [valid").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseFailed(_))
        ));
    }

    #[test]
    fn file_source_tracks_edits_and_keeps_last_good() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Config::default().save_to(&path).unwrap();

        let source = ConfigFileSource::new(path.clone()).unwrap();
        assert_eq!(source.settings().work_secs, 1500);

        std::fs::write(&path, "[timer]\nwork_minutes = 30\n").unwrap();
        assert_eq!(source.settings().work_secs, 1800);

        std::fs::write(&path, "garbage = [").unwrap();
        assert_eq!(source.settings().work_secs, 1800);
    }
}
