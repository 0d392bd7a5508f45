//! Core error types for pomotimer-core.
//!
//! The timer itself has a narrow failure surface: the only
//! input it rejects is a zero-length duration. Everything else here belongs
//! to configuration handling or to collaborators whose failures are logged
//! and otherwise ignored.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for pomotimer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Countdown engine errors
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Errors raised by the countdown engine and its handle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// A start or reset was requested with a zero-length duration.
    #[error("Invalid duration: {secs}s (must be a positive number of seconds)")]
    InvalidDuration { secs: u64 },

    /// The engine task has shut down and no longer accepts commands.
    #[error("Timer engine is no longer running")]
    Disconnected,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Failure reported by a [`Notifier`](crate::session::Notifier).
#[derive(Error, Debug)]
#[error("Notification failed: {0}")]
pub struct NotifyError(pub String);

/// Failure reported by a [`SessionRecorder`](crate::session::SessionRecorder).
#[derive(Error, Debug)]
#[error("Session record failed: {0}")]
pub struct RecordError(pub String);

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

impl From<std::io::Error> for NotifyError {
    fn from(err: std::io::Error) -> Self {
        NotifyError(err.to_string())
    }
}

impl From<std::io::Error> for RecordError {
    fn from(err: std::io::Error) -> Self {
        RecordError(err.to_string())
    }
}

impl From<serde_json::Error> for RecordError {
    fn from(err: serde_json::Error) -> Self {
        RecordError(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_duration_message_names_value() {
        let err = TimerError::InvalidDuration { secs: 0 };
        assert!(err.to_string().contains("0s"));
    }

    #[test]
    fn timer_error_converts_into_core_error() {
        let err: CoreError = TimerError::Disconnected.into();
        assert!(matches!(err, CoreError::Timer(TimerError::Disconnected)));
    }
}
