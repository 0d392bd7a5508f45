//! Outbound collaborators of the orchestrator.
//!
//! Both traits are fire-and-forget: the orchestrator logs an `Err` and
//! carries on with its transition.

use std::sync::Arc;

use tracing::info;

use super::kind::{SessionDescriptor, SessionKind};
use crate::error::{NotifyError, RecordError};

/// Audible/visual alerting.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, kind: SessionKind, is_completion: bool) -> Result<(), NotifyError>;
}

/// Receives session lifecycle facts for storage or sync.
pub trait SessionRecorder: Send + Sync + 'static {
    fn session_started(&self, session: &SessionDescriptor) -> Result<(), RecordError>;
    fn session_completed(&self, session: &SessionDescriptor) -> Result<(), RecordError>;
}

impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    fn notify(&self, kind: SessionKind, is_completion: bool) -> Result<(), NotifyError> {
        (**self).notify(kind, is_completion)
    }
}

impl<T: SessionRecorder + ?Sized> SessionRecorder for Arc<T> {
    fn session_started(&self, session: &SessionDescriptor) -> Result<(), RecordError> {
        (**self).session_started(session)
    }

    fn session_completed(&self, session: &SessionDescriptor) -> Result<(), RecordError> {
        (**self).session_completed(session)
    }
}

/// Notifier that only writes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, kind: SessionKind, is_completion: bool) -> Result<(), NotifyError> {
        if is_completion {
            info!("{} session complete", kind.label());
        } else {
            info!("{} session started", kind.label());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecorder;

impl SessionRecorder for NoopRecorder {
    fn session_started(&self, _session: &SessionDescriptor) -> Result<(), RecordError> {
        Ok(())
    }

    fn session_completed(&self, _session: &SessionDescriptor) -> Result<(), RecordError> {
        Ok(())
    }
}
