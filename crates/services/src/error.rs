//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use vocab_core::SessionStartError;
use vocab_core::model::{SnapshotError, SummaryError};

/// Errors emitted by a `Scheduling` implementation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchedulingError {
    #[error("scheduling backend rejected the submission: {0}")]
    Rejected(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `PracticeLoopService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PracticeError {
    #[error("no words available for practice")]
    DataUnavailable,
    #[error("session has not been completed")]
    NotCompleted,
    #[error("session was abandoned")]
    Abandoned,
    #[error("submitting session results failed")]
    SubmissionFailed(#[source] SchedulingError),
    #[error(transparent)]
    Start(SessionStartError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Summary(#[from] SummaryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<SessionStartError> for PracticeError {
    fn from(err: SessionStartError) -> Self {
        match err {
            SessionStartError::DataUnavailable => PracticeError::DataUnavailable,
            other => PracticeError::Start(other),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
