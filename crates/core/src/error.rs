use thiserror::Error;

use crate::engine::SessionStartError;
use crate::factory::FactoryError;
use crate::model::{ParseIdError, ParseModeError, ReviewError, SnapshotError, SummaryError, WordError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Word(#[from] WordError),
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error(transparent)]
    Factory(#[from] FactoryError),
    #[error(transparent)]
    SessionStart(#[from] SessionStartError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Summary(#[from] SummaryError),
    #[error(transparent)]
    ParseId(#[from] ParseIdError),
    #[error(transparent)]
    ParseMode(#[from] ParseModeError),
}
