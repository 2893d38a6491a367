use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::practice::PracticeLoopService;
use crate::review_queue::ReviewQueueService;
use crate::scheduling::{OfflineScheduling, Scheduling};

/// Assembles the app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    practice: Arc<PracticeLoopService>,
    review_queue: Arc<ReviewQueueService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        rng_seed: Option<u64>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, rng_seed))
    }

    /// Build services over an already opened storage backend.
    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, rng_seed: Option<u64>) -> Self {
        let scheduling: Arc<dyn Scheduling> = Arc::new(OfflineScheduling::new(
            clock,
            Arc::clone(&storage.reviews),
        ));
        let mut practice = PracticeLoopService::new(
            clock,
            Arc::clone(&storage.word_source),
            scheduling,
            Arc::clone(&storage.sessions),
        );
        if let Some(seed) = rng_seed {
            practice = practice.with_rng_seed(seed);
        }
        let review_queue = ReviewQueueService::new(
            clock,
            Arc::clone(&storage.word_source),
            Arc::clone(&storage.reviews),
        );

        Self {
            practice: Arc::new(practice),
            review_queue: Arc::new(review_queue),
        }
    }

    #[must_use]
    pub fn practice(&self) -> Arc<PracticeLoopService> {
        Arc::clone(&self.practice)
    }

    #[must_use]
    pub fn review_queue(&self) -> Arc<ReviewQueueService> {
        Arc::clone(&self.review_queue)
    }
}
