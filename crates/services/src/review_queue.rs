use std::sync::Arc;

use storage::repository::{ReviewRecordRepository, StorageError, WordSource};
use vocab_core::model::Word;
use vocab_core::{Clock, ReviewCountdown, scheduler};

/// The next scheduled review and how long until it opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextReview {
    pub at: chrono::DateTime<chrono::Utc>,
    pub countdown: ReviewCountdown,
}

/// Read-only view of what is waiting for review.
#[derive(Clone)]
pub struct ReviewQueueService {
    clock: Clock,
    words: Arc<dyn WordSource>,
    reviews: Arc<dyn ReviewRecordRepository>,
}

impl ReviewQueueService {
    #[must_use]
    pub fn new(
        clock: Clock,
        words: Arc<dyn WordSource>,
        reviews: Arc<dyn ReviewRecordRepository>,
    ) -> Self {
        Self {
            clock,
            words,
            reviews,
        }
    }

    /// Words that would be offered in a review session right now.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the word source fails.
    pub async fn due_words(&self, limit: u32) -> Result<Vec<Word>, StorageError> {
        self.words.fetch_due_words(self.clock.now(), limit).await
    }

    /// Earliest scheduled review, if any word has a record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if records cannot be loaded.
    pub async fn next_review(&self) -> Result<Option<NextReview>, StorageError> {
        let now = self.clock.now();
        Ok(self.reviews.next_record().await?.map(|record| NextReview {
            at: record.next_review_at,
            countdown: scheduler::time_until(record.next_review_at, now),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use storage::repository::{InMemoryRepository, WordRepository};
    use vocab_core::model::{MasteryLevel, ReviewRecord, WordId};
    use vocab_core::time::fixed_now;

    #[tokio::test]
    async fn countdown_to_next_review() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();
        let svc = ReviewQueueService::new(
            Clock::fixed(now),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        assert_eq!(svc.next_review().await.unwrap(), None);

        for (id, text) in [(1, "gist"), (2, "crux")] {
            let word = Word::new(WordId::new(id), text, "main point").unwrap();
            repo.upsert_word(&word).await.unwrap();
        }
        let at = now + Duration::hours(5) + Duration::minutes(2) + Duration::seconds(9);
        let record = |id, next_review_at| ReviewRecord {
            word_id: WordId::new(id),
            level: MasteryLevel::MIN,
            next_review_at,
            last_reviewed_at: now,
            streak: 0,
        };
        repo.upsert_records(&[record(1, at), record(2, at + Duration::minutes(61))])
            .await
            .unwrap();

        let next = svc.next_review().await.unwrap().unwrap();
        assert_eq!(next.at, at);
        assert_eq!(
            next.countdown,
            ReviewCountdown {
                hours: 5,
                minutes: 2,
                seconds: 9
            }
        );

        // The earliest batch is offered early; words past its grace window are not.
        let due: Vec<WordId> = svc
            .due_words(10)
            .await
            .unwrap()
            .iter()
            .map(Word::id)
            .collect();
        assert_eq!(due, vec![WordId::new(1)]);
    }
}
