//! The boundary that turns session attempts into updated review records.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use storage::repository::ReviewRecordRepository;
use tracing::info;
use vocab_core::model::{ReviewAttempt, SubmissionContext, WordId};
use vocab_core::{Clock, SubmissionReport, scheduler};

use crate::error::SchedulingError;

/// Authoritative level and next-review update for a finished session.
#[async_trait]
pub trait Scheduling: Send + Sync {
    /// Apply `attempts` and return the records as they now stand.
    ///
    /// # Errors
    ///
    /// Returns `SchedulingError` if the update could not be applied; no record
    /// is changed in that case.
    async fn submit_attempts(
        &self,
        context: SubmissionContext,
        attempts: &[ReviewAttempt],
    ) -> Result<SubmissionReport, SchedulingError>;
}

/// Local scheduling backed by the reference rule and a record repository.
#[derive(Clone)]
pub struct OfflineScheduling {
    clock: Clock,
    reviews: Arc<dyn ReviewRecordRepository>,
}

impl OfflineScheduling {
    #[must_use]
    pub fn new(clock: Clock, reviews: Arc<dyn ReviewRecordRepository>) -> Self {
        Self { clock, reviews }
    }
}

#[async_trait]
impl Scheduling for OfflineScheduling {
    async fn submit_attempts(
        &self,
        context: SubmissionContext,
        attempts: &[ReviewAttempt],
    ) -> Result<SubmissionReport, SchedulingError> {
        let now = self.clock.now();

        let mut ids: Vec<WordId> = attempts.iter().map(|a| a.word_id).collect();
        ids.sort_unstable();
        ids.dedup();

        let current: HashMap<WordId, _> = self
            .reviews
            .get_records(&ids)
            .await?
            .into_iter()
            .map(|r| (r.word_id, r))
            .collect();

        let report = scheduler::apply_submission(context, &current, attempts, now);
        self.reviews.upsert_records(&report.records).await?;

        info!(
            ?context,
            attempts = attempts.len(),
            records = report.records.len(),
            points = report.points,
            "submitted attempts"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use storage::repository::{InMemoryRepository, WordRepository};
    use vocab_core::model::{MasteryLevel, ReviewRecord, Word};
    use vocab_core::time::fixed_now;

    async fn seeded_repo() -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        for id in 1..=2 {
            let word = Word::new(WordId::new(id), format!("w{id}"), format!("d{id}")).unwrap();
            repo.upsert_word(&word).await.unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn offline_review_applies_reference_rule() {
        let repo = seeded_repo().await;
        let now = fixed_now();
        repo.upsert_records(&[ReviewRecord {
            word_id: WordId::new(1),
            level: MasteryLevel::new(3).unwrap(),
            next_review_at: now,
            last_reviewed_at: now - Duration::days(7),
            streak: 1,
        }])
        .await
        .unwrap();

        let scheduling = OfflineScheduling::new(Clock::fixed(now), Arc::new(repo.clone()));
        let report = scheduling
            .submit_attempts(
                SubmissionContext::Review,
                &[
                    ReviewAttempt::new(WordId::new(1), true),
                    ReviewAttempt::new(WordId::new(2), false),
                ],
            )
            .await
            .unwrap();

        assert_eq!(report.points, 3);
        let stored = repo
            .get_records(&[WordId::new(1), WordId::new(2)])
            .await
            .unwrap();
        let first = stored.iter().find(|r| r.word_id == WordId::new(1)).unwrap();
        assert_eq!(first.level.value(), 4);
        assert_eq!(first.next_review_at, now + Duration::days(14));
        let second = stored.iter().find(|r| r.word_id == WordId::new(2)).unwrap();
        assert_eq!(second.level, MasteryLevel::MIN);
        assert_eq!(second.next_review_at, now + Duration::days(1));
    }

    #[tokio::test]
    async fn failed_write_surfaces_as_storage_error() {
        let repo = seeded_repo().await;
        let scheduling = OfflineScheduling::new(Clock::fixed(fixed_now()), Arc::new(repo));
        let err = scheduling
            .submit_attempts(
                SubmissionContext::Lesson,
                &[ReviewAttempt::new(WordId::new(42), true)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::Storage(_)));
    }
}
