use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use vocab_core::model::{CourseId, LessonId, ReviewRecord, SessionSummary, Word, WordId};
use vocab_core::scheduler;

/// Completed sessions kept in history.
pub const HISTORY_LIMIT: u32 = 20;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Where practice sessions get their words from.
#[async_trait]
pub trait WordSource: Send + Sync {
    /// Words whose review record is review-ready at `now`, soonest first.
    ///
    /// Review-ready means `next_review_at` is at or before the earliest pending
    /// review plus a one-hour grace window, and never later than that even if
    /// `now` is earlier.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if records or words cannot be loaded.
    async fn fetch_due_words(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Word>, StorageError>;

    /// Words assigned to a lesson, in lesson order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the words cannot be loaded.
    async fn fetch_words_for_course_lesson(
        &self,
        course_id: CourseId,
        lesson_id: LessonId,
    ) -> Result<Vec<Word>, StorageError>;
}

#[async_trait]
pub trait WordRepository: Send + Sync {
    /// Persist or update a word.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the word cannot be stored.
    async fn upsert_word(&self, word: &Word) -> Result<(), StorageError>;

    /// Fetch a word by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_word(&self, id: WordId) -> Result<Word, StorageError>;

    /// Append words to a lesson, after any words it already holds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if a word does not exist.
    async fn assign_to_lesson(
        &self,
        course_id: CourseId,
        lesson_id: LessonId,
        word_ids: &[WordId],
    ) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ReviewRecordRepository: Send + Sync {
    /// Records for the given words; words without a record are left out.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if records cannot be loaded.
    async fn get_records(&self, word_ids: &[WordId]) -> Result<Vec<ReviewRecord>, StorageError>;

    /// The pending record that comes up next, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if records cannot be loaded.
    async fn next_record(&self) -> Result<Option<ReviewRecord>, StorageError>;

    /// Write all records or none of them.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if a record refers to an unknown word.
    async fn upsert_records(&self, records: &[ReviewRecord]) -> Result<(), StorageError>;
}

/// Active-session snapshot and completed-session history.
#[async_trait]
pub trait SessionSnapshotRepository: Send + Sync {
    /// Replace the stored active session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be stored.
    async fn save_active(&self, snapshot: &str, saved_at: DateTime<Utc>)
    -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be read.
    async fn load_active(&self) -> Result<Option<String>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be removed.
    async fn clear_active(&self) -> Result<(), StorageError>;

    /// Store a completed session. Appending the same session twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the summary cannot be stored.
    async fn append_summary(&self, summary: &SessionSummary) -> Result<(), StorageError>;

    /// Most recent summaries first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if summaries cannot be loaded.
    async fn recent_summaries(&self, limit: u32) -> Result<Vec<SessionSummary>, StorageError>;

    /// Drop all but the `keep` most recent summaries; returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if summaries cannot be removed.
    async fn prune_summaries(&self, keep: u32) -> Result<u64, StorageError>;
}

//
// ─── IN MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct SessionStore {
    snapshot: Option<String>,
    history: Vec<SessionSummary>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    words: Arc<Mutex<HashMap<WordId, Word>>>,
    lessons: Arc<Mutex<HashMap<(CourseId, LessonId), Vec<WordId>>>>,
    records: Arc<Mutex<HashMap<WordId, ReviewRecord>>>,
    sessions: Arc<Mutex<SessionStore>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn words_by_id(&self, ids: &[WordId]) -> Result<Vec<Word>, StorageError> {
        let guard = lock(&self.words)?;
        Ok(ids.iter().filter_map(|id| guard.get(id).cloned()).collect())
    }
}

#[async_trait]
impl WordSource for InMemoryRepository {
    async fn fetch_due_words(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Word>, StorageError> {
        let records: Vec<ReviewRecord> = lock(&self.records)?.values().cloned().collect();
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let due = scheduler::select_due(&records, now, limit);
        self.words_by_id(&due)
    }

    async fn fetch_words_for_course_lesson(
        &self,
        course_id: CourseId,
        lesson_id: LessonId,
    ) -> Result<Vec<Word>, StorageError> {
        let ids = lock(&self.lessons)?
            .get(&(course_id, lesson_id))
            .cloned()
            .unwrap_or_default();
        self.words_by_id(&ids)
    }
}

#[async_trait]
impl WordRepository for InMemoryRepository {
    async fn upsert_word(&self, word: &Word) -> Result<(), StorageError> {
        lock(&self.words)?.insert(word.id(), word.clone());
        Ok(())
    }

    async fn get_word(&self, id: WordId) -> Result<Word, StorageError> {
        lock(&self.words)?
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn assign_to_lesson(
        &self,
        course_id: CourseId,
        lesson_id: LessonId,
        word_ids: &[WordId],
    ) -> Result<(), StorageError> {
        {
            let words = lock(&self.words)?;
            if word_ids.iter().any(|id| !words.contains_key(id)) {
                return Err(StorageError::NotFound);
            }
        }
        let mut lessons = lock(&self.lessons)?;
        let lesson = lessons.entry((course_id, lesson_id)).or_default();
        for id in word_ids {
            if !lesson.contains(id) {
                lesson.push(*id);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ReviewRecordRepository for InMemoryRepository {
    async fn get_records(&self, word_ids: &[WordId]) -> Result<Vec<ReviewRecord>, StorageError> {
        let guard = lock(&self.records)?;
        Ok(word_ids
            .iter()
            .filter_map(|id| guard.get(id).cloned())
            .collect())
    }

    async fn next_record(&self) -> Result<Option<ReviewRecord>, StorageError> {
        Ok(lock(&self.records)?
            .values()
            .min_by_key(|r| (r.next_review_at, r.word_id))
            .cloned())
    }

    async fn upsert_records(&self, records: &[ReviewRecord]) -> Result<(), StorageError> {
        {
            let words = lock(&self.words)?;
            if records.iter().any(|r| !words.contains_key(&r.word_id)) {
                return Err(StorageError::NotFound);
            }
        }
        let mut guard = lock(&self.records)?;
        for record in records {
            guard.insert(record.word_id, record.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl SessionSnapshotRepository for InMemoryRepository {
    async fn save_active(
        &self,
        snapshot: &str,
        _saved_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        lock(&self.sessions)?.snapshot = Some(snapshot.to_owned());
        Ok(())
    }

    async fn load_active(&self) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.sessions)?.snapshot.clone())
    }

    async fn clear_active(&self) -> Result<(), StorageError> {
        lock(&self.sessions)?.snapshot = None;
        Ok(())
    }

    async fn append_summary(&self, summary: &SessionSummary) -> Result<(), StorageError> {
        let mut guard = lock(&self.sessions)?;
        if guard
            .history
            .iter()
            .any(|s| s.session_id == summary.session_id)
        {
            return Ok(());
        }
        guard.history.push(summary.clone());
        Ok(())
    }

    async fn recent_summaries(&self, limit: u32) -> Result<Vec<SessionSummary>, StorageError> {
        let mut history = lock(&self.sessions)?.history.clone();
        history.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        history.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(history)
    }

    async fn prune_summaries(&self, keep: u32) -> Result<u64, StorageError> {
        let mut guard = lock(&self.sessions)?;
        let keep = usize::try_from(keep).unwrap_or(usize::MAX);
        guard
            .history
            .sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        let removed = guard.history.len().saturating_sub(keep);
        guard.history.truncate(keep);
        Ok(removed as u64)
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Every repository the services need, behind trait objects.
#[derive(Clone)]
pub struct Storage {
    pub words: Arc<dyn WordRepository>,
    pub word_source: Arc<dyn WordSource>,
    pub reviews: Arc<dyn ReviewRecordRepository>,
    pub sessions: Arc<dyn SessionSnapshotRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Share one repository across every storage concern.
    #[must_use]
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: WordRepository
            + WordSource
            + ReviewRecordRepository
            + SessionSnapshotRepository
            + Clone
            + 'static,
    {
        Self {
            words: Arc::new(repo.clone()),
            word_source: Arc::new(repo.clone()),
            reviews: Arc::new(repo.clone()),
            sessions: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use vocab_core::model::{Achievements, MasteryLevel, PracticeMode, SessionId};
    use vocab_core::time::fixed_now;

    fn word(id: u64) -> Word {
        Word::new(WordId::new(id), format!("word{id}"), format!("meaning {id}")).unwrap()
    }

    fn record(id: u64, next: DateTime<Utc>) -> ReviewRecord {
        ReviewRecord {
            word_id: WordId::new(id),
            level: MasteryLevel::MIN,
            next_review_at: next,
            last_reviewed_at: fixed_now(),
            streak: 0,
        }
    }

    fn summary(completed_at: DateTime<Utc>) -> SessionSummary {
        SessionSummary {
            session_id: SessionId::generate(),
            mode: PracticeMode::Mixed,
            started_at: completed_at - Duration::minutes(2),
            completed_at,
            score: 50,
            total_questions: 4,
            correct_answers: 2,
            incorrect_answers: 2,
            time_spent_secs: 120,
            question_types: Vec::new(),
            achievements: Achievements::default(),
        }
    }

    #[tokio::test]
    async fn due_words_follow_cutoff_and_order() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();
        for id in 1..=3 {
            repo.upsert_word(&word(id)).await.unwrap();
        }
        repo.upsert_records(&[
            record(1, now + Duration::minutes(30)),
            record(2, now - Duration::hours(2)),
            record(3, now + Duration::days(2)),
        ])
        .await
        .unwrap();

        let due = repo.fetch_due_words(now, 10).await.unwrap();
        let ids: Vec<WordId> = due.iter().map(Word::id).collect();
        assert_eq!(ids, vec![WordId::new(2)]);

        let later = repo
            .fetch_due_words(now + Duration::hours(1), 10)
            .await
            .unwrap();
        assert_eq!(later.len(), 2);
        assert_eq!(later[0].id(), WordId::new(2));
    }

    #[tokio::test]
    async fn records_for_unknown_words_are_rejected_atomically() {
        let repo = InMemoryRepository::new();
        repo.upsert_word(&word(1)).await.unwrap();
        let err = repo
            .upsert_records(&[record(1, fixed_now()), record(9, fixed_now())])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
        assert!(
            repo.get_records(&[WordId::new(1)])
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn lesson_words_keep_assignment_order() {
        let repo = InMemoryRepository::new();
        for id in [5, 2, 7] {
            repo.upsert_word(&word(id)).await.unwrap();
        }
        let (course, lesson) = (CourseId::new(1), LessonId::new(3));
        repo.assign_to_lesson(course, lesson, &[WordId::new(7), WordId::new(2)])
            .await
            .unwrap();
        repo.assign_to_lesson(course, lesson, &[WordId::new(2), WordId::new(5)])
            .await
            .unwrap();

        let words = repo
            .fetch_words_for_course_lesson(course, lesson)
            .await
            .unwrap();
        let ids: Vec<u64> = words.iter().map(|w| w.id().value()).collect();
        assert_eq!(ids, vec![7, 2, 5]);
    }

    #[tokio::test]
    async fn history_is_idempotent_and_prunable() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();
        let first = summary(now);
        repo.append_summary(&first).await.unwrap();
        repo.append_summary(&first).await.unwrap();
        for i in 1..=3 {
            repo.append_summary(&summary(now + Duration::minutes(i)))
                .await
                .unwrap();
        }

        assert_eq!(repo.prune_summaries(2).await.unwrap(), 2);
        let recent = repo.recent_summaries(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].completed_at, now + Duration::minutes(3));
    }

    #[tokio::test]
    async fn active_snapshot_round_trips() {
        let repo = InMemoryRepository::new();
        assert_eq!(repo.load_active().await.unwrap(), None);
        repo.save_active("{}", fixed_now()).await.unwrap();
        assert_eq!(repo.load_active().await.unwrap().as_deref(), Some("{}"));
        repo.clear_active().await.unwrap();
        assert_eq!(repo.load_active().await.unwrap(), None);
    }
}
