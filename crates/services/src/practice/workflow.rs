use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use storage::repository::{HISTORY_LIMIT, SessionSnapshotRepository, WordSource};
use tracing::{debug, info, warn};
use vocab_core::model::{
    CourseId, LessonId, PracticeMode, QuestionId, SessionId, SessionState, SessionSummary,
    SubmissionContext, Word,
};
use vocab_core::{QuestionFactory, SessionEngine, SubmissionReport, Transition};

use super::session::PracticeSession;
use crate::Clock;
use crate::error::PracticeError;
use crate::scheduling::Scheduling;

/// Default number of questions in a session.
pub const DEFAULT_SESSION_SIZE: usize = 10;

/// Default cap on review-ready words fetched for a review session.
pub const DEFAULT_DUE_LIMIT: u32 = 50;

/// Drives practice sessions across the word source and scheduling boundaries.
///
/// Answering is purely local. Completing a session (through `advance` or
/// `skip` past the last question) submits its attempts, appends it to the
/// history and clears the saved active session.
#[derive(Clone)]
pub struct PracticeLoopService {
    clock: Clock,
    words: Arc<dyn WordSource>,
    scheduling: Arc<dyn Scheduling>,
    sessions: Arc<dyn SessionSnapshotRepository>,
    factory: Arc<Mutex<QuestionFactory<StdRng>>>,
    due_limit: u32,
    history_limit: u32,
}

impl PracticeLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        words: Arc<dyn WordSource>,
        scheduling: Arc<dyn Scheduling>,
        sessions: Arc<dyn SessionSnapshotRepository>,
    ) -> Self {
        Self {
            clock,
            words,
            scheduling,
            sessions,
            factory: Arc::new(Mutex::new(QuestionFactory::from_os_rng())),
            due_limit: DEFAULT_DUE_LIMIT,
            history_limit: HISTORY_LIMIT,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Use a deterministic question factory.
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.factory = Arc::new(Mutex::new(QuestionFactory::seeded(seed)));
        self
    }

    #[must_use]
    pub fn with_due_limit(mut self, limit: u32) -> Self {
        self.due_limit = limit;
        self
    }

    #[must_use]
    pub fn with_history_limit(mut self, limit: u32) -> Self {
        self.history_limit = limit;
        self
    }

    //
    // ─── START ────────────────────────────────────────────────────────────────
    //

    /// Start a review session from review-ready words.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::DataUnavailable` if nothing is due, or
    /// `PracticeError::Storage` if the word source fails.
    pub async fn start_due_session(
        &self,
        mode: PracticeMode,
        size: usize,
    ) -> Result<PracticeSession, PracticeError> {
        let now = self.clock.now();
        let words = self.words.fetch_due_words(now, self.due_limit).await?;
        self.start_with(words, mode, size, SubmissionContext::Review)
    }

    /// Start a first-pass session over a lesson's words.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::DataUnavailable` if the lesson has no words, or
    /// `PracticeError::Storage` if the word source fails.
    pub async fn start_lesson_session(
        &self,
        course_id: CourseId,
        lesson_id: LessonId,
        mode: PracticeMode,
        size: usize,
    ) -> Result<PracticeSession, PracticeError> {
        let words = self
            .words
            .fetch_words_for_course_lesson(course_id, lesson_id)
            .await?;
        self.start_with(words, mode, size, SubmissionContext::Lesson)
    }

    fn start_with(
        &self,
        words: Vec<Word>,
        mode: PracticeMode,
        size: usize,
        context: SubmissionContext,
    ) -> Result<PracticeSession, PracticeError> {
        let now = self.clock.now();
        let mut engine = SessionEngine::new(SessionId::generate(), now);
        {
            let mut factory = self.factory.lock().unwrap_or_else(PoisonError::into_inner);
            engine.start(&words, mode, size, &mut *factory, now)?;
        }

        info!(
            session_id = %engine.session().id(),
            ?context,
            mode = %mode,
            pool = words.len(),
            questions = engine.session().questions().len(),
            "practice session started"
        );
        Ok(PracticeSession::new(engine, context))
    }

    //
    // ─── STEPS ────────────────────────────────────────────────────────────────
    //

    /// Record an answer for the current question.
    pub fn answer(
        &self,
        practice: &mut PracticeSession,
        question_id: QuestionId,
        answer: &str,
    ) -> Transition {
        practice
            .engine
            .answer(question_id, answer, self.clock.now())
    }

    /// Move to the next question, finishing the session after the last one.
    ///
    /// # Errors
    ///
    /// Returns the error of [`Self::finalize`] when this step completes the
    /// session and finishing it fails. The session stays completed.
    pub async fn advance(&self, practice: &mut PracticeSession) -> Result<Transition, PracticeError> {
        let transition = practice.engine.advance(self.clock.now());
        self.finish_if_completed(practice, transition).await
    }

    /// Move on without answering.
    ///
    /// # Errors
    ///
    /// Same as [`Self::advance`].
    pub async fn skip(&self, practice: &mut PracticeSession) -> Result<Transition, PracticeError> {
        let transition = practice.engine.skip(self.clock.now());
        self.finish_if_completed(practice, transition).await
    }

    /// Drop an in-progress session. Nothing is submitted for it.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Storage` if the saved snapshot cannot be cleared.
    pub async fn abandon(&self, practice: &mut PracticeSession) -> Result<Transition, PracticeError> {
        let transition = practice.engine.abandon();
        if transition.is_applied() {
            self.sessions.clear_active().await?;
            info!(session_id = %practice.session().id(), "practice session abandoned");
        }
        Ok(transition)
    }

    async fn finish_if_completed(
        &self,
        practice: &mut PracticeSession,
        transition: Transition,
    ) -> Result<Transition, PracticeError> {
        if transition.is_completed() {
            self.finalize(practice).await?;
        }
        Ok(transition)
    }

    //
    // ─── COMPLETION ───────────────────────────────────────────────────────────
    //

    /// Submit a completed session and record it in history.
    ///
    /// Safe to call again after a failure: a submission that already went
    /// through is not repeated, and neither is the history entry.
    ///
    /// # Errors
    ///
    /// - `PracticeError::Abandoned` for an abandoned session.
    /// - `PracticeError::NotCompleted` if the session is still open.
    /// - `PracticeError::SubmissionFailed` if the scheduling boundary fails.
    /// - `PracticeError::Storage` if history cannot be written.
    pub async fn finalize(
        &self,
        practice: &mut PracticeSession,
    ) -> Result<SubmissionReport, PracticeError> {
        match practice.state() {
            SessionState::Completed => {}
            SessionState::Abandoned => return Err(PracticeError::Abandoned),
            SessionState::Created | SessionState::InProgress => {
                return Err(PracticeError::NotCompleted);
            }
        }

        let report = match practice.submission.clone() {
            Some(report) => report,
            None => {
                let report = self.submit(practice).await?;
                practice.submission = Some(report.clone());
                report
            }
        };

        if !practice.history_saved {
            let summary = practice.summary()?;
            self.record_history(&summary).await?;
            practice.history_saved = true;
        }

        Ok(report)
    }

    async fn submit(&self, practice: &PracticeSession) -> Result<SubmissionReport, PracticeError> {
        let session_id = practice.session().id();
        let attempts = practice.session().attempts();
        if attempts.is_empty() {
            debug!(session_id = %session_id, "no attempts to submit");
            return Ok(SubmissionReport::default());
        }

        self.scheduling
            .submit_attempts(practice.context(), &attempts)
            .await
            .map_err(|err| {
                warn!(session_id = %session_id, error = %err, "submission failed");
                PracticeError::SubmissionFailed(err)
            })
    }

    async fn record_history(&self, summary: &SessionSummary) -> Result<(), PracticeError> {
        self.sessions.append_summary(summary).await?;
        let pruned = self.sessions.prune_summaries(self.history_limit).await?;
        self.sessions.clear_active().await?;
        info!(
            session_id = %summary.session_id,
            score = summary.score,
            answered = summary.answered(),
            total = summary.total_questions,
            pruned,
            "practice session recorded"
        );
        Ok(())
    }

    //
    // ─── PERSISTENCE ──────────────────────────────────────────────────────────
    //

    /// Save an in-progress session so it can be resumed later.
    ///
    /// Sessions in any other state are not saved.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Snapshot` or `PracticeError::Storage` on failure.
    pub async fn save_progress(&self, practice: &PracticeSession) -> Result<(), PracticeError> {
        if practice.state() != SessionState::InProgress {
            return Ok(());
        }
        let snapshot = practice.to_snapshot()?;
        self.sessions
            .save_active(&snapshot, self.clock.now())
            .await?;
        debug!(session_id = %practice.session().id(), "practice session saved");
        Ok(())
    }

    /// Restore the saved in-progress session, if any.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Snapshot` if the saved session is unreadable or
    /// inconsistent, or `PracticeError::Storage` if it cannot be loaded.
    pub async fn resume(&self) -> Result<Option<PracticeSession>, PracticeError> {
        let Some(snapshot) = self.sessions.load_active().await? else {
            return Ok(None);
        };
        let practice = PracticeSession::from_snapshot(&snapshot)?;
        info!(
            session_id = %practice.session().id(),
            remaining = practice.progress().remaining,
            "practice session resumed"
        );
        Ok(Some(practice))
    }

    /// Most recent completed sessions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Storage` if history cannot be loaded.
    pub async fn history(&self) -> Result<Vec<SessionSummary>, PracticeError> {
        Ok(self.sessions.recent_summaries(self.history_limit).await?)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use storage::repository::{InMemoryRepository, ReviewRecordRepository, WordRepository};
    use vocab_core::model::{QuestionType, ReviewAttempt, WordId};
    use vocab_core::time::fixed_now;

    use crate::error::SchedulingError;
    use crate::scheduling::OfflineScheduling;

    /// Fails the first `failures` calls, then delegates.
    struct FlakyScheduling {
        inner: OfflineScheduling,
        failures: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Scheduling for FlakyScheduling {
        async fn submit_attempts(
            &self,
            context: SubmissionContext,
            attempts: &[ReviewAttempt],
        ) -> Result<SubmissionReport, SchedulingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(SchedulingError::Rejected("timeout".into()));
            }
            self.inner.submit_attempts(context, attempts).await
        }
    }

    async fn lesson_repo(n: u64) -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        let ids: Vec<WordId> = (1..=n).map(WordId::new).collect();
        for id in &ids {
            let word = Word::new(*id, format!("word{id}"), format!("meaning {id}")).unwrap();
            repo.upsert_word(&word).await.unwrap();
        }
        repo.assign_to_lesson(CourseId::new(1), LessonId::new(1), &ids)
            .await
            .unwrap();
        repo
    }

    fn service(repo: &InMemoryRepository, scheduling: Arc<dyn Scheduling>) -> PracticeLoopService {
        PracticeLoopService::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            scheduling,
            Arc::new(repo.clone()),
        )
        .with_rng_seed(7)
    }

    fn offline(repo: &InMemoryRepository) -> OfflineScheduling {
        OfflineScheduling::new(Clock::fixed(fixed_now()), Arc::new(repo.clone()))
    }

    async fn answer_all(svc: &PracticeLoopService, practice: &mut PracticeSession) {
        while !practice.is_complete() {
            let q = practice.current_question().unwrap().clone();
            svc.answer(practice, q.id(), q.correct_answer());
            let _ = svc.advance(practice).await;
        }
    }

    #[tokio::test]
    async fn empty_due_pool_is_data_unavailable() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo, Arc::new(offline(&repo)));
        let err = svc
            .start_due_session(PracticeMode::Mixed, DEFAULT_SESSION_SIZE)
            .await
            .unwrap_err();
        assert!(matches!(err, PracticeError::DataUnavailable));
    }

    #[tokio::test]
    async fn zero_size_is_a_start_error() {
        let repo = lesson_repo(2).await;
        let svc = service(&repo, Arc::new(offline(&repo)));
        let err = svc
            .start_lesson_session(CourseId::new(1), LessonId::new(1), PracticeMode::Mixed, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, PracticeError::Start(_)));
    }

    #[tokio::test]
    async fn failed_submission_keeps_results_and_retries_once() {
        let repo = lesson_repo(3).await;
        let flaky = Arc::new(FlakyScheduling {
            inner: offline(&repo),
            failures: AtomicUsize::new(1),
            calls: AtomicUsize::new(0),
        });
        let svc = service(&repo, flaky.clone());

        let mut practice = svc
            .start_lesson_session(
                CourseId::new(1),
                LessonId::new(1),
                PracticeMode::Single(QuestionType::Listening),
                3,
            )
            .await
            .unwrap();

        for _ in 0..2 {
            let q = practice.current_question().unwrap().clone();
            svc.answer(&mut practice, q.id(), q.correct_answer());
            svc.advance(&mut practice).await.unwrap();
        }
        let err = svc.advance(&mut practice).await.unwrap_err();
        assert!(matches!(err, PracticeError::SubmissionFailed(_)));
        assert!(practice.is_complete());
        assert_eq!(practice.session().correct_answers(), 2);
        assert!(practice.submission().is_none());
        assert!(svc.history().await.unwrap().is_empty());

        let report = svc.finalize(&mut practice).await.unwrap();
        assert_eq!(report.points, 2);
        assert_eq!(report.records.len(), 2);

        let again = svc.finalize(&mut practice).await.unwrap();
        assert_eq!(again, report);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
        assert_eq!(svc.history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn abandoned_session_is_never_submitted() {
        let repo = lesson_repo(3).await;
        let svc = service(&repo, Arc::new(offline(&repo)));
        let mut practice = svc
            .start_lesson_session(CourseId::new(1), LessonId::new(1), PracticeMode::Mixed, 3)
            .await
            .unwrap();
        let q = practice.current_question().unwrap().clone();
        svc.answer(&mut practice, q.id(), q.correct_answer());
        svc.save_progress(&practice).await.unwrap();

        assert!(svc.abandon(&mut practice).await.unwrap().is_applied());
        assert!(matches!(
            svc.finalize(&mut practice).await,
            Err(PracticeError::Abandoned)
        ));
        assert!(svc.resume().await.unwrap().is_none());
        let records = repo
            .get_records(&[WordId::new(1), WordId::new(2), WordId::new(3)])
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn finalize_requires_completion() {
        let repo = lesson_repo(2).await;
        let svc = service(&repo, Arc::new(offline(&repo)));
        let mut practice = svc
            .start_lesson_session(CourseId::new(1), LessonId::new(1), PracticeMode::Mixed, 2)
            .await
            .unwrap();
        assert!(matches!(
            svc.finalize(&mut practice).await,
            Err(PracticeError::NotCompleted)
        ));
    }

    #[tokio::test]
    async fn resume_continues_where_it_left_off() {
        let repo = lesson_repo(4).await;
        let svc = service(&repo, Arc::new(offline(&repo)));
        let mut practice = svc
            .start_lesson_session(CourseId::new(1), LessonId::new(1), PracticeMode::Mixed, 4)
            .await
            .unwrap();
        let q = practice.current_question().unwrap().clone();
        svc.answer(&mut practice, q.id(), "wrong");
        svc.advance(&mut practice).await.unwrap();
        svc.save_progress(&practice).await.unwrap();

        let mut resumed = svc.resume().await.unwrap().unwrap();
        assert_eq!(resumed.session(), practice.session());
        assert_eq!(resumed.context(), SubmissionContext::Lesson);

        answer_all(&svc, &mut resumed).await;
        assert!(resumed.submission().is_some());
        assert!(svc.resume().await.unwrap().is_none());

        let history = svc.history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].session_id, resumed.session().id());
        assert_eq!(history[0].answered(), 4);
    }

    #[tokio::test]
    async fn history_is_capped() {
        let repo = lesson_repo(1).await;
        let svc = service(&repo, Arc::new(offline(&repo))).with_history_limit(2);
        for _ in 0..3 {
            let mut practice = svc
                .start_lesson_session(CourseId::new(1), LessonId::new(1), PracticeMode::Mixed, 1)
                .await
                .unwrap();
            answer_all(&svc, &mut practice).await;
        }
        assert_eq!(svc.history().await.unwrap().len(), 2);
    }
}
