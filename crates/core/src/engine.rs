//! Practice session state machine.
//!
//! `SessionEngine` owns one `Session` value and is the only thing that mutates
//! it. Out-of-order UI events (a second click on "check", an answer for a
//! question that is no longer current, anything after completion) are ignored
//! and reported through `Transition::Ignored` instead of failing.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::factory::{FactoryError, QuestionFactory};
use crate::model::{
    AnswerRecord, PracticeMode, QuestionId, Session, SessionId, SessionState, SnapshotError, Word,
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStartError {
    #[error("no words available to build a session")]
    DataUnavailable,
    #[error("session size must be at least 1")]
    EmptyWindow,
    #[error("session already started (state: {})", .0.as_str())]
    AlreadyStarted(SessionState),
}

impl From<FactoryError> for SessionStartError {
    fn from(err: FactoryError) -> Self {
        match err {
            FactoryError::EmptyPool => SessionStartError::DataUnavailable,
        }
    }
}

//
// ─── TRANSITIONS ───────────────────────────────────────────────────────────────
//

/// Why a mutating call left the session untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredReason {
    NotInProgress(SessionState),
    QuestionMismatch {
        expected: Option<QuestionId>,
        received: QuestionId,
    },
    AlreadyAnswered(QuestionId),
}

/// Outcome of `answer`, `advance`, `skip` or `abandon`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// The call moved past the last question.
    Completed,
    Ignored(IgnoredReason),
}

impl Transition {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        !matches!(self, Transition::Ignored(_))
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Transition::Completed)
    }
}

/// Read-only view of how far a session has come.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub total: usize,
    pub answered: usize,
    pub skipped: usize,
    pub remaining: usize,
    pub streak: u32,
    pub best_streak: u32,
    pub hearts: u32,
    pub is_complete: bool,
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
pub struct SessionEngine {
    session: Session,
}

impl SessionEngine {
    /// A fresh engine in the `Created` state.
    #[must_use]
    pub fn new(id: SessionId, now: DateTime<Utc>) -> Self {
        Self {
            session: Session::created(id, now),
        }
    }

    /// Resume an engine from an existing session value.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::Invalid` if the session breaks an invariant.
    pub fn from_session(session: Session) -> Result<Self, SnapshotError> {
        session.validate()?;
        Ok(Self { session })
    }

    /// Resume an engine from a JSON snapshot.
    ///
    /// # Errors
    ///
    /// See [`Session::from_snapshot`].
    pub fn from_snapshot(snapshot: &str) -> Result<Self, SnapshotError> {
        Ok(Self {
            session: Session::from_snapshot(snapshot)?,
        })
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn into_session(self) -> Session {
        self.session
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session.state
    }

    /// Build the questions and move to `InProgress`.
    ///
    /// Takes `min(size, words.len())` words from `words`; all of `words` serve
    /// as the distractor pool. Mixed mode cycles through the five classic
    /// question types in order.
    ///
    /// # Errors
    ///
    /// - `DataUnavailable` if `words` is empty.
    /// - `EmptyWindow` if `size` is zero.
    /// - `AlreadyStarted` if the session has left `Created`.
    ///
    /// The session is left in `Created` on error.
    pub fn start<R: Rng>(
        &mut self,
        words: &[Word],
        mode: PracticeMode,
        size: usize,
        factory: &mut QuestionFactory<R>,
        now: DateTime<Utc>,
    ) -> Result<(), SessionStartError> {
        if self.session.state != SessionState::Created {
            return Err(SessionStartError::AlreadyStarted(self.session.state));
        }
        if words.is_empty() {
            return Err(SessionStartError::DataUnavailable);
        }
        if size == 0 {
            return Err(SessionStartError::EmptyWindow);
        }

        let window = factory.choose_window(words, size);
        factory.restart_numbering();
        let questions = window
            .iter()
            .enumerate()
            .map(|(i, word)| factory.build(word, mode.type_at(i), words))
            .collect::<Result<Vec<_>, _>>()?;

        let s = &mut self.session;
        s.mode = mode;
        s.questions = questions;
        s.current_index = 0;
        s.correct_answers = 0;
        s.incorrect_answers = 0;
        s.results.clear();
        s.streak = 0;
        s.best_streak = 0;
        s.started_at = now;
        s.ended_at = None;
        s.completed = false;
        s.state = SessionState::InProgress;

        debug!(
            session_id = %s.id,
            mode = %mode,
            questions = s.questions.len(),
            "session started"
        );
        Ok(())
    }

    /// Record an answer for the current question without moving on.
    pub fn answer(
        &mut self,
        question_id: QuestionId,
        answer: &str,
        now: DateTime<Utc>,
    ) -> Transition {
        if let Some(reason) = self.check_in_progress() {
            return self.ignore("answer", reason);
        }

        let Some(current) = self.session.current_question() else {
            return self.ignore(
                "answer",
                IgnoredReason::QuestionMismatch {
                    expected: None,
                    received: question_id,
                },
            );
        };
        if current.id() != question_id {
            let expected = Some(current.id());
            return self.ignore(
                "answer",
                IgnoredReason::QuestionMismatch {
                    expected,
                    received: question_id,
                },
            );
        }
        if self.session.has_result_for(question_id) {
            return self.ignore("answer", IgnoredReason::AlreadyAnswered(question_id));
        }

        let is_correct = current.is_correct(answer);
        let s = &mut self.session;
        s.results.push(AnswerRecord {
            question_id,
            user_answer: answer.to_owned(),
            is_correct,
            timestamp: now,
        });
        if is_correct {
            s.correct_answers += 1;
            s.streak += 1;
            s.best_streak = s.best_streak.max(s.streak);
        } else {
            s.incorrect_answers += 1;
            s.streak = 0;
        }

        debug!(
            session_id = %s.id,
            question_id = %question_id,
            is_correct,
            "answer recorded"
        );
        Transition::Applied
    }

    /// Move to the next question, completing the session after the last one.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Transition {
        if let Some(reason) = self.check_in_progress() {
            return self.ignore("advance", reason);
        }
        self.step(now)
    }

    /// Move on without recording a result for the current question.
    pub fn skip(&mut self, now: DateTime<Utc>) -> Transition {
        if let Some(reason) = self.check_in_progress() {
            return self.ignore("skip", reason);
        }
        if let Some(question) = self.session.current_question()
            && !self.session.has_result_for(question.id())
        {
            debug!(
                session_id = %self.session.id,
                question_id = %question.id(),
                "question skipped"
            );
        }
        self.step(now)
    }

    /// Leave an in-progress session. Abandoned sessions are never scheduled.
    pub fn abandon(&mut self) -> Transition {
        if let Some(reason) = self.check_in_progress() {
            return self.ignore("abandon", reason);
        }
        self.session.state = SessionState::Abandoned;
        debug!(session_id = %self.session.id, "session abandoned");
        Transition::Applied
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        let s = &self.session;
        Progress {
            total: s.questions.len(),
            answered: s.results.len(),
            skipped: s.skipped_count(),
            remaining: s.remaining(),
            streak: s.streak,
            best_streak: s.best_streak,
            hearts: s.hearts(),
            is_complete: s.completed,
        }
    }

    /// The most recent answer, for showing feedback between answer and advance.
    #[must_use]
    pub fn last_result(&self) -> Option<&AnswerRecord> {
        self.session.results.last()
    }

    fn step(&mut self, now: DateTime<Utc>) -> Transition {
        let s = &mut self.session;
        s.current_index += 1;
        if s.current_index < s.questions.len() {
            return Transition::Applied;
        }

        s.current_index = s.questions.len();
        s.ended_at = Some(now);
        s.completed = true;
        s.state = SessionState::Completed;
        debug!(
            session_id = %s.id,
            correct = s.correct_answers,
            incorrect = s.incorrect_answers,
            "session completed"
        );
        Transition::Completed
    }

    fn check_in_progress(&self) -> Option<IgnoredReason> {
        match self.session.state {
            SessionState::InProgress => None,
            other => Some(IgnoredReason::NotInProgress(other)),
        }
    }

    fn ignore(&self, operation: &'static str, reason: IgnoredReason) -> Transition {
        debug!(
            session_id = %self.session.id,
            operation,
            ?reason,
            "transition ignored"
        );
        Transition::Ignored(reason)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
