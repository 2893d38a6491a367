use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{QuestionId, SessionId};
use crate::model::question::{PracticeMode, Question};
use crate::model::review::ReviewAttempt;

/// Hearts a learner starts every session with.
pub const MAX_HEARTS: u32 = 5;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SnapshotError {
    #[error("session snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("session snapshot violates an invariant: {0}")]
    Invalid(&'static str),
}

//
// ─── STATE ────────────────────────────────────────────────────────────────────
//

/// Lifecycle of a practice session.
///
/// `Created → InProgress → Completed`, with `Abandoned` as a caller-triggered
/// exit from `InProgress`. `Completed` and `Abandoned` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    InProgress,
    Completed,
    Abandoned,
}

impl SessionState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Created => "created",
            SessionState::InProgress => "in_progress",
            SessionState::Completed => "completed",
            SessionState::Abandoned => "abandoned",
        }
    }
}

/// A single recorded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: QuestionId,
    pub user_answer: String,
    pub is_correct: bool,
    pub timestamp: DateTime<Utc>,
}

//
// ─── SESSION ──────────────────────────────────────────────────────────────────
//

/// Serializable state of one practice session.
///
/// Mutated only through `SessionEngine`; this type exposes read access and the
/// snapshot round trip used to persist an unfinished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub(crate) id: SessionId,
    pub(crate) mode: PracticeMode,
    pub(crate) state: SessionState,
    pub(crate) questions: Vec<Question>,
    pub(crate) current_index: usize,
    pub(crate) correct_answers: u32,
    pub(crate) incorrect_answers: u32,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) ended_at: Option<DateTime<Utc>>,
    pub(crate) completed: bool,
    pub(crate) results: Vec<AnswerRecord>,
    pub(crate) streak: u32,
    pub(crate) best_streak: u32,
}

impl Session {
    pub(crate) fn created(id: SessionId, at: DateTime<Utc>) -> Self {
        Self {
            id,
            mode: PracticeMode::Mixed,
            state: SessionState::Created,
            questions: Vec::new(),
            current_index: 0,
            correct_answers: 0,
            incorrect_answers: 0,
            started_at: at,
            ended_at: None,
            completed: false,
            results: Vec::new(),
            streak: 0,
            best_streak: 0,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn mode(&self) -> PracticeMode {
        self.mode
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    #[must_use]
    pub fn incorrect_answers(&self) -> u32 {
        self.incorrect_answers
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn results(&self) -> &[AnswerRecord] {
        &self.results
    }

    /// Consecutive correct answers, reset by any incorrect answer.
    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn best_streak(&self) -> u32 {
        self.best_streak
    }

    /// Informational lives counter; reaching zero does not end the session.
    #[must_use]
    pub fn hearts(&self) -> u32 {
        MAX_HEARTS.saturating_sub(self.incorrect_answers)
    }

    #[must_use]
    pub fn has_result_for(&self, question_id: QuestionId) -> bool {
        self.results.iter().any(|r| r.question_id == question_id)
    }

    /// Questions already passed without an answer being recorded.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        let answered: HashSet<QuestionId> = self.results.iter().map(|r| r.question_id).collect();
        self.questions
            .iter()
            .take(self.current_index)
            .filter(|q| !answered.contains(&q.id()))
            .count()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.questions.len().saturating_sub(self.current_index)
    }

    /// Per-word outcomes of every recorded answer, in answer order.
    ///
    /// Skipped questions contribute nothing.
    #[must_use]
    pub fn attempts(&self) -> Vec<ReviewAttempt> {
        self.results
            .iter()
            .filter_map(|result| {
                self.questions
                    .iter()
                    .find(|q| q.id() == result.question_id)
                    .map(|q| ReviewAttempt::new(q.word().id(), result.is_correct))
            })
            .collect()
    }

    /// Serialize this session for an external persistence collaborator.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::Json` if serialization fails.
    pub fn to_snapshot(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restore a session from a snapshot, checking its invariants.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::Json` for malformed input and
    /// `SnapshotError::Invalid` when the decoded state is inconsistent.
    pub fn from_snapshot(snapshot: &str) -> Result<Self, SnapshotError> {
        let session: Session = serde_json::from_str(snapshot)?;
        session.validate()?;
        Ok(session)
    }

    pub(crate) fn validate(&self) -> Result<(), SnapshotError> {
        if self.current_index > self.questions.len() {
            return Err(SnapshotError::Invalid("current index past the last question"));
        }

        let mut seen = HashSet::with_capacity(self.results.len());
        for result in &self.results {
            if !seen.insert(result.question_id) {
                return Err(SnapshotError::Invalid("duplicate result for a question"));
            }
            if !self.questions.iter().any(|q| q.id() == result.question_id) {
                return Err(SnapshotError::Invalid("result for an unknown question"));
            }
        }

        let correct = self.results.iter().filter(|r| r.is_correct).count();
        let incorrect = self.results.len() - correct;
        if usize::try_from(self.correct_answers).ok() != Some(correct)
            || usize::try_from(self.incorrect_answers).ok() != Some(incorrect)
        {
            return Err(SnapshotError::Invalid("answer counts disagree with results"));
        }

        if self.completed != self.ended_at.is_some() {
            return Err(SnapshotError::Invalid("completed flag disagrees with end time"));
        }
        if self.completed != (self.state == SessionState::Completed) {
            return Err(SnapshotError::Invalid("completed flag disagrees with state"));
        }
        if self.state == SessionState::Completed && self.current_index != self.questions.len() {
            return Err(SnapshotError::Invalid("completed session has unvisited questions"));
        }
        if self.state != SessionState::Created && self.questions.is_empty() {
            return Err(SnapshotError::Invalid("started session has no questions"));
        }
        if self.streak > self.best_streak {
            return Err(SnapshotError::Invalid("streak exceeds best streak"));
        }

        Ok(())
    }
}
