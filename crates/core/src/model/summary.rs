use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::SessionId;
use crate::model::question::{PracticeMode, QuestionType};
use crate::model::session::Session;
use crate::results;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SummaryError {
    #[error("session has not been completed")]
    NotCompleted,
}

/// Badges earned by a completed session. Flags are independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievements {
    pub high_scorer: bool,
    pub speed_demon: bool,
    pub perfect_streak: bool,
}

impl Achievements {
    #[must_use]
    pub fn any(&self) -> bool {
        self.high_scorer || self.speed_demon || self.perfect_streak
    }
}

/// History entry for a completed practice session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub mode: PracticeMode,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub score: u8,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub incorrect_answers: u32,
    pub time_spent_secs: u64,
    pub question_types: Vec<QuestionType>,
    pub achievements: Achievements,
}

impl SessionSummary {
    /// Build the summary of a completed session.
    ///
    /// # Errors
    ///
    /// Returns `SummaryError::NotCompleted` if the session has no end time.
    pub fn from_session(session: &Session) -> Result<Self, SummaryError> {
        let completed_at = session.ended_at().ok_or(SummaryError::NotCompleted)?;
        let time_spent_secs = results::time_spent(session).ok_or(SummaryError::NotCompleted)?;

        let mut question_types = Vec::new();
        for question in session.questions() {
            if !question_types.contains(&question.kind()) {
                question_types.push(question.kind());
            }
        }

        Ok(Self {
            session_id: session.id(),
            mode: session.mode(),
            started_at: session.started_at(),
            completed_at,
            score: results::score(session),
            total_questions: u32::try_from(session.questions().len()).unwrap_or(u32::MAX),
            correct_answers: session.correct_answers(),
            incorrect_answers: session.incorrect_answers(),
            time_spent_secs,
            question_types,
            achievements: results::achievements(session),
        })
    }

    /// Questions that received an answer; skipped ones are excluded.
    #[must_use]
    pub fn answered(&self) -> u32 {
        self.correct_answers + self.incorrect_answers
    }
}
