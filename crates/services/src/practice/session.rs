use serde::{Deserialize, Serialize};
use std::fmt;
use vocab_core::model::{
    AnswerRecord, Question, Session, SessionState, SessionSummary, SnapshotError, SubmissionContext,
    SummaryError,
};
use vocab_core::{Progress, SessionEngine, SubmissionReport};

/// A running practice session together with how its results will be submitted.
///
/// Owned by the caller; `PracticeLoopService` drives it and records what has
/// already been submitted so a retry never applies attempts twice.
#[derive(Clone)]
pub struct PracticeSession {
    pub(crate) engine: SessionEngine,
    context: SubmissionContext,
    pub(crate) submission: Option<SubmissionReport>,
    pub(crate) history_saved: bool,
}

/// Persisted shape of an unfinished session.
#[derive(Serialize, Deserialize)]
struct SavedPractice {
    context: SubmissionContext,
    session: Session,
}

impl PracticeSession {
    pub(crate) fn new(engine: SessionEngine, context: SubmissionContext) -> Self {
        Self {
            engine,
            context,
            submission: None,
            history_saved: false,
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        self.engine.session()
    }

    #[must_use]
    pub fn context(&self) -> SubmissionContext {
        self.context
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.engine.state()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.engine.session().current_question()
    }

    /// Most recently recorded answer.
    #[must_use]
    pub fn last_result(&self) -> Option<&AnswerRecord> {
        self.engine.last_result()
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        self.engine.progress()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.engine.session().is_completed()
    }

    /// Report from the scheduling boundary, once submission has succeeded.
    #[must_use]
    pub fn submission(&self) -> Option<&SubmissionReport> {
        self.submission.as_ref()
    }

    /// # Errors
    ///
    /// Returns `SummaryError::NotCompleted` until the session is completed.
    pub fn summary(&self) -> Result<SessionSummary, SummaryError> {
        SessionSummary::from_session(self.engine.session())
    }

    pub(crate) fn to_snapshot(&self) -> Result<String, SnapshotError> {
        let saved = SavedPractice {
            context: self.context,
            session: self.engine.session().clone(),
        };
        Ok(serde_json::to_string(&saved)?)
    }

    pub(crate) fn from_snapshot(snapshot: &str) -> Result<Self, SnapshotError> {
        let saved: SavedPractice = serde_json::from_str(snapshot)?;
        let engine = SessionEngine::from_session(saved.session)?;
        Ok(Self::new(engine, saved.context))
    }
}

impl fmt::Debug for PracticeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.engine.session();
        f.debug_struct("PracticeSession")
            .field("id", &session.id())
            .field("state", &session.state())
            .field("context", &self.context)
            .field("questions_len", &session.questions().len())
            .field("current", &session.current_index())
            .field("submitted", &self.submission.is_some())
            .field("history_saved", &self.history_saved)
            .finish_non_exhaustive()
    }
}
