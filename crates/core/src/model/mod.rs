mod ids;
mod question;
mod review;
mod session;
mod summary;
mod word;

pub use ids::{CourseId, LessonId, ParseIdError, QuestionId, SessionId, WordId};
pub use question::{
    BLANK, DRAG_DROP_COMPLETE, MATCHING_COMPLETE, MatchingPair, ParseModeError, PracticeMode,
    Question, QuestionPayload, QuestionType,
};
pub use review::{MasteryLevel, ReviewAttempt, ReviewError, ReviewRecord, SubmissionContext};
pub use session::{AnswerRecord, MAX_HEARTS, Session, SessionState, SnapshotError};
pub use summary::{Achievements, SessionSummary, SummaryError};
pub use word::{CefrLevel, Word, WordError};
