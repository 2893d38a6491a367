//! Score, elapsed time and achievement flags for a session.

use crate::model::{Achievements, Session};
use crate::time::whole_seconds_between;

pub const HIGH_SCORE_THRESHOLD: u8 = 80;
pub const SPEED_SECONDS_PER_QUESTION: u64 = 10;
pub const PERFECT_STREAK_MIN_CORRECT: u32 = 5;

/// Percentage of answered questions that were correct, rounded half away from zero.
///
/// Zero when nothing was answered. Skipped questions do not count.
#[must_use]
pub fn score(session: &Session) -> u8 {
    let correct = u64::from(session.correct_answers());
    let answered = correct + u64::from(session.incorrect_answers());
    if answered == 0 {
        return 0;
    }
    let pct = (correct * 200 + answered) / (answered * 2);
    u8::try_from(pct.min(100)).unwrap_or(100)
}

/// Whole seconds between start and end, or `None` while the session is open.
#[must_use]
pub fn time_spent(session: &Session) -> Option<u64> {
    session
        .ended_at()
        .map(|end| whole_seconds_between(session.started_at(), end))
}

#[must_use]
pub fn achievements(session: &Session) -> Achievements {
    let total = session.questions().len() as u64;
    let speed_demon = match time_spent(session) {
        Some(spent) if total > 0 => spent < SPEED_SECONDS_PER_QUESTION * total,
        _ => false,
    };

    Achievements {
        high_scorer: score(session) >= HIGH_SCORE_THRESHOLD,
        speed_demon,
        perfect_streak: session.correct_answers() >= PERFECT_STREAK_MIN_CORRECT
            && session.incorrect_answers() == 0,
    }
}
