use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::WordId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors that can occur when building review state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReviewError {
    #[error("mastery level must be between 1 and 5, got {0}")]
    InvalidLevel(u8),
}

//
// ─── MASTERY LEVEL ────────────────────────────────────────────────────────────
//

/// How well a word is retained, from 1 (new) to 5 (mastered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct MasteryLevel(u8);

impl MasteryLevel {
    pub const MIN: MasteryLevel = MasteryLevel(1);
    pub const MAX: MasteryLevel = MasteryLevel(5);

    /// # Errors
    ///
    /// Returns `ReviewError::InvalidLevel` if `value` is outside `1..=5`.
    pub fn new(value: u8) -> Result<Self, ReviewError> {
        if (Self::MIN.0..=Self::MAX.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ReviewError::InvalidLevel(value))
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// One level up, saturating at 5.
    #[must_use]
    pub fn promoted(self) -> Self {
        Self((self.0 + 1).min(Self::MAX.0))
    }

    /// One level down, saturating at 1.
    #[must_use]
    pub fn demoted(self) -> Self {
        Self(self.0.saturating_sub(1).max(Self::MIN.0))
    }
}

impl Default for MasteryLevel {
    fn default() -> Self {
        Self::MIN
    }
}

impl TryFrom<u8> for MasteryLevel {
    type Error = ReviewError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MasteryLevel> for u8 {
    fn from(level: MasteryLevel) -> Self {
        level.0
    }
}

impl fmt::Display for MasteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── REVIEW RECORD ────────────────────────────────────────────────────────────
//

/// Per-word spaced-repetition state.
///
/// Created at level 1 the first time a word is saved for review and only
/// changed by the scheduler after a submitted attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub word_id: WordId,
    pub level: MasteryLevel,
    pub next_review_at: DateTime<Utc>,
    pub last_reviewed_at: DateTime<Utc>,
    pub streak: u32,
}

impl ReviewRecord {
    #[must_use]
    pub fn is_due(&self, at: DateTime<Utc>) -> bool {
        self.next_review_at <= at
    }
}

//
// ─── ATTEMPTS ─────────────────────────────────────────────────────────────────
//

/// Outcome of one answered question, as forwarded to the scheduling boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewAttempt {
    pub word_id: WordId,
    pub is_correct: bool,
}

impl ReviewAttempt {
    #[must_use]
    pub fn new(word_id: WordId, is_correct: bool) -> Self {
        Self {
            word_id,
            is_correct,
        }
    }
}

/// Where the attempts of a session came from.
///
/// `Lesson` is a first pass over course words and (re)starts every word at
/// level 1; `Review` applies the level transition rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionContext {
    Review,
    Lesson,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn level_rejects_out_of_range_values() {
        assert!(MasteryLevel::new(0).is_err());
        assert!(MasteryLevel::new(6).is_err());
        assert_eq!(MasteryLevel::new(3).unwrap().value(), 3);
    }

    #[test]
    fn level_saturates_at_bounds() {
        assert_eq!(MasteryLevel::MAX.promoted(), MasteryLevel::MAX);
        assert_eq!(MasteryLevel::MIN.demoted(), MasteryLevel::MIN);
        assert_eq!(MasteryLevel::new(2).unwrap().promoted().value(), 3);
        assert_eq!(MasteryLevel::new(2).unwrap().demoted().value(), 1);
    }

    #[test]
    fn level_deserialization_validates_range() {
        assert!(serde_json::from_str::<MasteryLevel>("7").is_err());
        assert_eq!(
            serde_json::from_str::<MasteryLevel>("4").unwrap(),
            MasteryLevel::new(4).unwrap()
        );
    }

    #[test]
    fn record_due_check_is_inclusive() {
        let now = fixed_now();
        let record = ReviewRecord {
            word_id: WordId::new(1),
            level: MasteryLevel::MIN,
            next_review_at: now,
            last_reviewed_at: now,
            streak: 0,
        };
        assert!(record.is_due(now));
        assert!(!record.is_due(now - chrono::Duration::seconds(1)));
    }
}
