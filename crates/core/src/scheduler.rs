//! Reference spaced-repetition rule.
//!
//! Every function here is pure: callers pass `now` and the current records, and
//! get new records back. The offline scheduling boundary is built on top of it,
//! and it doubles as the parity oracle for any remote implementation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::{MasteryLevel, ReviewAttempt, ReviewRecord, SubmissionContext, WordId};

/// Review interval in days for levels 1 through 5.
pub const INTERVAL_DAYS: [i64; 5] = [1, 3, 7, 14, 30];

/// Upper bound for `ReviewRecord::streak`.
pub const MAX_RECORD_STREAK: u32 = 10;

/// Slack added to the earliest pending review when collecting review-ready words.
pub const DUE_GRACE_MINUTES: i64 = 60;

//
// ─── INTERVALS ─────────────────────────────────────────────────────────────────
//

#[must_use]
pub fn interval(level: MasteryLevel) -> Duration {
    let index = usize::from(level.value().saturating_sub(1)).min(INTERVAL_DAYS.len() - 1);
    Duration::days(INTERVAL_DAYS[index])
}

#[must_use]
pub fn next_review_at(level: MasteryLevel, now: DateTime<Utc>) -> DateTime<Utc> {
    now + interval(level)
}

/// Level after one attempt: up one on success, down one on failure, clamped to 1..=5.
#[must_use]
pub fn transition(level: MasteryLevel, is_correct: bool) -> MasteryLevel {
    if is_correct {
        level.promoted()
    } else {
        level.demoted()
    }
}

//
// ─── RECORD UPDATES ────────────────────────────────────────────────────────────
//

/// Record for a word entering review for the first time.
#[must_use]
pub fn first_record(word_id: WordId, now: DateTime<Utc>) -> ReviewRecord {
    ReviewRecord {
        word_id,
        level: MasteryLevel::MIN,
        next_review_at: next_review_at(MasteryLevel::MIN, now),
        last_reviewed_at: now,
        streak: 0,
    }
}

/// A record after one scheduling step, with the points it earned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedReview {
    pub record: ReviewRecord,
    pub points: u32,
}

/// Apply one review attempt.
///
/// A word without a record starts from a fresh level-1 record. Correct answers
/// earn the level held before the attempt as points.
#[must_use]
pub fn apply_attempt(
    current: Option<&ReviewRecord>,
    attempt: ReviewAttempt,
    now: DateTime<Utc>,
) -> AppliedReview {
    let base = current
        .cloned()
        .unwrap_or_else(|| first_record(attempt.word_id, now));

    let level = transition(base.level, attempt.is_correct);
    let streak = if attempt.is_correct {
        (base.streak + 1).min(MAX_RECORD_STREAK)
    } else {
        0
    };
    let points = if attempt.is_correct {
        u32::from(base.level.value())
    } else {
        0
    };

    AppliedReview {
        record: ReviewRecord {
            word_id: attempt.word_id,
            level,
            next_review_at: next_review_at(level, now),
            last_reviewed_at: now,
            streak,
        },
        points,
    }
}

/// First pass over a lesson word: the word (re)starts at level 1 for one point.
#[must_use]
pub fn apply_lesson(word_id: WordId, now: DateTime<Utc>) -> AppliedReview {
    AppliedReview {
        record: first_record(word_id, now),
        points: 1,
    }
}

/// Updated records and earned points for one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReport {
    pub records: Vec<ReviewRecord>,
    pub points: u32,
}

/// Apply a whole submission against the current records.
///
/// Attempts are applied in order; a word attempted twice sees the result of
/// its earlier attempt. The report holds one record per distinct word, in
/// first-seen order.
#[must_use]
pub fn apply_submission(
    context: SubmissionContext,
    current: &HashMap<WordId, ReviewRecord>,
    attempts: &[ReviewAttempt],
    now: DateTime<Utc>,
) -> SubmissionReport {
    let mut order: Vec<WordId> = Vec::new();
    let mut updated: HashMap<WordId, ReviewRecord> = HashMap::new();
    let mut points = 0u32;

    for attempt in attempts {
        let seen = updated.contains_key(&attempt.word_id);
        let applied = match context {
            SubmissionContext::Lesson if seen => continue,
            SubmissionContext::Lesson => apply_lesson(attempt.word_id, now),
            SubmissionContext::Review => {
                let prior = updated
                    .get(&attempt.word_id)
                    .or_else(|| current.get(&attempt.word_id));
                apply_attempt(prior, *attempt, now)
            }
        };

        if !seen {
            order.push(attempt.word_id);
        }
        points = points.saturating_add(applied.points);
        updated.insert(attempt.word_id, applied.record);
    }

    let records = order
        .into_iter()
        .filter_map(|id| updated.remove(&id))
        .collect();

    SubmissionReport { records, points }
}

//
// ─── DUE WORDS ─────────────────────────────────────────────────────────────────
//

/// Latest `next_review_at` still counted as review-ready.
///
/// The earliest pending review plus the grace window, but never before `now`.
/// `None` when there are no records.
#[must_use]
pub fn review_cutoff(records: &[ReviewRecord], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let earliest = records.iter().map(|r| r.next_review_at).min()?;
    Some(cutoff_after(earliest, now))
}

/// Cutoff for a known earliest `next_review_at`, for stores that compute the minimum themselves.
#[must_use]
pub fn cutoff_after(earliest: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    (earliest + Duration::minutes(DUE_GRACE_MINUTES)).max(now)
}

/// Review-ready word ids, soonest first, at most `limit` of them.
#[must_use]
pub fn select_due(records: &[ReviewRecord], now: DateTime<Utc>, limit: usize) -> Vec<WordId> {
    let Some(cutoff) = review_cutoff(records, now) else {
        return Vec::new();
    };

    let mut ready: Vec<&ReviewRecord> = records
        .iter()
        .filter(|r| r.next_review_at <= cutoff)
        .collect();
    ready.sort_by_key(|r| (r.next_review_at, r.word_id));
    ready.into_iter().take(limit).map(|r| r.word_id).collect()
}

//
// ─── COUNTDOWN ─────────────────────────────────────────────────────────────────
//

/// Time left until a review, split for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewCountdown {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl ReviewCountdown {
    #[must_use]
    pub fn is_due(&self) -> bool {
        self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }
}

#[must_use]
pub fn time_until(next: DateTime<Utc>, now: DateTime<Utc>) -> ReviewCountdown {
    let total = crate::time::whole_seconds_between(now, next);
    ReviewCountdown {
        hours: total / 3600,
        minutes: (total % 3600) / 60,
        seconds: total % 60,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
