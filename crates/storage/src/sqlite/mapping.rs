use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use vocab_core::model::{
    Achievements, CefrLevel, MasteryLevel, PracticeMode, QuestionType, ReviewRecord, SessionId,
    SessionSummary, Word, WordId,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Foreign key violations mean a referenced word is missing.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_foreign_key_violation() {
            return StorageError::NotFound;
        }
    }
    conn(e)
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn word_id_from_i64(v: i64) -> Result<WordId, StorageError> {
    Ok(WordId::new(i64_to_u64("word_id", v)?))
}

pub(crate) fn map_word_row(row: &SqliteRow) -> Result<Word, StorageError> {
    let id = word_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let text: String = row.try_get("text").map_err(ser)?;
    let definition: String = row.try_get("definition").map_err(ser)?;

    let mut word = Word::new(id, text, definition).map_err(ser)?;
    if let Some(example) = row.try_get::<Option<String>, _>("example").map_err(ser)? {
        word = word.with_example(example);
    }
    if let Some(pos) = row
        .try_get::<Option<String>, _>("part_of_speech")
        .map_err(ser)?
    {
        word = word.with_part_of_speech(pos);
    }
    if let Some(audio) = row.try_get::<Option<String>, _>("audio").map_err(ser)? {
        word = word.with_audio(audio);
    }
    if let Some(cefr) = row.try_get::<Option<String>, _>("cefr").map_err(ser)? {
        word = word.with_cefr(cefr.parse::<CefrLevel>().map_err(ser)?);
    }
    Ok(word)
}

pub(crate) fn map_record_row(row: &SqliteRow) -> Result<ReviewRecord, StorageError> {
    let level_raw: i64 = row.try_get("level").map_err(ser)?;
    let level = u8::try_from(level_raw)
        .map_err(|_| StorageError::Serialization(format!("invalid level: {level_raw}")))
        .and_then(|v| MasteryLevel::new(v).map_err(ser))?;

    Ok(ReviewRecord {
        word_id: word_id_from_i64(row.try_get::<i64, _>("word_id").map_err(ser)?)?,
        level,
        next_review_at: row.try_get("next_review_at").map_err(ser)?,
        last_reviewed_at: row.try_get("last_reviewed_at").map_err(ser)?,
        streak: u32_from_i64("streak", row.try_get::<i64, _>("streak").map_err(ser)?)?,
    })
}

pub(crate) fn question_types_to_json(types: &[QuestionType]) -> Result<String, StorageError> {
    serde_json::to_string(types).map_err(ser)
}

pub(crate) fn map_summary_row(row: &SqliteRow) -> Result<SessionSummary, StorageError> {
    let session_id: SessionId = row
        .try_get::<String, _>("session_id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let mode: PracticeMode = row
        .try_get::<String, _>("mode")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let question_types: Vec<QuestionType> =
        serde_json::from_str(&row.try_get::<String, _>("question_types").map_err(ser)?)
            .map_err(ser)?;

    let score_raw: i64 = row.try_get("score").map_err(ser)?;
    let score = u8::try_from(score_raw)
        .map_err(|_| StorageError::Serialization(format!("invalid score: {score_raw}")))?;
    let time_spent_secs = i64_to_u64(
        "time_spent_secs",
        row.try_get::<i64, _>("time_spent_secs").map_err(ser)?,
    )?;

    Ok(SessionSummary {
        session_id,
        mode,
        started_at: row.try_get("started_at").map_err(ser)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
        score,
        total_questions: u32_from_i64(
            "total_questions",
            row.try_get::<i64, _>("total_questions").map_err(ser)?,
        )?,
        correct_answers: u32_from_i64(
            "correct_answers",
            row.try_get::<i64, _>("correct_answers").map_err(ser)?,
        )?,
        incorrect_answers: u32_from_i64(
            "incorrect_answers",
            row.try_get::<i64, _>("incorrect_answers").map_err(ser)?,
        )?,
        time_spent_secs,
        question_types,
        achievements: Achievements {
            high_scorer: row.try_get("high_scorer").map_err(ser)?,
            speed_demon: row.try_get("speed_demon").map_err(ser)?,
            perfect_streak: row.try_get("perfect_streak").map_err(ser)?,
        },
    })
}
