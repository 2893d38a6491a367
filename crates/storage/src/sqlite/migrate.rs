use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates words, lesson assignments, review records, session history and the
/// single-row active session table.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS words (
                    id INTEGER PRIMARY KEY,
                    text TEXT NOT NULL,
                    definition TEXT NOT NULL,
                    example TEXT,
                    part_of_speech TEXT,
                    audio TEXT,
                    cefr TEXT CHECK (cefr IN ('A1', 'A2', 'B1', 'B2', 'C1', 'C2'))
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS lesson_words (
                    course_id INTEGER NOT NULL,
                    lesson_id INTEGER NOT NULL,
                    word_id INTEGER NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    PRIMARY KEY (course_id, lesson_id, word_id),
                    FOREIGN KEY (word_id) REFERENCES words(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS review_records (
                    word_id INTEGER PRIMARY KEY,
                    level INTEGER NOT NULL CHECK (level BETWEEN 1 AND 5),
                    next_review_at TEXT NOT NULL,
                    last_reviewed_at TEXT NOT NULL,
                    streak INTEGER NOT NULL CHECK (streak >= 0),
                    FOREIGN KEY (word_id) REFERENCES words(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS session_history (
                    session_id TEXT PRIMARY KEY,
                    mode TEXT NOT NULL,
                    started_at TEXT NOT NULL,
                    completed_at TEXT NOT NULL,
                    score INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
                    total_questions INTEGER NOT NULL CHECK (total_questions >= 0),
                    correct_answers INTEGER NOT NULL CHECK (correct_answers >= 0),
                    incorrect_answers INTEGER NOT NULL CHECK (incorrect_answers >= 0),
                    time_spent_secs INTEGER NOT NULL CHECK (time_spent_secs >= 0),
                    question_types TEXT NOT NULL,
                    high_scorer INTEGER NOT NULL CHECK (high_scorer IN (0, 1)),
                    speed_demon INTEGER NOT NULL CHECK (speed_demon IN (0, 1)),
                    perfect_streak INTEGER NOT NULL CHECK (perfect_streak IN (0, 1))
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS active_session (
                    slot INTEGER PRIMARY KEY CHECK (slot = 1),
                    snapshot TEXT NOT NULL,
                    saved_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_review_records_next_review
                    ON review_records (next_review_at, word_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_lesson_words_position
                    ON lesson_words (course_id, lesson_id, position);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_session_history_completed
                    ON session_history (completed_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(version = 1, "applied sqlite migration");
    }

    Ok(())
}
