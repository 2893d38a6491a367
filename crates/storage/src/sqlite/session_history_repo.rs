use chrono::{DateTime, Utc};
use vocab_core::model::SessionSummary;

use super::{
    SqliteRepository,
    mapping::{conn, map_summary_row, question_types_to_json},
};
use crate::repository::{SessionSnapshotRepository, StorageError};

#[async_trait::async_trait]
impl SessionSnapshotRepository for SqliteRepository {
    async fn save_active(
        &self,
        snapshot: &str,
        saved_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO active_session (slot, snapshot, saved_at)
                VALUES (1, ?1, ?2)
                ON CONFLICT(slot) DO UPDATE SET
                    snapshot = excluded.snapshot,
                    saved_at = excluded.saved_at
            ",
        )
        .bind(snapshot)
        .bind(saved_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn load_active(&self) -> Result<Option<String>, StorageError> {
        sqlx::query_scalar("SELECT snapshot FROM active_session WHERE slot = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)
    }

    async fn clear_active(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM active_session")
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }

    async fn append_summary(&self, summary: &SessionSummary) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO session_history (
                    session_id, mode, started_at, completed_at, score,
                    total_questions, correct_answers, incorrect_answers, time_spent_secs,
                    question_types, high_scorer, speed_demon, perfect_streak
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                ON CONFLICT(session_id) DO NOTHING
            ",
        )
        .bind(summary.session_id.to_string())
        .bind(summary.mode.to_string())
        .bind(summary.started_at)
        .bind(summary.completed_at)
        .bind(i64::from(summary.score))
        .bind(i64::from(summary.total_questions))
        .bind(i64::from(summary.correct_answers))
        .bind(i64::from(summary.incorrect_answers))
        .bind(i64::try_from(summary.time_spent_secs).unwrap_or(i64::MAX))
        .bind(question_types_to_json(&summary.question_types)?)
        .bind(summary.achievements.high_scorer)
        .bind(summary.achievements.speed_demon)
        .bind(summary.achievements.perfect_streak)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn recent_summaries(&self, limit: u32) -> Result<Vec<SessionSummary>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    session_id, mode, started_at, completed_at, score,
                    total_questions, correct_answers, incorrect_answers, time_spent_secs,
                    question_types, high_scorer, speed_demon, perfect_streak
                FROM session_history
                ORDER BY completed_at DESC, session_id DESC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_summary_row).collect()
    }

    async fn prune_summaries(&self, keep: u32) -> Result<u64, StorageError> {
        let res = sqlx::query(
            r"
                DELETE FROM session_history
                WHERE session_id NOT IN (
                    SELECT session_id
                    FROM session_history
                    ORDER BY completed_at DESC, session_id DESC
                    LIMIT ?1
                )
            ",
        )
        .bind(i64::from(keep))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.rows_affected())
    }
}
