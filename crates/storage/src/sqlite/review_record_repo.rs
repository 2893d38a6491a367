use vocab_core::model::{ReviewRecord, WordId};

use super::{
    SqliteRepository,
    mapping::{conn, id_i64, map_record_row, write_err},
};
use crate::repository::{ReviewRecordRepository, StorageError};

#[async_trait::async_trait]
impl ReviewRecordRepository for SqliteRepository {
    async fn get_records(&self, word_ids: &[WordId]) -> Result<Vec<ReviewRecord>, StorageError> {
        if word_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            r"
                SELECT word_id, level, next_review_at, last_reviewed_at, streak
                FROM review_records
                WHERE word_id IN (
            ",
        );
        for i in 0..word_ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push_str(")\n ORDER BY next_review_at ASC, word_id ASC");

        let mut query = sqlx::query(&sql);
        for id in word_ids {
            query = query.bind(id_i64("word_id", id.value())?);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;
        rows.iter().map(map_record_row).collect()
    }

    async fn next_record(&self) -> Result<Option<ReviewRecord>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT word_id, level, next_review_at, last_reviewed_at, streak
                FROM review_records
                ORDER BY next_review_at ASC, word_id ASC
                LIMIT 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_record_row).transpose()
    }

    async fn upsert_records(&self, records: &[ReviewRecord]) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        for record in records {
            sqlx::query(
                r"
                    INSERT INTO review_records (
                        word_id, level, next_review_at, last_reviewed_at, streak
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(word_id) DO UPDATE SET
                        level = excluded.level,
                        next_review_at = excluded.next_review_at,
                        last_reviewed_at = excluded.last_reviewed_at,
                        streak = excluded.streak
                ",
            )
            .bind(id_i64("word_id", record.word_id.value())?)
            .bind(i64::from(record.level.value()))
            .bind(record.next_review_at)
            .bind(record.last_reviewed_at)
            .bind(i64::from(record.streak))
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
