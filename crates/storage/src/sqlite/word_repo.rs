use chrono::{DateTime, Utc};
use vocab_core::model::{CourseId, LessonId, Word, WordId};
use vocab_core::scheduler;

use super::{
    SqliteRepository,
    mapping::{conn, id_i64, map_word_row, write_err},
};
use crate::repository::{StorageError, WordRepository, WordSource};

#[async_trait::async_trait]
impl WordRepository for SqliteRepository {
    async fn upsert_word(&self, word: &Word) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO words (id, text, definition, example, part_of_speech, audio, cefr)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    text = excluded.text,
                    definition = excluded.definition,
                    example = excluded.example,
                    part_of_speech = excluded.part_of_speech,
                    audio = excluded.audio,
                    cefr = excluded.cefr
            ",
        )
        .bind(id_i64("word_id", word.id().value())?)
        .bind(word.text())
        .bind(word.definition())
        .bind(word.example())
        .bind(word.part_of_speech())
        .bind(word.audio())
        .bind(word.cefr().map(|c| c.as_str()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn get_word(&self, id: WordId) -> Result<Word, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, text, definition, example, part_of_speech, audio, cefr
                FROM words
                WHERE id = ?1
            ",
        )
        .bind(id_i64("word_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_word_row(&row)
    }

    async fn assign_to_lesson(
        &self,
        course_id: CourseId,
        lesson_id: LessonId,
        word_ids: &[WordId],
    ) -> Result<(), StorageError> {
        let course = id_i64("course_id", course_id.value())?;
        let lesson = id_i64("lesson_id", lesson_id.value())?;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        let next: i64 = sqlx::query_scalar(
            r"
                SELECT COALESCE(MAX(position) + 1, 0)
                FROM lesson_words
                WHERE course_id = ?1 AND lesson_id = ?2
            ",
        )
        .bind(course)
        .bind(lesson)
        .fetch_one(&mut *tx)
        .await
        .map_err(conn)?;

        let mut position = next;
        for word_id in word_ids {
            let res = sqlx::query(
                r"
                    INSERT INTO lesson_words (course_id, lesson_id, word_id, position)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(course_id, lesson_id, word_id) DO NOTHING
                ",
            )
            .bind(course)
            .bind(lesson)
            .bind(id_i64("word_id", word_id.value())?)
            .bind(position)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
            if res.rows_affected() > 0 {
                position += 1;
            }
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl WordSource for SqliteRepository {
    async fn fetch_due_words(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Word>, StorageError> {
        let earliest: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT MIN(next_review_at) FROM review_records")
                .fetch_one(&self.pool)
                .await
                .map_err(conn)?;
        let Some(earliest) = earliest else {
            return Ok(Vec::new());
        };
        let cutoff = scheduler::cutoff_after(earliest, now);

        let rows = sqlx::query(
            r"
                SELECT w.id, w.text, w.definition, w.example, w.part_of_speech, w.audio, w.cefr
                FROM review_records r
                JOIN words w ON w.id = r.word_id
                WHERE r.next_review_at <= ?1
                ORDER BY r.next_review_at ASC, r.word_id ASC
                LIMIT ?2
            ",
        )
        .bind(cutoff)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_word_row).collect()
    }

    async fn fetch_words_for_course_lesson(
        &self,
        course_id: CourseId,
        lesson_id: LessonId,
    ) -> Result<Vec<Word>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT w.id, w.text, w.definition, w.example, w.part_of_speech, w.audio, w.cefr
                FROM lesson_words l
                JOIN words w ON w.id = l.word_id
                WHERE l.course_id = ?1 AND l.lesson_id = ?2
                ORDER BY l.position ASC
            ",
        )
        .bind(id_i64("course_id", course_id.value())?)
        .bind(id_i64("lesson_id", lesson_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_word_row).collect()
    }
}
