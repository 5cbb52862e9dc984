use academy_core::model::{
    AnswerId, AssessmentAttempt, AttemptAnswer, AttemptHistory, AttemptId, AttemptSummary,
    CourseItemId, NewAttempt, QuestionId, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{
    attempt_id_from_i64, conn, id_i64, item_id_from_i64, map_attempt_summary_row,
    map_write_error, placeholders, ser, u32_from_i64, u64_from_i64, user_id_from_i64,
};
use crate::repository::{AttemptRepository, StorageError};

fn map_attempt_answer_row(row: &SqliteRow) -> Result<AttemptAnswer, StorageError> {
    let answer_id: Option<i64> = row.try_get("answer_id").map_err(ser)?;
    Ok(AttemptAnswer {
        question_id: QuestionId::new(u64_from_i64(
            "question_id",
            row.try_get("question_id").map_err(ser)?,
        )?),
        answer_id: answer_id
            .map(|v| u64_from_i64("answer_id", v).map(AnswerId::new))
            .transpose()?,
        text_answer: row.try_get("text_answer").map_err(ser)?,
        is_correct: row.try_get("is_correct").map_err(ser)?,
        points_awarded: u32_from_i64(
            "points_awarded",
            row.try_get("points_awarded").map_err(ser)?,
        )?,
    })
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn attempt_history(
        &self,
        user_id: UserId,
        assessment_id: CourseItemId,
    ) -> Result<AttemptHistory, StorageError> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) AS attempts, COALESCE(MAX(passed), 0) AS passed_any
            FROM assessment_attempts
            WHERE user_id = ?1 AND assessment_id = ?2
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("assessment_id", assessment_id.value())?)
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;

        let attempts: i64 = row.try_get("attempts").map_err(ser)?;
        let passed_any: i64 = row.try_get("passed_any").map_err(ser)?;

        Ok(AttemptHistory {
            attempts: u32_from_i64("attempts", attempts)?,
            passed_any: passed_any != 0,
        })
    }

    async fn insert_attempt(&self, attempt: &NewAttempt) -> Result<AttemptId, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let result = sqlx::query(
            r"
            INSERT INTO assessment_attempts (
                user_id, assessment_id, started_at, finished_at, score, passed
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(id_i64("user_id", attempt.user_id.value())?)
        .bind(id_i64("assessment_id", attempt.assessment_id.value())?)
        .bind(attempt.started_at)
        .bind(attempt.finished_at)
        .bind(i64::from(attempt.score))
        .bind(attempt.passed)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        let attempt_id = result.last_insert_rowid();

        for answer in &attempt.answers {
            let answer_id = answer
                .answer_id
                .map(|id| id_i64("answer_id", id.value()))
                .transpose()?;

            sqlx::query(
                r"
                INSERT INTO attempt_answers (
                    attempt_id, question_id, answer_id, text_answer, is_correct, points_awarded
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .bind(attempt_id)
            .bind(id_i64("question_id", answer.question_id.value())?)
            .bind(answer_id)
            .bind(answer.text_answer.as_deref())
            .bind(answer.is_correct)
            .bind(i64::from(answer.points_awarded))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        attempt_id_from_i64(attempt_id)
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Option<AssessmentAttempt>, StorageError> {
        let attempt_id = id_i64("attempt_id", id.value())?;

        let Some(row) = sqlx::query(
            r"
            SELECT id, user_id, assessment_id, started_at, finished_at, score, passed
            FROM assessment_attempts
            WHERE id = ?1
            ",
        )
        .bind(attempt_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        else {
            return Ok(None);
        };

        let answer_rows = sqlx::query(
            r"
            SELECT question_id, answer_id, text_answer, is_correct, points_awarded
            FROM attempt_answers
            WHERE attempt_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let answers = answer_rows
            .iter()
            .map(map_attempt_answer_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(AssessmentAttempt {
            id: attempt_id_from_i64(row.try_get("id").map_err(ser)?)?,
            user_id: user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
            assessment_id: item_id_from_i64(row.try_get("assessment_id").map_err(ser)?)?,
            started_at: row.try_get("started_at").map_err(ser)?,
            finished_at: row.try_get("finished_at").map_err(ser)?,
            score: u32_from_i64("score", row.try_get("score").map_err(ser)?)?,
            passed: row.try_get("passed").map_err(ser)?,
            answers,
        }))
    }

    async fn latest_attempts(
        &self,
        user_id: UserId,
        assessment_ids: &[CourseItemId],
    ) -> Result<Vec<AttemptSummary>, StorageError> {
        if assessment_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r"
            SELECT id, assessment_id, started_at, finished_at, score, passed
            FROM assessment_attempts
            WHERE user_id = ?1 AND assessment_id IN ({})
            ORDER BY assessment_id ASC, started_at DESC, id DESC
            ",
            placeholders(2, assessment_ids.len())
        );

        let mut query = sqlx::query(&sql).bind(id_i64("user_id", user_id.value())?);
        for id in assessment_ids {
            query = query.bind(id_i64("assessment_id", id.value())?);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;

        let mut out: Vec<AttemptSummary> = Vec::new();
        for row in &rows {
            let summary = map_attempt_summary_row(row)?;
            // rows arrive newest first within each assessment
            if out
                .last()
                .is_none_or(|prev| prev.assessment_id != summary.assessment_id)
            {
                out.push(summary);
            }
        }
        Ok(out)
    }
}
