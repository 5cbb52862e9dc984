use std::num::NonZeroU32;

use academy_core::model::{
    Answer, AnswerId, Assessment, CourseItemId, Question, QuestionId, QuestionKind,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{
    conn, id_i64, item_id_from_i64, map_write_error, ser, u32_from_i64, u64_from_i64,
};
use crate::repository::{AssessmentRepository, StorageError};

fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let kind: String = row.try_get("kind").map_err(ser)?;
    Ok(Question {
        id: QuestionId::new(u64_from_i64("question_id", row.try_get("id").map_err(ser)?)?),
        kind: kind.parse::<QuestionKind>().map_err(ser)?,
        text: row.try_get("text").map_err(ser)?,
        points: u32_from_i64("points", row.try_get("points").map_err(ser)?)?,
        position: u32_from_i64("position", row.try_get("position").map_err(ser)?)?,
        answers: Vec::new(),
    })
}

fn map_answer_row(row: &SqliteRow) -> Result<(QuestionId, Answer), StorageError> {
    let question_id = QuestionId::new(u64_from_i64(
        "question_id",
        row.try_get("question_id").map_err(ser)?,
    )?);
    let answer = Answer {
        id: AnswerId::new(u64_from_i64("answer_id", row.try_get("id").map_err(ser)?)?),
        text: row.try_get("text").map_err(ser)?,
        is_correct: row.try_get("is_correct").map_err(ser)?,
        position: u32_from_i64("position", row.try_get("position").map_err(ser)?)?,
    };
    Ok((question_id, answer))
}

#[async_trait::async_trait]
impl AssessmentRepository for SqliteRepository {
    async fn upsert_assessment(&self, assessment: &Assessment) -> Result<(), StorageError> {
        let item_id = id_i64("course_item_id", assessment.course_item_id.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO assessments (
                course_item_id, min_pass_score, attempts_limit, time_limit_sec, shuffle_questions
            )
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(course_item_id) DO UPDATE SET
                min_pass_score = excluded.min_pass_score,
                attempts_limit = excluded.attempts_limit,
                time_limit_sec = excluded.time_limit_sec,
                shuffle_questions = excluded.shuffle_questions
            ",
        )
        .bind(item_id)
        .bind(i64::from(assessment.min_pass_score))
        .bind(assessment.attempts_limit.map(|l| i64::from(l.get())))
        .bind(assessment.time_limit_sec.map(i64::from))
        .bind(assessment.shuffle_questions)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        // answers cascade with their questions
        sqlx::query("DELETE FROM questions WHERE course_item_id = ?1")
            .bind(item_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for question in &assessment.questions {
            let question_id = id_i64("question_id", question.id.value())?;
            sqlx::query(
                r"
                INSERT INTO questions (id, course_item_id, kind, text, points, position)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .bind(question_id)
            .bind(item_id)
            .bind(question.kind.as_str())
            .bind(question.text.as_str())
            .bind(i64::from(question.points))
            .bind(i64::from(question.position))
            .execute(&mut *tx)
            .await
            .map_err(map_write_error)?;

            for answer in &question.answers {
                sqlx::query(
                    r"
                    INSERT INTO answers (id, question_id, text, is_correct, position)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ",
                )
                .bind(id_i64("answer_id", answer.id.value())?)
                .bind(question_id)
                .bind(answer.text.as_str())
                .bind(answer.is_correct)
                .bind(i64::from(answer.position))
                .execute(&mut *tx)
                .await
                .map_err(map_write_error)?;
            }
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_assessment(
        &self,
        course_item_id: CourseItemId,
    ) -> Result<Option<Assessment>, StorageError> {
        let item_id = id_i64("course_item_id", course_item_id.value())?;

        let Some(row) = sqlx::query(
            r"
            SELECT course_item_id, min_pass_score, attempts_limit, time_limit_sec, shuffle_questions
            FROM assessments
            WHERE course_item_id = ?1
            ",
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        else {
            return Ok(None);
        };

        let min_pass_score: Option<i64> = row.try_get("min_pass_score").map_err(ser)?;
        let attempts_limit: Option<i64> = row.try_get("attempts_limit").map_err(ser)?;
        let time_limit_sec: Option<i64> = row.try_get("time_limit_sec").map_err(ser)?;

        let attempts_limit = attempts_limit
            .map(|raw| {
                u32_from_i64("attempts_limit", raw).and_then(|v| {
                    NonZeroU32::new(v)
                        .ok_or_else(|| ser(format!("invalid attempts_limit: {raw}")))
                })
            })
            .transpose()?;

        let question_rows = sqlx::query(
            r"
            SELECT id, kind, text, points, position
            FROM questions
            WHERE course_item_id = ?1
            ORDER BY position ASC, id ASC
            ",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut questions = question_rows
            .iter()
            .map(map_question_row)
            .collect::<Result<Vec<_>, _>>()?;

        let answer_rows = sqlx::query(
            r"
            SELECT a.id, a.question_id, a.text, a.is_correct, a.position
            FROM answers a
            JOIN questions q ON q.id = a.question_id
            WHERE q.course_item_id = ?1
            ORDER BY a.position ASC, a.id ASC
            ",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        for row in &answer_rows {
            let (question_id, answer) = map_answer_row(row)?;
            if let Some(question) = questions.iter_mut().find(|q| q.id == question_id) {
                question.answers.push(answer);
            }
        }

        Ok(Some(Assessment {
            course_item_id: item_id_from_i64(row.try_get("course_item_id").map_err(ser)?)?,
            // a missing threshold means any score passes
            min_pass_score: min_pass_score
                .map(|v| u32_from_i64("min_pass_score", v))
                .transpose()?
                .unwrap_or(0),
            attempts_limit,
            time_limit_sec: time_limit_sec
                .map(|v| u32_from_i64("time_limit_sec", v))
                .transpose()?,
            shuffle_questions: row.try_get("shuffle_questions").map_err(ser)?,
            questions,
        }))
    }
}
