use std::collections::{HashMap, HashSet};

use academy_core::model::{
    CompletionMarker, CourseId, CourseItemId, CourseProgress, ReadPercent, UserId,
};
use chrono::{DateTime, Utc};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    conn, id_i64, item_id_from_i64, map_course_progress_row, map_write_error, placeholders,
    read_percent_from_i64, ser,
};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn mark_completed(&self, marker: &CompletionMarker) -> Result<bool, StorageError> {
        let result = sqlx::query(
            r"
            INSERT INTO course_item_progress (user_id, course_item_id, completed_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, course_item_id) DO NOTHING
            ",
        )
        .bind(id_i64("user_id", marker.user_id.value())?)
        .bind(id_i64("course_item_id", marker.course_item_id.value())?)
        .bind(marker.completed_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn completed_items(
        &self,
        user_id: UserId,
        item_ids: &[CourseItemId],
    ) -> Result<HashSet<CourseItemId>, StorageError> {
        if item_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let sql = format!(
            r"
            SELECT course_item_id
            FROM course_item_progress
            WHERE user_id = ?1 AND course_item_id IN ({})
            ",
            placeholders(2, item_ids.len())
        );

        let mut query = sqlx::query(&sql).bind(id_i64("user_id", user_id.value())?);
        for id in item_ids {
            query = query.bind(id_i64("course_item_id", id.value())?);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;
        rows.iter()
            .map(|row| item_id_from_i64(row.try_get("course_item_id").map_err(ser)?))
            .collect()
    }

    async fn merge_read_percent(
        &self,
        user_id: UserId,
        course_item_id: CourseItemId,
        percent: ReadPercent,
        at: DateTime<Utc>,
    ) -> Result<ReadPercent, StorageError> {
        let row = sqlx::query(
            r"
            INSERT INTO course_item_read_progress (user_id, course_item_id, read_percent, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id, course_item_id) DO UPDATE SET
                read_percent = MAX(course_item_read_progress.read_percent, excluded.read_percent),
                updated_at = excluded.updated_at
            RETURNING read_percent
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("course_item_id", course_item_id.value())?)
        .bind(i64::from(percent.value()))
        .bind(at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        read_percent_from_i64(row.try_get("read_percent").map_err(ser)?)
    }

    async fn read_percents(
        &self,
        user_id: UserId,
        item_ids: &[CourseItemId],
    ) -> Result<HashMap<CourseItemId, ReadPercent>, StorageError> {
        if item_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            r"
            SELECT course_item_id, read_percent
            FROM course_item_read_progress
            WHERE user_id = ?1 AND course_item_id IN ({})
            ",
            placeholders(2, item_ids.len())
        );

        let mut query = sqlx::query(&sql).bind(id_i64("user_id", user_id.value())?);
        for id in item_ids {
            query = query.bind(id_i64("course_item_id", id.value())?);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;
        rows.iter()
            .map(|row| {
                Ok::<_, StorageError>((
                    item_id_from_i64(row.try_get("course_item_id").map_err(ser)?)?,
                    read_percent_from_i64(row.try_get("read_percent").map_err(ser)?)?,
                ))
            })
            .collect()
    }

    async fn upsert_course_progress(&self, progress: &CourseProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO course_progress (
                user_id, course_id, progress_percent, finished, finished_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(user_id, course_id) DO UPDATE SET
                progress_percent = excluded.progress_percent,
                finished = excluded.finished,
                finished_at = excluded.finished_at,
                updated_at = excluded.updated_at
            ",
        )
        .bind(id_i64("user_id", progress.user_id.value())?)
        .bind(id_i64("course_id", progress.course_id.value())?)
        .bind(i64::from(progress.progress_percent))
        .bind(progress.finished)
        .bind(progress.finished_at)
        .bind(progress.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }

    async fn get_course_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<CourseProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, course_id, progress_percent, finished, finished_at, updated_at
            FROM course_progress
            WHERE user_id = ?1 AND course_id = ?2
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_course_progress_row).transpose()
    }

    async fn latest_course_progress(
        &self,
        user_id: UserId,
    ) -> Result<Option<CourseProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, course_id, progress_percent, finished, finished_at, updated_at
            FROM course_progress
            WHERE user_id = ?1
            ORDER BY updated_at DESC, course_id DESC
            LIMIT 1
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_course_progress_row).transpose()
    }
}
