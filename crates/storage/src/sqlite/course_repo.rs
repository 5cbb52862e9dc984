use academy_core::model::{Course, CourseId, CourseItem, CourseItemId, RequiredItem};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_course_item_row, map_course_row, map_write_error};
use crate::repository::{CourseRepository, StorageError};

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO courses (id, title, slug)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                slug = excluded.slug
            ",
        )
        .bind(id_i64("course_id", course.id.value())?)
        .bind(course.title.as_str())
        .bind(course.slug.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query("SELECT id, title, slug FROM courses WHERE id = ?1")
            .bind(id_i64("course_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_course_row).transpose()
    }

    async fn upsert_course_item(&self, item: &CourseItem) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO course_items (id, course_id, kind, title, position, is_required)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                kind = excluded.kind,
                title = excluded.title,
                position = excluded.position,
                is_required = excluded.is_required
            ",
        )
        .bind(id_i64("course_item_id", item.id.value())?)
        .bind(id_i64("course_id", item.course_id.value())?)
        .bind(item.kind.as_str())
        .bind(item.title.as_str())
        .bind(i64::from(item.position))
        .bind(item.is_required)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }

    async fn get_course_item(&self, id: CourseItemId) -> Result<Option<CourseItem>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, course_id, kind, title, position, is_required
            FROM course_items
            WHERE id = ?1
            ",
        )
        .bind(id_i64("course_item_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_course_item_row).transpose()
    }

    async fn list_course_items(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<CourseItem>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, course_id, kind, title, position, is_required
            FROM course_items
            WHERE course_id = ?1
            ORDER BY position ASC, id ASC
            ",
        )
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_course_item_row).collect()
    }

    async fn list_required_items(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<RequiredItem>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, course_id, kind, title, position, is_required
            FROM course_items
            WHERE course_id = ?1 AND is_required = 1
            ORDER BY position ASC, id ASC
            ",
        )
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| map_course_item_row(row).map(|item| RequiredItem::from(&item)))
            .collect()
    }
}
