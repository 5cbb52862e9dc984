use academy_core::model::{CourseId, Enrollment, UserId};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_enrollment_row, map_write_error};
use crate::repository::{EnrollmentRepository, StorageError};

#[async_trait::async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn enroll(&self, enrollment: &Enrollment) -> Result<Enrollment, StorageError> {
        let user_id = id_i64("user_id", enrollment.user_id.value())?;
        let course_id = id_i64("course_id", enrollment.course_id.value())?;

        sqlx::query(
            r"
            INSERT INTO enrollments (user_id, course_id, activated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, course_id) DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(course_id)
        .bind(enrollment.activated_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        let row = sqlx::query(
            r"
            SELECT user_id, course_id, activated_at
            FROM enrollments
            WHERE user_id = ?1 AND course_id = ?2
            ",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;

        map_enrollment_row(&row)
    }

    async fn is_enrolled(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM enrollments WHERE user_id = ?1 AND course_id = ?2")
            .bind(id_i64("user_id", user_id.value())?)
            .bind(id_i64("course_id", course_id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        Ok(row.is_some())
    }

    async fn list_enrollments(&self, user_id: UserId) -> Result<Vec<Enrollment>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, course_id, activated_at
            FROM enrollments
            WHERE user_id = ?1
            ORDER BY activated_at DESC, course_id DESC
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_enrollment_row).collect()
    }
}
