use academy_core::model::{
    AttemptId, AttemptSummary, Course, CourseId, CourseItem, CourseItemId, CourseItemKind,
    CourseProgress, Enrollment, ReadPercent, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Constraint failures on writes: a missing parent row is `NotFound`, a
/// duplicate key is `Conflict`.
pub(crate) fn map_write_error(e: sqlx::Error) -> StorageError {
    match e.as_database_error() {
        Some(db) if db.is_foreign_key_violation() => StorageError::NotFound,
        Some(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => conn(e),
    }
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn u64_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(u64_from_i64("user_id", v)?))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(u64_from_i64("course_id", v)?))
}

pub(crate) fn item_id_from_i64(v: i64) -> Result<CourseItemId, StorageError> {
    Ok(CourseItemId::new(u64_from_i64("course_item_id", v)?))
}

pub(crate) fn attempt_id_from_i64(v: i64) -> Result<AttemptId, StorageError> {
    Ok(AttemptId::new(u64_from_i64("attempt_id", v)?))
}

pub(crate) fn read_percent_from_i64(v: i64) -> Result<ReadPercent, StorageError> {
    let raw = u8::try_from(v).map_err(|_| ser(format!("invalid read_percent: {v}")))?;
    ReadPercent::new(raw).map_err(ser)
}

/// `?{start}, ?{start+1}, …` for `count` bind parameters.
pub(crate) fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn map_course_row(row: &SqliteRow) -> Result<Course, StorageError> {
    Course::new(
        course_id_from_i64(row.try_get("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<String, _>("slug").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_course_item_row(row: &SqliteRow) -> Result<CourseItem, StorageError> {
    let kind: String = row.try_get("kind").map_err(ser)?;
    Ok(CourseItem {
        id: item_id_from_i64(row.try_get("id").map_err(ser)?)?,
        course_id: course_id_from_i64(row.try_get("course_id").map_err(ser)?)?,
        kind: kind.parse::<CourseItemKind>().map_err(ser)?,
        title: row.try_get("title").map_err(ser)?,
        position: u32_from_i64("position", row.try_get("position").map_err(ser)?)?,
        is_required: row.try_get("is_required").map_err(ser)?,
    })
}

pub(crate) fn map_enrollment_row(row: &SqliteRow) -> Result<Enrollment, StorageError> {
    Ok(Enrollment {
        user_id: user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        course_id: course_id_from_i64(row.try_get("course_id").map_err(ser)?)?,
        activated_at: row.try_get("activated_at").map_err(ser)?,
    })
}

pub(crate) fn map_attempt_summary_row(row: &SqliteRow) -> Result<AttemptSummary, StorageError> {
    Ok(AttemptSummary {
        id: attempt_id_from_i64(row.try_get("id").map_err(ser)?)?,
        assessment_id: item_id_from_i64(row.try_get("assessment_id").map_err(ser)?)?,
        started_at: row.try_get("started_at").map_err(ser)?,
        finished_at: row.try_get("finished_at").map_err(ser)?,
        score: u32_from_i64("score", row.try_get("score").map_err(ser)?)?,
        passed: row.try_get("passed").map_err(ser)?,
    })
}

pub(crate) fn map_course_progress_row(row: &SqliteRow) -> Result<CourseProgress, StorageError> {
    let percent: i64 = row.try_get("progress_percent").map_err(ser)?;
    let progress_percent = u8::try_from(percent)
        .ok()
        .filter(|p| *p <= 100)
        .ok_or_else(|| ser(format!("invalid progress_percent: {percent}")))?;

    Ok(CourseProgress {
        user_id: user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        course_id: course_id_from_i64(row.try_get("course_id").map_err(ser)?)?,
        progress_percent,
        finished: row.try_get("finished").map_err(ser)?,
        finished_at: row.try_get("finished_at").map_err(ser)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}
