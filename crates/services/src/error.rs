//! Shared error types for the services crate.

use serde::Serialize;
use thiserror::Error;

use academy_core::model::{CourseId, CourseItemId, CourseItemKind, ProgressError};
use academy_core::policy::AttemptRejection;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Stable classification of a `CourseServiceError`, suitable for mapping to
/// status codes or exit codes at the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    NotFound,
    InvalidType,
    Forbidden,
    Rejected,
    Conflict,
    Storage,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::InvalidType => "INVALID_TYPE",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::Rejected => "REJECTED",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Storage => "STORAGE",
        }
    }
}

/// Why a new attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    AlreadyPassed,
    LimitReached,
}

impl From<AttemptRejection> for RejectionReason {
    fn from(rejection: AttemptRejection) -> Self {
        match rejection {
            AttemptRejection::AlreadyPassed => RejectionReason::AlreadyPassed,
            AttemptRejection::LimitReached { .. } => RejectionReason::LimitReached,
        }
    }
}

/// Errors emitted by the course services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseServiceError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("course {0} not found")]
    CourseNotFound(CourseId),

    #[error("course item {0} not found")]
    ItemNotFound(CourseItemId),

    #[error("assessment for course item {0} not found")]
    AssessmentNotFound(CourseItemId),

    #[error("course item {item} is a {actual}, expected {expected}")]
    InvalidType {
        item: CourseItemId,
        actual: CourseItemKind,
        expected: &'static str,
    },

    #[error("not enrolled in course {0}")]
    NotEnrolled(CourseId),

    #[error(transparent)]
    Rejected(#[from] AttemptRejection),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CourseServiceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            CourseServiceError::Validation(_) => ErrorKind::Validation,
            CourseServiceError::CourseNotFound(_)
            | CourseServiceError::ItemNotFound(_)
            | CourseServiceError::AssessmentNotFound(_)
            | CourseServiceError::Storage(StorageError::NotFound) => ErrorKind::NotFound,
            CourseServiceError::InvalidType { .. } => ErrorKind::InvalidType,
            CourseServiceError::NotEnrolled(_) => ErrorKind::Forbidden,
            CourseServiceError::Rejected(_) => ErrorKind::Rejected,
            CourseServiceError::Storage(StorageError::Conflict) => ErrorKind::Conflict,
            CourseServiceError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Set only for `ErrorKind::Rejected`.
    #[must_use]
    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        match self {
            CourseServiceError::Rejected(rejection) => Some(RejectionReason::from(*rejection)),
            _ => None,
        }
    }
}

impl From<ProgressError> for CourseServiceError {
    fn from(err: ProgressError) -> Self {
        CourseServiceError::Validation(err.to_string())
    }
}

/// Errors emitted while bootstrapping course services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_variant() {
        assert_eq!(
            CourseServiceError::ItemNotFound(CourseItemId::new(1)).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CourseServiceError::NotEnrolled(CourseId::new(1)).kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(
            CourseServiceError::Storage(StorageError::Conflict).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            CourseServiceError::Storage(StorageError::Connection("gone".into())).kind(),
            ErrorKind::Storage
        );
    }

    #[test]
    fn rejections_carry_a_reason() {
        let err = CourseServiceError::from(AttemptRejection::LimitReached {
            limit: 1,
            attempts: 1,
        });
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert_eq!(err.rejection_reason(), Some(RejectionReason::LimitReached));
        assert_eq!(err.to_string(), "attempts limit reached (1/1)");
        assert_eq!(
            CourseServiceError::Validation("x".into()).rejection_reason(),
            None
        );
    }
}
