use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use academy_core::model::{
    Assessment, AssessmentAttempt, AttemptHistory, AttemptId, AttemptSummary, CompletionMarker,
    Course, CourseId, CourseItem, CourseItemId, CourseProgress, Enrollment, NewAttempt,
    ReadPercent, RequiredItem, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::memory::InMemoryRepository;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Courses and their content tree.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Insert or overwrite a course by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// Insert or overwrite a course item by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the owning course is missing.
    async fn upsert_course_item(&self, item: &CourseItem) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_course_item(&self, id: CourseItemId) -> Result<Option<CourseItem>, StorageError>;

    /// All items of a course ordered by position, then id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_course_items(&self, course_id: CourseId)
    -> Result<Vec<CourseItem>, StorageError>;

    /// Items flagged required, in position order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_required_items(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<RequiredItem>, StorageError>;
}

/// Quiz and exam definitions.
#[async_trait]
pub trait AssessmentRepository: Send + Sync {
    /// Replace the assessment attached to `assessment.course_item_id`, including
    /// its questions and answers.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course item is missing.
    async fn upsert_assessment(&self, assessment: &Assessment) -> Result<(), StorageError>;

    /// Load an assessment with questions and answers ordered by position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_assessment(
        &self,
        course_item_id: CourseItemId,
    ) -> Result<Option<Assessment>, StorageError>;
}

#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Insert-or-no-op on `(user_id, course_id)`. Returns the stored enrollment,
    /// which keeps its original `activated_at` when it already existed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the enrollment cannot be stored.
    async fn enroll(&self, enrollment: &Enrollment) -> Result<Enrollment, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn is_enrolled(&self, user_id: UserId, course_id: CourseId)
    -> Result<bool, StorageError>;

    /// Enrollments of a user, most recently activated first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_enrollments(&self, user_id: UserId) -> Result<Vec<Enrollment>, StorageError>;
}

/// Append-only attempt log.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Count prior attempts and whether any of them passed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn attempt_history(
        &self,
        user_id: UserId,
        assessment_id: CourseItemId,
    ) -> Result<AttemptHistory, StorageError>;

    /// Persist an attempt with all of its answer rows, atomically.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn insert_attempt(&self, attempt: &NewAttempt) -> Result<AttemptId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_attempt(&self, id: AttemptId) -> Result<Option<AssessmentAttempt>, StorageError>;

    /// Most recent attempt per assessment among `assessment_ids`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn latest_attempts(
        &self,
        user_id: UserId,
        assessment_ids: &[CourseItemId],
    ) -> Result<Vec<AttemptSummary>, StorageError>;
}

/// Completion markers, chapter read progress and the cached course aggregate.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Insert-or-no-op on `(user_id, course_item_id)`.
    ///
    /// Returns `true` when a new marker was written.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the marker cannot be stored.
    async fn mark_completed(&self, marker: &CompletionMarker) -> Result<bool, StorageError>;

    /// Subset of `item_ids` that carry a marker for the user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn completed_items(
        &self,
        user_id: UserId,
        item_ids: &[CourseItemId],
    ) -> Result<HashSet<CourseItemId>, StorageError>;

    /// Insert-or-max on `(user_id, course_item_id)`: the stored value becomes
    /// `max(stored, percent)`. Returns the value stored afterwards.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    async fn merge_read_percent(
        &self,
        user_id: UserId,
        course_item_id: CourseItemId,
        percent: ReadPercent,
        at: DateTime<Utc>,
    ) -> Result<ReadPercent, StorageError>;

    /// Stored read percentages for the items that have one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn read_percents(
        &self,
        user_id: UserId,
        item_ids: &[CourseItemId],
    ) -> Result<HashMap<CourseItemId, ReadPercent>, StorageError>;

    /// Insert-or-overwrite on `(user_id, course_id)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn upsert_course_progress(&self, progress: &CourseProgress) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_course_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<CourseProgress>, StorageError>;

    /// The user's most recently updated course aggregate.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn latest_course_progress(
        &self,
        user_id: UserId,
    ) -> Result<Option<CourseProgress>, StorageError>;
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub assessments: Arc<dyn AssessmentRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Wire every repository slot to the same backend.
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: CourseRepository
            + AssessmentRepository
            + EnrollmentRepository
            + AttemptRepository
            + ProgressRepository
            + Clone
            + 'static,
    {
        Self {
            courses: Arc::new(repo.clone()),
            assessments: Arc::new(repo.clone()),
            enrollments: Arc::new(repo.clone()),
            attempts: Arc::new(repo.clone()),
            progress: Arc::new(repo),
        }
    }
}
