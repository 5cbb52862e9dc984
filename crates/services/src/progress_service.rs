use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use academy_core::model::{
    CompletionMarker, CourseId, CourseItem, CourseItemId, CourseItemKind, CourseProgress,
    ReadPercent, UserId,
};
use academy_core::progress::aggregate;
use storage::repository::{CourseRepository, EnrollmentRepository, ProgressRepository};

use crate::Clock;
use crate::error::CourseServiceError;

//
// ─── VIEWS ─────────────────────────────────────────────────────────────────────
//

/// Course aggregate as shown to the learner. `updated_at` is `None` until the
/// first recompute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressView {
    pub progress_percent: u8,
    pub finished: bool,
    pub finished_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&CourseProgress> for ProgressView {
    fn from(progress: &CourseProgress) -> Self {
        Self {
            progress_percent: progress.progress_percent,
            finished: progress.finished,
            finished_at: progress.finished_at,
            updated_at: Some(progress.updated_at),
        }
    }
}

/// Result of a chapter read-progress report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadProgressOutcome {
    /// Stored value after the merge.
    pub read_percent: u8,
    /// True when the stored value reached 100 and the chapter is marked complete.
    pub completed: bool,
    pub progress: CourseProgress,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Completion markers, chapter read progress and the cached course aggregate.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            courses,
            enrollments,
            progress,
        }
    }

    /// Recompute and store the user's aggregate for a course from scratch.
    ///
    /// Running it twice without intervening writes yields the same percent and
    /// `finished` flag.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::CourseNotFound` if the course is missing.
    /// Returns `CourseServiceError::Storage` if repository access fails.
    pub async fn recompute_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<CourseProgress, CourseServiceError> {
        if self.courses.get_course(course_id).await?.is_none() {
            return Err(CourseServiceError::CourseNotFound(course_id));
        }
        self.recompute(user_id, course_id).await
    }

    /// Mark any course item complete for the user and refresh the aggregate.
    ///
    /// Marking an item twice is a no-op for the marker.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::ItemNotFound` if the item is missing.
    /// Returns `CourseServiceError::NotEnrolled` if the user is not enrolled.
    /// Returns `CourseServiceError::Storage` if repository access fails.
    pub async fn mark_item_complete(
        &self,
        user_id: UserId,
        course_item_id: CourseItemId,
    ) -> Result<CourseProgress, CourseServiceError> {
        let item = self.require_item(course_item_id).await?;
        self.ensure_enrolled(user_id, item.course_id).await?;
        self.complete_and_recompute(user_id, &item).await
    }

    /// Merge a reported read percentage for a chapter.
    ///
    /// The reported value is clamped to `0..=100` and rounded; the stored
    /// value never decreases. Reaching 100 also marks the chapter complete.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::Validation` if `reported` is not finite.
    /// Returns `CourseServiceError::ItemNotFound` if the item is missing.
    /// Returns `CourseServiceError::InvalidType` unless the item is a chapter.
    /// Returns `CourseServiceError::NotEnrolled` if the user is not enrolled.
    /// Returns `CourseServiceError::Storage` if repository access fails.
    pub async fn update_read_progress(
        &self,
        user_id: UserId,
        course_item_id: CourseItemId,
        reported: f64,
    ) -> Result<ReadProgressOutcome, CourseServiceError> {
        let reported = ReadPercent::from_reported(reported)?;
        let item = self.require_item(course_item_id).await?;
        if item.kind != CourseItemKind::Chapter {
            return Err(CourseServiceError::InvalidType {
                item: item.id,
                actual: item.kind,
                expected: "CHAPTER",
            });
        }
        self.ensure_enrolled(user_id, item.course_id).await?;

        let now = self.clock.now();
        let stored = self
            .progress
            .merge_read_percent(user_id, item.id, reported, now)
            .await?;
        tracing::debug!(
            user_id = %user_id,
            course_item_id = %item.id,
            reported = reported.value(),
            stored = stored.value(),
            "merged chapter read progress"
        );

        let completed = stored.is_complete();
        if completed {
            self.mark(user_id, item.id).await?;
        }

        let progress = self.recompute(user_id, item.course_id).await?;
        Ok(ReadProgressOutcome {
            read_percent: stored.value(),
            completed,
            progress,
        })
    }

    /// Marker upsert followed by a recompute, for callers that already
    /// resolved and authorized the item.
    pub(crate) async fn complete_and_recompute(
        &self,
        user_id: UserId,
        item: &CourseItem,
    ) -> Result<CourseProgress, CourseServiceError> {
        self.mark(user_id, item.id).await?;
        self.recompute(user_id, item.course_id).await
    }

    pub(crate) async fn ensure_enrolled(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<(), CourseServiceError> {
        if self.enrollments.is_enrolled(user_id, course_id).await? {
            Ok(())
        } else {
            Err(CourseServiceError::NotEnrolled(course_id))
        }
    }

    async fn require_item(&self, id: CourseItemId) -> Result<CourseItem, CourseServiceError> {
        self.courses
            .get_course_item(id)
            .await?
            .ok_or(CourseServiceError::ItemNotFound(id))
    }

    async fn mark(
        &self,
        user_id: UserId,
        course_item_id: CourseItemId,
    ) -> Result<(), CourseServiceError> {
        let marker = CompletionMarker {
            user_id,
            course_item_id,
            completed_at: self.clock.now(),
        };
        if self.progress.mark_completed(&marker).await? {
            tracing::info!(user_id = %user_id, course_item_id = %course_item_id, "course item completed");
        }
        Ok(())
    }

    async fn recompute(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<CourseProgress, CourseServiceError> {
        let required = self.courses.list_required_items(course_id).await?;
        let ids: Vec<CourseItemId> = required
            .iter()
            .map(|item| item.id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let completed = self.progress.completed_items(user_id, &ids).await?;
        let read = self.progress.read_percents(user_id, &ids).await?;
        let snapshot = aggregate(&required, &completed, &read);

        let previous = self.progress.get_course_progress(user_id, course_id).await?;
        let row = CourseProgress::recomputed(
            user_id,
            course_id,
            &snapshot,
            previous.as_ref(),
            self.clock.now(),
        );
        self.progress.upsert_course_progress(&row).await?;

        tracing::info!(
            user_id = %user_id,
            course_id = %course_id,
            required = snapshot.required_total,
            completed = snapshot.completed,
            progress_percent = row.progress_percent,
            finished = row.finished,
            "course progress recomputed"
        );
        Ok(row)
    }
}
