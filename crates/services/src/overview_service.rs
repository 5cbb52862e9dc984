use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use academy_core::model::{
    AttemptSummary, Course, CourseId, CourseItem, CourseItemId, UserId,
};
use storage::repository::{
    AssessmentRepository, AttemptRepository, CourseRepository, EnrollmentRepository,
    ProgressRepository,
};

use crate::error::CourseServiceError;
use crate::progress_service::ProgressView;

/// Assessment settings shown next to a quiz or exam. Correct flags stay hidden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssessmentInfo {
    pub min_pass_score: u32,
    pub attempts_limit: Option<u32>,
    pub time_limit_sec: Option<u32>,
    pub question_count: usize,
    pub total_points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverviewItem {
    #[serde(flatten)]
    pub item: CourseItem,
    pub completed: bool,
    /// Stored read percent; chapters only.
    pub read_percent: Option<u8>,
    pub assessment: Option<AssessmentInfo>,
    pub latest_attempt: Option<AttemptSummary>,
}

/// A learner's view of one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseOverview {
    pub course: Course,
    pub progress: ProgressView,
    pub completed_item_ids: Vec<CourseItemId>,
    pub latest_attempts_by_item_id: BTreeMap<CourseItemId, AttemptSummary>,
    pub items: Vec<OverviewItem>,
}

/// Read-only course views built from the stored state.
#[derive(Clone)]
pub struct OverviewService {
    courses: Arc<dyn CourseRepository>,
    assessments: Arc<dyn AssessmentRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    attempts: Arc<dyn AttemptRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl OverviewService {
    #[must_use]
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        assessments: Arc<dyn AssessmentRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        attempts: Arc<dyn AttemptRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            courses,
            assessments,
            enrollments,
            attempts,
            progress,
        }
    }

    /// Every item of the course in position order with the user's state.
    ///
    /// The progress block is the zero state when nothing was recomputed yet.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::CourseNotFound` if the course is missing.
    /// Returns `CourseServiceError::NotEnrolled` if the user is not enrolled.
    /// Returns `CourseServiceError::Storage` if repository access fails.
    pub async fn course_overview(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<CourseOverview, CourseServiceError> {
        let course = self
            .courses
            .get_course(course_id)
            .await?
            .ok_or(CourseServiceError::CourseNotFound(course_id))?;

        if !self.enrollments.is_enrolled(user_id, course_id).await? {
            return Err(CourseServiceError::NotEnrolled(course_id));
        }

        let items = self.courses.list_course_items(course_id).await?;
        let item_ids: Vec<CourseItemId> = items.iter().map(|item| item.id).collect();
        let assessment_ids: Vec<CourseItemId> = items
            .iter()
            .filter(|item| item.kind.is_assessment())
            .map(|item| item.id)
            .collect();

        let completed = self.progress.completed_items(user_id, &item_ids).await?;
        let reads = self.progress.read_percents(user_id, &item_ids).await?;
        let latest: BTreeMap<CourseItemId, AttemptSummary> = self
            .attempts
            .latest_attempts(user_id, &assessment_ids)
            .await?
            .into_iter()
            .map(|summary| (summary.assessment_id, summary))
            .collect();
        let progress = self
            .progress
            .get_course_progress(user_id, course_id)
            .await?
            .as_ref()
            .map(ProgressView::from)
            .unwrap_or_default();

        let mut overview_items = Vec::with_capacity(items.len());
        for item in items {
            let assessment = if item.kind.is_assessment() {
                self.assessments
                    .get_assessment(item.id)
                    .await?
                    .map(|a| AssessmentInfo {
                        min_pass_score: a.min_pass_score,
                        attempts_limit: a.attempts_limit.map(|l| l.get()),
                        time_limit_sec: a.time_limit_sec,
                        question_count: a.questions.len(),
                        total_points: a.total_points(),
                    })
            } else {
                None
            };

            overview_items.push(OverviewItem {
                completed: completed.contains(&item.id),
                read_percent: reads.get(&item.id).map(|p| p.value()),
                latest_attempt: latest.get(&item.id).cloned(),
                assessment,
                item,
            });
        }

        // position order, like the items themselves
        let completed_item_ids = item_ids
            .into_iter()
            .filter(|id| completed.contains(id))
            .collect();

        Ok(CourseOverview {
            course,
            progress,
            completed_item_ids,
            latest_attempts_by_item_id: latest,
            items: overview_items,
        })
    }

    /// The course the user touched last: most recently recomputed progress
    /// first, otherwise the most recent enrollment.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::Storage` if repository access fails.
    pub async fn last_active_course(
        &self,
        user_id: UserId,
    ) -> Result<Option<Course>, CourseServiceError> {
        let course_id = match self.progress.latest_course_progress(user_id).await? {
            Some(progress) => Some(progress.course_id),
            None => self
                .enrollments
                .list_enrollments(user_id)
                .await?
                .first()
                .map(|enrollment| enrollment.course_id),
        };

        match course_id {
            Some(id) => Ok(self.courses.get_course(id).await?),
            None => Ok(None),
        }
    }
}
