use std::sync::Arc;

use serde::Serialize;

use academy_core::model::{AttemptId, CourseItemId, CourseProgress, NewAttempt, UserId};
use academy_core::policy::check_new_attempt;
use academy_core::scoring::{AttemptStats, Submission, grade};
use storage::repository::{AssessmentRepository, AttemptRepository, CourseRepository};

use crate::Clock;
use crate::attempt_locks::AttemptLocks;
use crate::error::CourseServiceError;
use crate::progress_service::ProgressService;

/// What the learner sees after submitting an attempt.
///
/// `progress` is only set when the attempt passed, since only then does the
/// item get marked complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptOutcome {
    pub attempt_id: AttemptId,
    pub score: u32,
    pub total_points: u32,
    pub percent: u8,
    pub passed: bool,
    pub stats: AttemptStats,
    pub progress: Option<CourseProgress>,
}

/// Gates, grades and records quiz and exam attempts.
pub struct AttemptService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    assessments: Arc<dyn AssessmentRepository>,
    attempts: Arc<dyn AttemptRepository>,
    progress: Arc<ProgressService>,
    locks: AttemptLocks,
}

impl AttemptService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        assessments: Arc<dyn AssessmentRepository>,
        attempts: Arc<dyn AttemptRepository>,
        progress: Arc<ProgressService>,
    ) -> Self {
        Self {
            clock,
            courses,
            assessments,
            attempts,
            progress,
            locks: AttemptLocks::new(),
        }
    }

    /// Submit answers for a quiz or exam.
    ///
    /// Checks run in a fixed order and the first failure wins: the item must
    /// exist and be a quiz or exam with an assessment, the user must be
    /// enrolled, a passed exam is closed, and a set attempts limit must not be
    /// reached. A refused submission persists nothing.
    ///
    /// A passed attempt marks the item complete and refreshes course progress.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::ItemNotFound` or
    /// `CourseServiceError::AssessmentNotFound` for missing definitions.
    /// Returns `CourseServiceError::InvalidType` for chapters.
    /// Returns `CourseServiceError::NotEnrolled` if the user is not enrolled.
    /// Returns `CourseServiceError::Rejected` when the policy refuses the attempt.
    /// Returns `CourseServiceError::Storage` if repository access fails.
    pub async fn submit_attempt(
        &self,
        user_id: UserId,
        course_item_id: CourseItemId,
        submission: &Submission,
    ) -> Result<AttemptOutcome, CourseServiceError> {
        let item = self
            .courses
            .get_course_item(course_item_id)
            .await?
            .ok_or(CourseServiceError::ItemNotFound(course_item_id))?;

        if !item.kind.is_assessment() {
            return Err(CourseServiceError::InvalidType {
                item: item.id,
                actual: item.kind,
                expected: "QUIZ or EXAM",
            });
        }

        let assessment = self
            .assessments
            .get_assessment(item.id)
            .await?
            .ok_or(CourseServiceError::AssessmentNotFound(item.id))?;

        self.progress
            .ensure_enrolled(user_id, item.course_id)
            .await?;

        let (attempt_id, graded) = {
            let _guard = self.locks.acquire(user_id, item.id).await;

            let history = self.attempts.attempt_history(user_id, item.id).await?;
            if let Err(rejection) =
                check_new_attempt(item.kind, assessment.attempts_limit, history)
            {
                tracing::warn!(
                    user_id = %user_id,
                    course_item_id = %item.id,
                    attempts = history.attempts,
                    reason = %rejection,
                    "attempt rejected"
                );
                return Err(rejection.into());
            }

            let started_at = self.clock.now();
            let graded = grade(&assessment, submission);
            tracing::debug!(
                user_id = %user_id,
                course_item_id = %item.id,
                correct = graded.stats.correct,
                wrong = graded.stats.wrong,
                skipped = graded.stats.skipped,
                "graded attempt"
            );

            let attempt = NewAttempt {
                user_id,
                assessment_id: item.id,
                started_at,
                finished_at: self.clock.now(),
                score: graded.score,
                passed: graded.passed,
                answers: graded.answers.clone(),
            };
            let attempt_id = self.attempts.insert_attempt(&attempt).await?;
            (attempt_id, graded)
        };

        tracing::info!(
            user_id = %user_id,
            course_item_id = %item.id,
            attempt_id = %attempt_id,
            score = graded.score,
            total_points = graded.total_points,
            passed = graded.passed,
            "attempt recorded"
        );

        let progress = if graded.passed {
            Some(self.progress.complete_and_recompute(user_id, &item).await?)
        } else {
            None
        };

        Ok(AttemptOutcome {
            attempt_id,
            score: graded.score,
            total_points: graded.total_points,
            percent: graded.percent,
            passed: graded.passed,
            stats: graded.stats,
            progress,
        })
    }
}
