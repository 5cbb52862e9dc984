use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use academy_core::model::{Course, CourseId, Enrollment, UserId};
use storage::repository::{CourseRepository, EnrollmentRepository};

use crate::Clock;
use crate::error::CourseServiceError;

/// One row of "my courses".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrolledCourse {
    pub course: Course,
    pub activated_at: DateTime<Utc>,
}

/// Grants and lists enrollments.
///
/// Orders are treated as paid on creation, so checkout is a plain enroll.
#[derive(Clone)]
pub struct EnrollmentService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl EnrollmentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
    ) -> Self {
        Self {
            clock,
            courses,
            enrollments,
        }
    }

    /// Enroll a user; enrolling again keeps the first activation time.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::CourseNotFound` if the course is missing.
    /// Returns `CourseServiceError::Storage` if persistence fails.
    pub async fn enroll(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Enrollment, CourseServiceError> {
        if self.courses.get_course(course_id).await?.is_none() {
            return Err(CourseServiceError::CourseNotFound(course_id));
        }

        let requested = Enrollment {
            user_id,
            course_id,
            activated_at: self.clock.now(),
        };
        let stored = self.enrollments.enroll(&requested).await?;
        if stored == requested {
            tracing::info!(user_id = %user_id, course_id = %course_id, "enrollment activated");
        }
        Ok(stored)
    }

    /// Courses the user is enrolled in, most recently activated first.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::Storage` if repository access fails.
    pub async fn my_courses(
        &self,
        user_id: UserId,
    ) -> Result<Vec<EnrolledCourse>, CourseServiceError> {
        let enrollments = self.enrollments.list_enrollments(user_id).await?;
        let mut out = Vec::with_capacity(enrollments.len());
        for enrollment in enrollments {
            // enrollments cascade with their course, so a miss is a stale read
            if let Some(course) = self.courses.get_course(enrollment.course_id).await? {
                out.push(EnrolledCourse {
                    course,
                    activated_at: enrollment.activated_at,
                });
            }
        }
        Ok(out)
    }
}
