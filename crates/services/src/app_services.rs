use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::attempt_service::AttemptService;
use crate::enrollment_service::EnrollmentService;
use crate::error::CourseServicesError;
use crate::overview_service::OverviewService;
use crate::progress_service::ProgressService;

/// Assembles the course-facing services over one storage backend.
#[derive(Clone)]
pub struct CourseServices {
    storage: Storage,
    attempts: Arc<AttemptService>,
    progress: Arc<ProgressService>,
    enrollments: Arc<EnrollmentService>,
    overview: Arc<OverviewService>,
}

impl CourseServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `CourseServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, CourseServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(storage, clock))
    }

    /// Build services over volatile storage, for tests and demos.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: Storage, clock: Clock) -> Self {
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.enrollments),
            Arc::clone(&storage.progress),
        ));
        let attempts = Arc::new(AttemptService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.assessments),
            Arc::clone(&storage.attempts),
            Arc::clone(&progress),
        ));
        let enrollments = Arc::new(EnrollmentService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.enrollments),
        ));
        let overview = Arc::new(OverviewService::new(
            Arc::clone(&storage.courses),
            Arc::clone(&storage.assessments),
            Arc::clone(&storage.enrollments),
            Arc::clone(&storage.attempts),
            Arc::clone(&storage.progress),
        ));

        Self {
            storage,
            attempts,
            progress,
            enrollments,
            overview,
        }
    }

    /// Raw repositories, for authoring course content.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn attempts(&self) -> Arc<AttemptService> {
        Arc::clone(&self.attempts)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn enrollments(&self) -> Arc<EnrollmentService> {
        Arc::clone(&self.enrollments)
    }

    #[must_use]
    pub fn overview(&self) -> Arc<OverviewService> {
        Arc::clone(&self.overview)
    }
}
