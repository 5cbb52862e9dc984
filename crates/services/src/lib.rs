#![forbid(unsafe_code)]

pub mod app_services;
pub mod attempt_locks;
pub mod attempt_service;
pub mod enrollment_service;
pub mod error;
pub mod overview_service;
pub mod progress_service;

pub use academy_core::Clock;

pub use app_services::CourseServices;
pub use attempt_service::{AttemptOutcome, AttemptService};
pub use enrollment_service::{EnrolledCourse, EnrollmentService};
pub use error::{CourseServiceError, CourseServicesError, ErrorKind, RejectionReason};
pub use overview_service::{AssessmentInfo, CourseOverview, OverviewItem, OverviewService};
pub use progress_service::{ProgressService, ProgressView, ReadProgressOutcome};
