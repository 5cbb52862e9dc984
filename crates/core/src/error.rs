use thiserror::Error;

use crate::model::{AssessmentError, CourseError, ProgressError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
}
