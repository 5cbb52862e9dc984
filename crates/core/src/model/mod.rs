mod assessment;
mod attempt;
mod course;
mod ids;
mod progress;

pub use ids::{AnswerId, AttemptId, CourseId, CourseItemId, ParseIdError, QuestionId, UserId};

pub use assessment::{Answer, Assessment, AssessmentError, Question, QuestionKind};
pub use attempt::{AssessmentAttempt, AttemptAnswer, AttemptHistory, AttemptSummary, NewAttempt};
pub use course::{Course, CourseError, CourseItem, CourseItemKind, Enrollment, RequiredItem};
pub use progress::{CompletionMarker, CourseProgress, ProgressError, ReadPercent};
