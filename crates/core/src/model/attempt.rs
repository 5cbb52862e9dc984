use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::ids::{AnswerId, AttemptId, CourseItemId, QuestionId, UserId};

/// One audit row of a graded attempt.
///
/// Multi-choice questions produce one row per selected option; the awarded
/// points sit on the first row only so that summing rows matches the score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptAnswer {
    pub question_id: QuestionId,
    pub answer_id: Option<AnswerId>,
    pub text_answer: Option<String>,
    pub is_correct: bool,
    pub points_awarded: u32,
}

/// A graded attempt that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttempt {
    pub user_id: UserId,
    pub assessment_id: CourseItemId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub score: u32,
    pub passed: bool,
    pub answers: Vec<AttemptAnswer>,
}

impl NewAttempt {
    #[must_use]
    pub fn assign_id(self, id: AttemptId) -> AssessmentAttempt {
        AssessmentAttempt {
            id,
            user_id: self.user_id,
            assessment_id: self.assessment_id,
            started_at: self.started_at,
            finished_at: self.finished_at,
            score: self.score,
            passed: self.passed,
            answers: self.answers,
        }
    }
}

/// Persisted attempt. Attempts are append-only and never edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentAttempt {
    pub id: AttemptId,
    pub user_id: UserId,
    pub assessment_id: CourseItemId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub score: u32,
    pub passed: bool,
    pub answers: Vec<AttemptAnswer>,
}

impl AssessmentAttempt {
    #[must_use]
    pub fn summary(&self) -> AttemptSummary {
        AttemptSummary {
            id: self.id,
            assessment_id: self.assessment_id,
            started_at: self.started_at,
            finished_at: Some(self.finished_at),
            score: self.score,
            passed: self.passed,
        }
    }
}

/// Attempt header without the answer rows, used for "latest attempt" views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptSummary {
    pub id: AttemptId,
    pub assessment_id: CourseItemId,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub score: u32,
    pub passed: bool,
}

/// What the policy gate needs to know about a user's earlier attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptHistory {
    pub attempts: u32,
    pub passed_any: bool,
}
