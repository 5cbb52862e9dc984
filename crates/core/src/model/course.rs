use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{CourseId, CourseItemId, UserId};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("unknown course item kind: {0}")]
    UnknownItemKind(String),

    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("course slug cannot be empty")]
    EmptySlug,
}

//
// ─── COURSE ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub slug: String,
}

impl Course {
    /// Build a course, trimming title and slug.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyTitle` or `CourseError::EmptySlug` for blank input.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        slug: impl Into<String>,
    ) -> Result<Self, CourseError> {
        let title = title.into().trim().to_owned();
        let slug = slug.into().trim().to_owned();
        if title.is_empty() {
            return Err(CourseError::EmptyTitle);
        }
        if slug.is_empty() {
            return Err(CourseError::EmptySlug);
        }
        Ok(Self { id, title, slug })
    }
}

//
// ─── COURSE ITEMS ─────────────────────────────────────────────────────────────
//

/// Kind of node in a course's content tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CourseItemKind {
    Chapter,
    Quiz,
    Exam,
}

impl CourseItemKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CourseItemKind::Chapter => "CHAPTER",
            CourseItemKind::Quiz => "QUIZ",
            CourseItemKind::Exam => "EXAM",
        }
    }

    /// Quizzes and exams carry an assessment; chapters do not.
    #[must_use]
    pub fn is_assessment(self) -> bool {
        matches!(self, CourseItemKind::Quiz | CourseItemKind::Exam)
    }
}

impl fmt::Display for CourseItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CourseItemKind {
    type Err = CourseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CHAPTER" => Ok(CourseItemKind::Chapter),
            "QUIZ" => Ok(CourseItemKind::Quiz),
            "EXAM" => Ok(CourseItemKind::Exam),
            other => Err(CourseError::UnknownItemKind(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseItem {
    pub id: CourseItemId,
    pub course_id: CourseId,
    pub kind: CourseItemKind,
    pub title: String,
    pub position: u32,
    pub is_required: bool,
}

/// The slice of a course item the progress aggregator needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredItem {
    pub id: CourseItemId,
    pub kind: CourseItemKind,
}

impl From<&CourseItem> for RequiredItem {
    fn from(item: &CourseItem) -> Self {
        Self {
            id: item.id,
            kind: item.kind,
        }
    }
}

//
// ─── ENROLLMENT ───────────────────────────────────────────────────────────────
//

/// Active enrollment of a user in a course. Unique per (user, course).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enrollment {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub activated_at: DateTime<Utc>,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_kind_parses_storage_names() {
        assert_eq!("EXAM".parse::<CourseItemKind>().unwrap(), CourseItemKind::Exam);
        assert_eq!(CourseItemKind::Chapter.to_string(), "CHAPTER");
        let err = "LESSON".parse::<CourseItemKind>().unwrap_err();
        assert_eq!(err, CourseError::UnknownItemKind("LESSON".into()));
    }

    #[test]
    fn only_quiz_and_exam_are_assessments() {
        assert!(CourseItemKind::Quiz.is_assessment());
        assert!(CourseItemKind::Exam.is_assessment());
        assert!(!CourseItemKind::Chapter.is_assessment());
    }

    #[test]
    fn course_rejects_blank_title() {
        let err = Course::new(CourseId::new(1), "  ", "rust").unwrap_err();
        assert_eq!(err, CourseError::EmptyTitle);

        let course = Course::new(CourseId::new(1), " Rust 101 ", "rust-101").unwrap();
        assert_eq!(course.title, "Rust 101");
    }
}
