use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{AnswerId, CourseItemId, QuestionId};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssessmentError {
    #[error("unknown question kind: {0}")]
    UnknownQuestionKind(String),

    #[error("text question {0} cannot have answer options")]
    TextQuestionWithAnswers(QuestionId),

    #[error("duplicate question id {0}")]
    DuplicateQuestion(QuestionId),

    #[error("duplicate answer id {answer} in question {question}")]
    DuplicateAnswer {
        question: QuestionId,
        answer: AnswerId,
    },
}

//
// ─── QUESTION KIND ────────────────────────────────────────────────────────────
//

/// How a question is answered and graded.
///
/// - `Single`: one answer id, graded against the options flagged correct
/// - `Multi`: a set of answer ids, graded by exact set equality
/// - `Text`: free text, kept for manual review and never auto-graded correct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuestionKind {
    Single,
    Multi,
    Text,
}

impl QuestionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::Single => "SINGLE",
            QuestionKind::Multi => "MULTI",
            QuestionKind::Text => "TEXT",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionKind {
    type Err = AssessmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SINGLE" => Ok(QuestionKind::Single),
            "MULTI" => Ok(QuestionKind::Multi),
            "TEXT" => Ok(QuestionKind::Text),
            other => Err(AssessmentError::UnknownQuestionKind(other.to_owned())),
        }
    }
}

//
// ─── ASSESSMENT TREE ──────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub id: AnswerId,
    pub text: String,
    pub is_correct: bool,
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub id: QuestionId,
    pub kind: QuestionKind,
    pub text: String,
    pub points: u32,
    pub position: u32,
    pub answers: Vec<Answer>,
}

impl Question {
    /// Ids of every option flagged correct.
    #[must_use]
    pub fn correct_answer_ids(&self) -> BTreeSet<AnswerId> {
        self.answers
            .iter()
            .filter(|a| a.is_correct)
            .map(|a| a.id)
            .collect()
    }

    /// True when `id` names one of this question's options and that option is correct.
    #[must_use]
    pub fn is_correct_answer(&self, id: AnswerId) -> bool {
        self.answers.iter().any(|a| a.id == id && a.is_correct)
    }
}

/// Quiz or exam definition attached to a course item.
///
/// `time_limit_sec` and `shuffle_questions` are informational for the
/// presentation layer; grading ignores both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assessment {
    pub course_item_id: CourseItemId,
    pub min_pass_score: u32,
    pub attempts_limit: Option<NonZeroU32>,
    pub time_limit_sec: Option<u32>,
    pub shuffle_questions: bool,
    pub questions: Vec<Question>,
}

impl Assessment {
    /// Sum of points over all questions, regardless of what gets answered.
    #[must_use]
    pub fn total_points(&self) -> u32 {
        self.questions
            .iter()
            .fold(0_u32, |acc, q| acc.saturating_add(q.points))
    }

    /// Check structural invariants that authoring must uphold.
    ///
    /// Single-choice questions may have several options flagged correct; any of
    /// them is accepted when grading.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError` for duplicate ids or text questions with options.
    pub fn validate(&self) -> Result<(), AssessmentError> {
        let mut question_ids = BTreeSet::new();
        for question in &self.questions {
            if !question_ids.insert(question.id) {
                return Err(AssessmentError::DuplicateQuestion(question.id));
            }
            if question.kind == QuestionKind::Text && !question.answers.is_empty() {
                return Err(AssessmentError::TextQuestionWithAnswers(question.id));
            }
            let mut answer_ids = BTreeSet::new();
            for answer in &question.answers {
                if !answer_ids.insert(answer.id) {
                    return Err(AssessmentError::DuplicateAnswer {
                        question: question.id,
                        answer: answer.id,
                    });
                }
            }
        }
        Ok(())
    }

    /// Orders questions and their answers by position, keeping ties stable.
    pub fn sort_by_position(&mut self) {
        self.questions.sort_by_key(|q| q.position);
        for question in &mut self.questions {
            question.answers.sort_by_key(|a| a.position);
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(id: u64, is_correct: bool, position: u32) -> Answer {
        Answer {
            id: AnswerId::new(id),
            text: format!("option {id}"),
            is_correct,
            position,
        }
    }

    fn question(id: u64, kind: QuestionKind, points: u32, answers: Vec<Answer>) -> Question {
        Question {
            id: QuestionId::new(id),
            kind,
            text: format!("question {id}"),
            points,
            position: u32::try_from(id).unwrap(),
            answers,
        }
    }

    fn assessment(questions: Vec<Question>) -> Assessment {
        Assessment {
            course_item_id: CourseItemId::new(1),
            min_pass_score: 0,
            attempts_limit: None,
            time_limit_sec: None,
            shuffle_questions: false,
            questions,
        }
    }

    #[test]
    fn total_points_sums_every_question() {
        let a = assessment(vec![
            question(1, QuestionKind::Single, 2, vec![answer(1, true, 0)]),
            question(2, QuestionKind::Multi, 3, vec![answer(2, true, 0)]),
            question(3, QuestionKind::Text, 0, vec![]),
        ]);
        assert_eq!(a.total_points(), 5);
    }

    #[test]
    fn correct_ids_only_include_flagged_options() {
        let q = question(
            1,
            QuestionKind::Multi,
            1,
            vec![answer(10, true, 0), answer(11, false, 1), answer(12, true, 2)],
        );
        let ids: Vec<u64> = q.correct_answer_ids().iter().map(AnswerId::value).collect();
        assert_eq!(ids, vec![10, 12]);
        assert!(q.is_correct_answer(AnswerId::new(12)));
        assert!(!q.is_correct_answer(AnswerId::new(11)));
        assert!(!q.is_correct_answer(AnswerId::new(99)));
    }

    #[test]
    fn validate_rejects_text_question_with_options() {
        let a = assessment(vec![question(
            4,
            QuestionKind::Text,
            0,
            vec![answer(1, false, 0)],
        )]);
        assert_eq!(
            a.validate().unwrap_err(),
            AssessmentError::TextQuestionWithAnswers(QuestionId::new(4))
        );
    }

    #[test]
    fn validate_rejects_duplicate_answers() {
        let a = assessment(vec![question(
            1,
            QuestionKind::Single,
            1,
            vec![answer(5, true, 0), answer(5, false, 1)],
        )]);
        assert!(matches!(
            a.validate().unwrap_err(),
            AssessmentError::DuplicateAnswer { .. }
        ));
    }

    #[test]
    fn sort_by_position_orders_questions_and_answers() {
        let mut a = assessment(vec![
            question(3, QuestionKind::Single, 1, vec![answer(2, false, 5), answer(1, true, 1)]),
            question(1, QuestionKind::Text, 0, vec![]),
        ]);
        a.sort_by_position();
        assert_eq!(a.questions[0].id, QuestionId::new(1));
        assert_eq!(a.questions[1].answers[0].id, AnswerId::new(1));
    }

    #[test]
    fn question_kind_round_trips_names() {
        for kind in [QuestionKind::Single, QuestionKind::Multi, QuestionKind::Text] {
            assert_eq!(kind.as_str().parse::<QuestionKind>().unwrap(), kind);
        }
        assert!("ESSAY".parse::<QuestionKind>().is_err());
    }
}
