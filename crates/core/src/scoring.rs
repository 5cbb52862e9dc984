//! Grading of quiz and exam submissions.
//!
//! Grading is a pure function of the assessment definition and the submitted
//! payload. The loosely typed payload is normalized once per question, keyed by
//! the question's declared kind, before any rule runs.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{AnswerId, Assessment, AttemptAnswer, Question, QuestionId, QuestionKind};

//
// ─── SUBMISSION ───────────────────────────────────────────────────────────────
//

/// Raw answers keyed by stringified question id, as sent by clients.
///
/// Values may be an answer id (number or numeric string), a list of ids,
/// free text, or null/absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Submission(HashMap<String, Value>);

impl Submission {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, question: QuestionId, value: impl Into<Value>) -> Self {
        self.insert(question, value);
        self
    }

    pub fn insert(&mut self, question: QuestionId, value: impl Into<Value>) {
        self.0.insert(question.to_string(), value.into());
    }

    #[must_use]
    pub fn raw(&self, question: QuestionId) -> Option<&Value> {
        self.0.get(&question.to_string())
    }
}

impl From<HashMap<String, Value>> for Submission {
    fn from(map: HashMap<String, Value>) -> Self {
        Self(map)
    }
}

//
// ─── NORMALIZATION ────────────────────────────────────────────────────────────
//

/// One coerced answer choice.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Choice {
    Id(AnswerId),
    /// A finite number no answer can carry (zero, negative, fractional or
    /// beyond the id range), kept as written. It never matches an answer.
    Invalid(String),
}

impl Choice {
    fn into_parts(self) -> (Option<AnswerId>, Option<String>) {
        match self {
            Self::Id(id) => (Some(id), None),
            Self::Invalid(raw) => (None, Some(raw)),
        }
    }
}

/// Strict per-question answer after coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedAnswer {
    Skipped,
    Choice(Choice),
    /// Distinct choices in first-seen order; never empty.
    Choices(Vec<Choice>),
    /// Trimmed; never empty.
    Text(String),
}

impl NormalizedAnswer {
    /// Coerce a raw payload value according to the question kind.
    ///
    /// Choices are finite numbers, given either as JSON numbers or numeric
    /// strings. A single choice of 0 counts as no answer. Anything that is not
    /// a finite number is dropped, and a value without the shape the kind
    /// expects is treated as skipped.
    #[must_use]
    pub fn from_raw(kind: QuestionKind, raw: Option<&Value>) -> Self {
        let Some(raw) = raw else {
            return Self::Skipped;
        };

        match kind {
            QuestionKind::Single => match coerce(raw) {
                None | Some(Coerced::Zero) => Self::Skipped,
                Some(coerced) => Self::Choice(coerced.into_choice()),
            },
            QuestionKind::Multi => {
                let Value::Array(items) = raw else {
                    return Self::Skipped;
                };
                let mut seen = BTreeSet::new();
                let choices: Vec<Choice> = items
                    .iter()
                    .filter_map(coerce)
                    .map(Coerced::into_choice)
                    .filter(|choice| seen.insert(choice.clone()))
                    .collect();
                if choices.is_empty() {
                    Self::Skipped
                } else {
                    Self::Choices(choices)
                }
            }
            QuestionKind::Text => match raw {
                Value::String(s) if !s.trim().is_empty() => Self::Text(s.trim().to_owned()),
                _ => Self::Skipped,
            },
        }
    }
}

enum Coerced {
    Zero,
    Id(AnswerId),
    OutOfRange(String),
}

impl Coerced {
    fn into_choice(self) -> Choice {
        match self {
            Self::Zero => Choice::Invalid("0".to_owned()),
            Self::Id(id) => Choice::Id(id),
            Self::OutOfRange(raw) => Choice::Invalid(raw),
        }
    }
}

// ids are stored as SQLite integers
const MAX_ID: u64 = i64::MAX as u64;

fn coerce(value: &Value) -> Option<Coerced> {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                Some(from_u64(v))
            } else if let Some(v) = n.as_i64() {
                Some(Coerced::OutOfRange(v.to_string()))
            } else {
                n.as_f64().and_then(from_f64)
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(v) = s.parse::<u64>() {
                Some(from_u64(v))
            } else if let Ok(v) = s.parse::<i64>() {
                Some(Coerced::OutOfRange(v.to_string()))
            } else {
                s.parse::<f64>().ok().and_then(from_f64)
            }
        }
        _ => None,
    }
}

fn from_u64(v: u64) -> Coerced {
    match v {
        0 => Coerced::Zero,
        v if v <= MAX_ID => Coerced::Id(AnswerId::new(v)),
        v => Coerced::OutOfRange(v.to_string()),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn from_f64(f: f64) -> Option<Coerced> {
    if !f.is_finite() {
        return None;
    }
    if f == 0.0 {
        return Some(Coerced::Zero);
    }
    // `MAX_ID as f64` rounds up to 2^63, so the bound is exclusive
    if f > 0.0 && f.fract() == 0.0 && f < MAX_ID as f64 {
        return Some(from_u64(f as u64));
    }
    Some(Coerced::OutOfRange(f.to_string()))
}

//
// ─── RESULTS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuestionOutcome {
    Correct,
    Wrong,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub outcome: QuestionOutcome,
    pub points_awarded: u32,
}

/// Per-outcome tallies; every question lands in exactly one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttemptStats {
    pub questions: u32,
    pub correct: u32,
    pub wrong: u32,
    pub skipped: u32,
}

impl AttemptStats {
    fn record(&mut self, outcome: QuestionOutcome) {
        self.questions += 1;
        match outcome {
            QuestionOutcome::Correct => self.correct += 1,
            QuestionOutcome::Wrong => self.wrong += 1,
            QuestionOutcome::Skipped => self.skipped += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedAttempt {
    pub score: u32,
    pub total_points: u32,
    pub percent: u8,
    pub passed: bool,
    pub stats: AttemptStats,
    pub results: Vec<QuestionResult>,
    /// Audit rows in question order.
    pub answers: Vec<AttemptAnswer>,
}

//
// ─── GRADING ──────────────────────────────────────────────────────────────────
//

/// Grade a submission against an assessment.
///
/// Questions are visited in the order the assessment holds them. A question
/// earns its full points or nothing.
#[must_use]
pub fn grade(assessment: &Assessment, submission: &Submission) -> GradedAttempt {
    let mut score = 0_u32;
    let mut stats = AttemptStats::default();
    let mut results = Vec::with_capacity(assessment.questions.len());
    let mut answers = Vec::with_capacity(assessment.questions.len());

    for question in &assessment.questions {
        let normalized = NormalizedAnswer::from_raw(question.kind, submission.raw(question.id));
        let (outcome, rows) = grade_question(question, normalized);
        let points_awarded = if outcome == QuestionOutcome::Correct {
            question.points
        } else {
            0
        };

        score = score.saturating_add(points_awarded);
        stats.record(outcome);
        results.push(QuestionResult {
            question_id: question.id,
            outcome,
            points_awarded,
        });
        answers.extend(rows);
    }

    let total_points = assessment.total_points();

    GradedAttempt {
        score,
        total_points,
        percent: percent_of(score, total_points),
        passed: score >= assessment.min_pass_score,
        stats,
        results,
        answers,
    }
}

/// `round(score / total * 100)`, rounding halves up; 0 when `total` is 0.
#[must_use]
pub fn percent_of(score: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let score = u64::from(score.min(total));
    let total = u64::from(total);
    let rounded = (score * 200 + total) / (total * 2);
    u8::try_from(rounded).unwrap_or(100)
}

fn grade_question(
    question: &Question,
    answer: NormalizedAnswer,
) -> (QuestionOutcome, Vec<AttemptAnswer>) {
    let row = |answer_id: Option<AnswerId>, text: Option<String>, is_correct, points| AttemptAnswer {
        question_id: question.id,
        answer_id,
        text_answer: text,
        is_correct,
        points_awarded: points,
    };

    match answer {
        NormalizedAnswer::Skipped => (QuestionOutcome::Skipped, vec![row(None, None, false, 0)]),

        NormalizedAnswer::Choice(Choice::Id(id)) if question.is_correct_answer(id) => (
            QuestionOutcome::Correct,
            vec![row(Some(id), None, true, question.points)],
        ),

        NormalizedAnswer::Choice(choice) => {
            let (answer_id, raw) = choice.into_parts();
            (QuestionOutcome::Wrong, vec![row(answer_id, raw, false, 0)])
        }

        NormalizedAnswer::Choices(choices) => {
            let correct = question.correct_answer_ids();
            let mut selected = BTreeSet::new();
            let mut all_valid = true;
            for choice in &choices {
                match choice {
                    Choice::Id(id) => {
                        selected.insert(*id);
                    }
                    Choice::Invalid(_) => all_valid = false,
                }
            }
            let is_correct = all_valid && !correct.is_empty() && selected == correct;
            let outcome = if is_correct {
                QuestionOutcome::Correct
            } else {
                QuestionOutcome::Wrong
            };
            let awarded = if is_correct { question.points } else { 0 };
            let rows = choices
                .into_iter()
                .enumerate()
                .map(|(index, choice)| {
                    let points = if index == 0 { awarded } else { 0 };
                    let (answer_id, raw) = choice.into_parts();
                    row(answer_id, raw, is_correct, points)
                })
                .collect();
            (outcome, rows)
        }

        // free text is never auto-graded correct
        NormalizedAnswer::Text(text) => (QuestionOutcome::Wrong, vec![row(None, Some(text), false, 0)]),
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
