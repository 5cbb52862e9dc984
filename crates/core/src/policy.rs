use std::num::NonZeroU32;
use thiserror::Error;

use crate::model::{AttemptHistory, CourseItemKind};

/// Business-rule refusals for a new attempt.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AttemptRejection {
    #[error("exam already passed")]
    AlreadyPassed,

    #[error("attempts limit reached ({attempts}/{limit})")]
    LimitReached { limit: u32, attempts: u32 },
}

/// Decide whether a user may start another attempt.
///
/// A passed exam is closed for good, whatever its limit. Any assessment with
/// an `attempts_limit` refuses once that many attempts exist; passed or not.
/// Quizzes without a limit stay open, also after a pass.
///
/// # Errors
///
/// Returns the first `AttemptRejection` that applies.
pub fn check_new_attempt(
    kind: CourseItemKind,
    attempts_limit: Option<NonZeroU32>,
    history: AttemptHistory,
) -> Result<(), AttemptRejection> {
    if kind == CourseItemKind::Exam && history.passed_any {
        return Err(AttemptRejection::AlreadyPassed);
    }

    match attempts_limit {
        Some(limit) if history.attempts >= limit.get() => {
            return Err(AttemptRejection::LimitReached {
                limit: limit.get(),
                attempts: history.attempts,
            });
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(attempts: u32, passed_any: bool) -> AttemptHistory {
        AttemptHistory {
            attempts,
            passed_any,
        }
    }

    #[test]
    fn unlimited_quiz_can_be_retaken_after_pass() {
        assert!(check_new_attempt(CourseItemKind::Quiz, None, history(12, true)).is_ok());
    }

    #[test]
    fn passed_exam_is_closed_even_with_room_left() {
        let limit = NonZeroU32::new(5);
        assert_eq!(
            check_new_attempt(CourseItemKind::Exam, limit, history(1, true)),
            Err(AttemptRejection::AlreadyPassed)
        );
        assert_eq!(
            check_new_attempt(CourseItemKind::Exam, None, history(1, true)),
            Err(AttemptRejection::AlreadyPassed)
        );
    }

    #[test]
    fn limit_counts_failed_attempts_too() {
        let limit = NonZeroU32::new(1);
        assert!(check_new_attempt(CourseItemKind::Exam, limit, history(0, false)).is_ok());
        assert_eq!(
            check_new_attempt(CourseItemKind::Exam, limit, history(1, false)),
            Err(AttemptRejection::LimitReached {
                limit: 1,
                attempts: 1
            })
        );
    }

    #[test]
    fn quiz_limit_applies_after_pass() {
        let limit = NonZeroU32::new(2);
        assert!(check_new_attempt(CourseItemKind::Quiz, limit, history(1, true)).is_ok());
        assert!(check_new_attempt(CourseItemKind::Quiz, limit, history(2, true)).is_err());
    }
}
