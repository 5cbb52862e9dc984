use std::num::NonZeroU32;

use academy_core::model::{
    Answer, AnswerId, Assessment, Course, CourseId, CourseItem, CourseItemId, CourseItemKind,
    Question, QuestionId, QuestionKind,
};
use storage::repository::{AssessmentRepository, CourseRepository, Storage};

use crate::AppError;

pub const DEMO_COURSE_ID: CourseId = CourseId::new(1);

fn answer(id: u64, text: &str, is_correct: bool, position: u32) -> Answer {
    Answer {
        id: AnswerId::new(id),
        text: text.to_owned(),
        is_correct,
        position,
    }
}

fn question(
    id: u64,
    kind: QuestionKind,
    text: &str,
    points: u32,
    position: u32,
    answers: Vec<Answer>,
) -> Question {
    Question {
        id: QuestionId::new(id),
        kind,
        text: text.to_owned(),
        points,
        position,
        answers,
    }
}

/// Upsert a small demo course: two chapters, a quiz, a one-shot exam and an
/// optional chapter. Running it again leaves the same content in place.
///
/// # Errors
///
/// Returns `AppError` if the content is invalid or cannot be stored.
pub async fn seed_demo(storage: &Storage) -> Result<Course, AppError> {
    let course = Course::new(DEMO_COURSE_ID, "Rust fundamentals", "rust-fundamentals")?;
    storage.courses.upsert_course(&course).await?;

    let items = [
        (101, CourseItemKind::Chapter, "Ownership", true),
        (102, CourseItemKind::Chapter, "Borrowing", true),
        (103, CourseItemKind::Quiz, "Ownership check", true),
        (104, CourseItemKind::Exam, "Final exam", true),
        (105, CourseItemKind::Chapter, "Further reading", false),
    ];
    for (position, (id, kind, title, is_required)) in (0_u32..).zip(items) {
        storage
            .courses
            .upsert_course_item(&CourseItem {
                id: CourseItemId::new(id),
                course_id: course.id,
                kind,
                title: title.to_owned(),
                position,
                is_required,
            })
            .await?;
    }

    let quiz = Assessment {
        course_item_id: CourseItemId::new(103),
        min_pass_score: 2,
        attempts_limit: None,
        time_limit_sec: Some(600),
        shuffle_questions: false,
        questions: vec![
            question(
                1031,
                QuestionKind::Single,
                "What happens to a String moved into a function?",
                1,
                0,
                vec![
                    answer(10311, "The caller keeps using it", false, 0),
                    answer(10312, "Ownership moves to the callee", true, 1),
                ],
            ),
            question(
                1032,
                QuestionKind::Multi,
                "Which types are Copy?",
                1,
                1,
                vec![
                    answer(10321, "u32", true, 0),
                    answer(10322, "String", false, 1),
                    answer(10323, "bool", true, 2),
                ],
            ),
            question(
                1033,
                QuestionKind::Text,
                "Explain a dangling reference in one sentence.",
                0,
                2,
                Vec::new(),
            ),
        ],
    };

    let exam = Assessment {
        course_item_id: CourseItemId::new(104),
        min_pass_score: 2,
        attempts_limit: NonZeroU32::new(1),
        time_limit_sec: Some(1800),
        shuffle_questions: true,
        questions: vec![
            question(
                1041,
                QuestionKind::Single,
                "How many mutable borrows may coexist?",
                1,
                0,
                vec![
                    answer(10411, "One", true, 0),
                    answer(10412, "Unlimited", false, 1),
                ],
            ),
            question(
                1042,
                QuestionKind::Single,
                "Which keyword lists trait bounds after a signature?",
                1,
                1,
                vec![
                    answer(10421, "where", true, 0),
                    answer(10422, "unsafe", false, 1),
                ],
            ),
        ],
    };

    for assessment in [quiz, exam] {
        assessment.validate()?;
        storage.assessments.upsert_assessment(&assessment).await?;
    }

    tracing::info!(course_id = %course.id, slug = %course.slug, "demo course seeded");
    Ok(course)
}
