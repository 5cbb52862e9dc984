use std::num::NonZeroU32;
use std::sync::Arc;

use academy_core::model::{
    Answer, AnswerId, Assessment, Course, CourseId, CourseItem, CourseItemId, CourseItemKind,
    Question, QuestionId, QuestionKind, UserId,
};
use academy_core::scoring::Submission;
use academy_core::time::fixed_clock;
use pretty_assertions::assert_eq;
use services::{CourseServiceError, CourseServices, ErrorKind, RejectionReason};
use storage::repository::{
    AssessmentRepository, AttemptRepository, CourseRepository, ProgressRepository,
};

const USER: UserId = UserId::new(1);
const COURSE: CourseId = CourseId::new(1);
const CHAPTER: CourseItemId = CourseItemId::new(10);
const QUIZ: CourseItemId = CourseItemId::new(20);
const EXAM: CourseItemId = CourseItemId::new(30);
const BARE_QUIZ: CourseItemId = CourseItemId::new(40);

fn single(id: u64, correct: u64, wrong: u64) -> Question {
    Question {
        id: QuestionId::new(id),
        kind: QuestionKind::Single,
        text: format!("question {id}"),
        points: 1,
        position: u32::try_from(id).unwrap(),
        answers: vec![
            Answer {
                id: AnswerId::new(correct),
                text: "right".into(),
                is_correct: true,
                position: 0,
            },
            Answer {
                id: AnswerId::new(wrong),
                text: "wrong".into(),
                is_correct: false,
                position: 1,
            },
        ],
    }
}

fn item(id: CourseItemId, kind: CourseItemKind, position: u32) -> CourseItem {
    CourseItem {
        id,
        course_id: COURSE,
        kind,
        title: format!("{kind} {id}"),
        position,
        is_required: true,
    }
}

async fn seed(exam_limit: Option<u32>) -> CourseServices {
    let services = CourseServices::in_memory(fixed_clock());
    let storage = services.storage();

    storage
        .courses
        .upsert_course(&Course::new(COURSE, "Testing 101", "testing-101").unwrap())
        .await
        .unwrap();
    for (position, (id, kind)) in [
        (CHAPTER, CourseItemKind::Chapter),
        (QUIZ, CourseItemKind::Quiz),
        (EXAM, CourseItemKind::Exam),
        (BARE_QUIZ, CourseItemKind::Quiz),
    ]
    .into_iter()
    .enumerate()
    {
        let position = u32::try_from(position).unwrap();
        storage
            .courses
            .upsert_course_item(&item(id, kind, position))
            .await
            .unwrap();
    }

    storage
        .assessments
        .upsert_assessment(&Assessment {
            course_item_id: QUIZ,
            min_pass_score: 2,
            attempts_limit: None,
            time_limit_sec: None,
            shuffle_questions: false,
            questions: vec![single(1, 11, 12), single(2, 21, 22)],
        })
        .await
        .unwrap();
    storage
        .assessments
        .upsert_assessment(&Assessment {
            course_item_id: EXAM,
            min_pass_score: 1,
            attempts_limit: exam_limit.and_then(NonZeroU32::new),
            time_limit_sec: Some(900),
            shuffle_questions: false,
            questions: vec![single(3, 31, 32)],
        })
        .await
        .unwrap();

    services.enrollments().enroll(USER, COURSE).await.unwrap();
    services
}

fn quiz_answers(first: u64, second: u64) -> Submission {
    Submission::new()
        .with(QuestionId::new(1), first)
        .with(QuestionId::new(2), second)
}

#[tokio::test]
async fn one_correct_answer_fails_without_touching_progress() {
    let services = seed(None).await;

    let outcome = services
        .attempts()
        .submit_attempt(USER, QUIZ, &quiz_answers(11, 22))
        .await
        .unwrap();

    assert_eq!(outcome.score, 1);
    assert_eq!(outcome.total_points, 2);
    assert_eq!(outcome.percent, 50);
    assert!(!outcome.passed);
    assert_eq!(outcome.stats.correct, 1);
    assert_eq!(outcome.stats.wrong, 1);
    assert!(outcome.progress.is_none());

    let storage = services.storage();
    assert!(
        storage
            .progress
            .completed_items(USER, &[QUIZ])
            .await
            .unwrap()
            .is_empty()
    );
    assert!(
        storage
            .progress
            .get_course_progress(USER, COURSE)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn both_correct_passes_marks_and_recomputes() {
    let services = seed(None).await;

    let outcome = services
        .attempts()
        .submit_attempt(USER, QUIZ, &quiz_answers(11, 21))
        .await
        .unwrap();

    assert_eq!(outcome.score, 2);
    assert_eq!(outcome.percent, 100);
    assert!(outcome.passed);

    let progress = outcome.progress.expect("progress recomputed");
    // one of four required items
    assert_eq!(progress.progress_percent, 25);
    assert!(!progress.finished);

    let done = services
        .storage()
        .progress
        .completed_items(USER, &[QUIZ])
        .await
        .unwrap();
    assert!(done.contains(&QUIZ));

    let stored = services
        .storage()
        .attempts
        .get_attempt(outcome.attempt_id)
        .await
        .unwrap()
        .expect("attempt stored");
    assert_eq!(stored.answers.len(), 2);
    assert_eq!(stored.score, 2);
}

#[tokio::test]
async fn numeric_strings_and_skips_are_graded() {
    let services = seed(None).await;
    let submission = Submission::new().with(QuestionId::new(1), "11");

    let outcome = services
        .attempts()
        .submit_attempt(USER, QUIZ, &submission)
        .await
        .unwrap();

    assert_eq!(outcome.score, 1);
    assert_eq!(outcome.stats.correct, 1);
    assert_eq!(outcome.stats.skipped, 1);
    assert_eq!(outcome.stats.questions, 2);
}

#[tokio::test]
async fn exam_with_limit_one_rejects_the_second_attempt() {
    let services = seed(Some(1)).await;
    let attempts = services.attempts();
    let failing = Submission::new().with(QuestionId::new(3), 32);

    let first = attempts.submit_attempt(USER, EXAM, &failing).await.unwrap();
    assert!(!first.passed);

    let err = attempts
        .submit_attempt(USER, EXAM, &failing)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Rejected);
    assert_eq!(err.rejection_reason(), Some(RejectionReason::LimitReached));

    let history = services
        .storage()
        .attempts
        .attempt_history(USER, EXAM)
        .await
        .unwrap();
    assert_eq!(history.attempts, 1);
}

#[tokio::test]
async fn passed_exam_is_closed_regardless_of_limit() {
    let services = seed(Some(5)).await;
    let attempts = services.attempts();
    let passing = Submission::new().with(QuestionId::new(3), 31);

    assert!(attempts.submit_attempt(USER, EXAM, &passing).await.unwrap().passed);

    let err = attempts
        .submit_attempt(USER, EXAM, &passing)
        .await
        .unwrap_err();
    assert_eq!(err.rejection_reason(), Some(RejectionReason::AlreadyPassed));
}

#[tokio::test]
async fn quiz_without_limit_can_be_retaken_after_passing() {
    let services = seed(None).await;
    let attempts = services.attempts();

    for _ in 0..3 {
        let outcome = attempts
            .submit_attempt(USER, QUIZ, &quiz_answers(11, 21))
            .await
            .unwrap();
        assert!(outcome.passed);
    }

    let history = services
        .storage()
        .attempts
        .attempt_history(USER, QUIZ)
        .await
        .unwrap();
    assert_eq!(history.attempts, 3);
}

#[tokio::test]
async fn gate_failures_map_to_their_kinds() {
    let services = seed(None).await;
    let attempts = services.attempts();
    let empty = Submission::new();

    let err = attempts
        .submit_attempt(USER, CourseItemId::new(999), &empty)
        .await
        .unwrap_err();
    assert!(matches!(err, CourseServiceError::ItemNotFound(_)));

    let err = attempts
        .submit_attempt(USER, CHAPTER, &empty)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidType);

    let err = attempts
        .submit_attempt(USER, BARE_QUIZ, &empty)
        .await
        .unwrap_err();
    assert!(matches!(err, CourseServiceError::AssessmentNotFound(_)));

    let stranger = UserId::new(2);
    let err = attempts
        .submit_attempt(stranger, QUIZ, &quiz_answers(11, 21))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let history = services
        .storage()
        .attempts
        .attempt_history(stranger, QUIZ)
        .await
        .unwrap();
    assert_eq!(history.attempts, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_respect_the_limit() {
    let services = seed(Some(1)).await;
    let attempts = services.attempts();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let attempts = Arc::clone(&attempts);
            tokio::spawn(async move {
                let failing = Submission::new().with(QuestionId::new(3), 32);
                attempts.submit_attempt(USER, EXAM, &failing).await
            })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(err) => assert_eq!(err.kind(), ErrorKind::Rejected),
        }
    }
    assert_eq!(accepted, 1);

    let history = services
        .storage()
        .attempts
        .attempt_history(USER, EXAM)
        .await
        .unwrap();
    assert_eq!(history.attempts, 1);
}
