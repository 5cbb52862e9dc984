use academy_core::model::{
    Answer, AnswerId, Assessment, Course, CourseId, CourseItem, CourseItemId, CourseItemKind,
    Question, QuestionId, QuestionKind, UserId,
};
use academy_core::scoring::Submission;
use academy_core::time::{fixed_clock, fixed_now};
use chrono::Duration;
use pretty_assertions::assert_eq;
use services::{Clock, CourseServiceError, CourseServices, ErrorKind};
use storage::repository::{AssessmentRepository, CourseRepository, ProgressRepository};

const USER: UserId = UserId::new(7);
const COURSE: CourseId = CourseId::new(3);
const CHAPTER_A: CourseItemId = CourseItemId::new(1);
const CHAPTER_B: CourseItemId = CourseItemId::new(2);
const QUIZ: CourseItemId = CourseItemId::new(3);
const EXAM: CourseItemId = CourseItemId::new(4);
const APPENDIX: CourseItemId = CourseItemId::new(5);

fn one_question(item: CourseItemId, question: u64) -> Assessment {
    Assessment {
        course_item_id: item,
        min_pass_score: 1,
        attempts_limit: None,
        time_limit_sec: None,
        shuffle_questions: false,
        questions: vec![Question {
            id: QuestionId::new(question),
            kind: QuestionKind::Single,
            text: "pick the right one".into(),
            points: 1,
            position: 0,
            answers: vec![
                Answer {
                    id: AnswerId::new(question * 10 + 1),
                    text: "right".into(),
                    is_correct: true,
                    position: 0,
                },
                Answer {
                    id: AnswerId::new(question * 10 + 2),
                    text: "wrong".into(),
                    is_correct: false,
                    position: 1,
                },
            ],
        }],
    }
}

/// Two required chapters, a required quiz and exam, and an optional appendix.
async fn seed(services: &CourseServices) {
    let storage = services.storage();
    storage
        .courses
        .upsert_course(&Course::new(COURSE, "Progress", "progress").unwrap())
        .await
        .unwrap();

    let layout = [
        (CHAPTER_A, CourseItemKind::Chapter, true),
        (CHAPTER_B, CourseItemKind::Chapter, true),
        (QUIZ, CourseItemKind::Quiz, true),
        (EXAM, CourseItemKind::Exam, true),
        (APPENDIX, CourseItemKind::Chapter, false),
    ];
    for (position, (id, kind, is_required)) in (0_u32..).zip(layout) {
        storage
            .courses
            .upsert_course_item(&CourseItem {
                id,
                course_id: COURSE,
                kind,
                title: format!("{kind} {id}"),
                position,
                is_required,
            })
            .await
            .unwrap();
    }

    storage
        .assessments
        .upsert_assessment(&one_question(QUIZ, 1))
        .await
        .unwrap();
    storage
        .assessments
        .upsert_assessment(&one_question(EXAM, 2))
        .await
        .unwrap();
}

async fn enrolled() -> CourseServices {
    let services = CourseServices::in_memory(fixed_clock());
    seed(&services).await;
    services.enrollments().enroll(USER, COURSE).await.unwrap();
    services
}

#[tokio::test]
async fn mixed_progress_floors_to_sixty_two_percent() {
    let services = enrolled().await;
    let progress = services.progress();
    let attempts = services.attempts();

    progress
        .update_read_progress(USER, CHAPTER_A, 50.0)
        .await
        .unwrap();
    let read_b = progress
        .update_read_progress(USER, CHAPTER_B, 100.0)
        .await
        .unwrap();
    assert!(read_b.completed);

    let quiz = attempts
        .submit_attempt(USER, QUIZ, &Submission::new().with(QuestionId::new(1), 12))
        .await
        .unwrap();
    assert!(!quiz.passed);

    let exam = attempts
        .submit_attempt(USER, EXAM, &Submission::new().with(QuestionId::new(2), 21))
        .await
        .unwrap();
    assert!(exam.passed);

    let row = exam.progress.expect("exam pass recomputes");
    assert_eq!(row.progress_percent, 62);
    assert!(!row.finished);
    assert_eq!(row.finished_at, None);
}

#[tokio::test]
async fn recompute_is_idempotent() {
    let services = enrolled().await;
    let progress = services.progress();

    progress
        .update_read_progress(USER, CHAPTER_A, 33.0)
        .await
        .unwrap();
    progress.mark_item_complete(USER, QUIZ).await.unwrap();

    let first = progress.recompute_progress(USER, COURSE).await.unwrap();
    let second = progress.recompute_progress(USER, COURSE).await.unwrap();
    assert_eq!(first, second);
    // (33 + 100) / 4
    assert_eq!(first.progress_percent, 33);
}

#[tokio::test]
async fn read_percent_never_decreases() {
    let services = enrolled().await;
    let progress = services.progress();

    let high = progress
        .update_read_progress(USER, CHAPTER_A, 80.0)
        .await
        .unwrap();
    let low = progress
        .update_read_progress(USER, CHAPTER_A, 30.0)
        .await
        .unwrap();
    assert_eq!(high.read_percent, 80);
    assert_eq!(low.read_percent, 80);
    assert_eq!(low.progress.progress_percent, 20);

    let clamped = progress
        .update_read_progress(USER, CHAPTER_A, -15.0)
        .await
        .unwrap();
    assert_eq!(clamped.read_percent, 80);
}

#[tokio::test]
async fn partial_reads_never_finish_a_course() {
    let services = CourseServices::in_memory(fixed_clock());
    let storage = services.storage();
    storage
        .courses
        .upsert_course(&Course::new(COURSE, "One chapter", "one-chapter").unwrap())
        .await
        .unwrap();
    storage
        .courses
        .upsert_course_item(&CourseItem {
            id: CHAPTER_A,
            course_id: COURSE,
            kind: CourseItemKind::Chapter,
            title: "Only".into(),
            position: 0,
            is_required: true,
        })
        .await
        .unwrap();
    services.enrollments().enroll(USER, COURSE).await.unwrap();

    let outcome = services
        .progress()
        .update_read_progress(USER, CHAPTER_A, 99.0)
        .await
        .unwrap();
    assert!(!outcome.completed);
    assert_eq!(outcome.progress.progress_percent, 99);
    assert!(!outcome.progress.finished);

    let outcome = services
        .progress()
        .update_read_progress(USER, CHAPTER_A, 99.5)
        .await
        .unwrap();
    assert!(outcome.completed);
    assert!(outcome.progress.finished);
    assert_eq!(outcome.progress.progress_percent, 100);
}

#[tokio::test]
async fn finished_at_survives_later_recomputes() {
    let services = enrolled().await;
    let progress = services.progress();
    for item in [CHAPTER_A, CHAPTER_B, QUIZ, EXAM] {
        progress.mark_item_complete(USER, item).await.unwrap();
    }
    let finished = progress.recompute_progress(USER, COURSE).await.unwrap();
    assert!(finished.finished);
    assert_eq!(finished.finished_at, Some(fixed_now()));

    let later = CourseServices::from_storage(
        services.storage().clone(),
        Clock::fixed(fixed_now() + Duration::days(2)),
    );
    let again = later
        .progress()
        .recompute_progress(USER, COURSE)
        .await
        .unwrap();
    assert_eq!(again.finished_at, Some(fixed_now()));
    assert_eq!(again.updated_at, fixed_now() + Duration::days(2));
}

#[tokio::test]
async fn optional_items_do_not_move_progress() {
    let services = enrolled().await;
    let row = services
        .progress()
        .mark_item_complete(USER, APPENDIX)
        .await
        .unwrap();
    assert_eq!(row.progress_percent, 0);
    assert!(!row.finished);
}

#[tokio::test]
async fn read_progress_is_guarded() {
    let services = enrolled().await;
    let progress = services.progress();

    let err = progress
        .update_read_progress(USER, QUIZ, 50.0)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidType);

    let err = progress
        .update_read_progress(UserId::new(99), CHAPTER_A, 50.0)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = progress
        .update_read_progress(USER, CourseItemId::new(404), 50.0)
        .await
        .unwrap_err();
    assert!(matches!(err, CourseServiceError::ItemNotFound(_)));

    let err = progress
        .update_read_progress(USER, CHAPTER_A, f64::NAN)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = progress
        .mark_item_complete(UserId::new(99), CHAPTER_A)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let stored = services
        .storage()
        .progress
        .read_percents(UserId::new(99), &[CHAPTER_A])
        .await
        .unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn overview_reports_items_in_order_with_state() {
    let services = enrolled().await;

    let before = services
        .overview()
        .course_overview(USER, COURSE)
        .await
        .unwrap();
    assert_eq!(before.progress.progress_percent, 0);
    assert!(before.progress.updated_at.is_none());
    assert!(before.completed_item_ids.is_empty());

    services
        .progress()
        .update_read_progress(USER, CHAPTER_A, 40.0)
        .await
        .unwrap();
    services
        .progress()
        .mark_item_complete(USER, CHAPTER_B)
        .await
        .unwrap();
    let attempt = services
        .attempts()
        .submit_attempt(USER, QUIZ, &Submission::new().with(QuestionId::new(1), 12))
        .await
        .unwrap();

    let overview = services
        .overview()
        .course_overview(USER, COURSE)
        .await
        .unwrap();

    let order: Vec<CourseItemId> = overview.items.iter().map(|i| i.item.id).collect();
    assert_eq!(order, vec![CHAPTER_A, CHAPTER_B, QUIZ, EXAM, APPENDIX]);
    assert_eq!(overview.completed_item_ids, vec![CHAPTER_B]);
    assert_eq!(overview.items[0].read_percent, Some(40));
    assert!(overview.items[1].completed);
    assert_eq!(overview.progress.progress_percent, 35);

    let latest = &overview.latest_attempts_by_item_id[&QUIZ];
    assert_eq!(latest.id, attempt.attempt_id);
    assert!(!latest.passed);
    assert_eq!(
        overview.items[2].latest_attempt.as_ref().map(|a| a.id),
        Some(attempt.attempt_id)
    );
    assert_eq!(
        overview.items[2].assessment.as_ref().map(|a| a.total_points),
        Some(1)
    );
    assert!(overview.items[0].assessment.is_none());
}

#[tokio::test]
async fn overview_requires_course_and_enrollment() {
    let services = enrolled().await;

    let err = services
        .overview()
        .course_overview(UserId::new(99), COURSE)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = services
        .overview()
        .course_overview(USER, CourseId::new(404))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn last_active_course_prefers_recent_progress() {
    let services = CourseServices::in_memory(fixed_clock());
    seed(&services).await;
    let other = CourseId::new(8);
    services
        .storage()
        .courses
        .upsert_course(&Course::new(other, "Other", "other").unwrap())
        .await
        .unwrap();

    let overview = services.overview();
    assert_eq!(overview.last_active_course(USER).await.unwrap(), None);

    services.enrollments().enroll(USER, COURSE).await.unwrap();
    let later = CourseServices::from_storage(
        services.storage().clone(),
        Clock::fixed(fixed_now() + Duration::hours(1)),
    );
    later.enrollments().enroll(USER, other).await.unwrap();

    // newest enrollment wins while there is no progress
    let last = overview.last_active_course(USER).await.unwrap().unwrap();
    assert_eq!(last.id, other);

    let latest = CourseServices::from_storage(
        services.storage().clone(),
        Clock::fixed(fixed_now() + Duration::hours(2)),
    );
    latest
        .progress()
        .mark_item_complete(USER, CHAPTER_A)
        .await
        .unwrap();

    let last = overview.last_active_course(USER).await.unwrap().unwrap();
    assert_eq!(last.id, COURSE);
}
