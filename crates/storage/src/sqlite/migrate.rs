use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS courses (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS course_items (
            id INTEGER PRIMARY KEY,
            course_id INTEGER NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('CHAPTER', 'QUIZ', 'EXAM')),
            title TEXT NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            is_required INTEGER NOT NULL,
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS assessments (
            course_item_id INTEGER PRIMARY KEY,
            min_pass_score INTEGER,
            attempts_limit INTEGER CHECK (attempts_limit IS NULL OR attempts_limit > 0),
            time_limit_sec INTEGER CHECK (time_limit_sec IS NULL OR time_limit_sec >= 0),
            shuffle_questions INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (course_item_id) REFERENCES course_items(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS questions (
            id INTEGER PRIMARY KEY,
            course_item_id INTEGER NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('SINGLE', 'MULTI', 'TEXT')),
            text TEXT NOT NULL,
            points INTEGER NOT NULL CHECK (points >= 0),
            position INTEGER NOT NULL,
            FOREIGN KEY (course_item_id) REFERENCES assessments(course_item_id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS answers (
            id INTEGER PRIMARY KEY,
            question_id INTEGER NOT NULL,
            text TEXT NOT NULL,
            is_correct INTEGER NOT NULL,
            position INTEGER NOT NULL,
            FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS enrollments (
            user_id INTEGER NOT NULL,
            course_id INTEGER NOT NULL,
            activated_at TEXT NOT NULL,
            PRIMARY KEY (user_id, course_id),
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );
    ",
    // attempts keep question/answer ids without foreign keys so they survive
    // later edits of the assessment definition
    r"
        CREATE TABLE IF NOT EXISTS assessment_attempts (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            assessment_id INTEGER NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT,
            score INTEGER NOT NULL CHECK (score >= 0),
            passed INTEGER NOT NULL,
            FOREIGN KEY (assessment_id) REFERENCES course_items(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS attempt_answers (
            id INTEGER PRIMARY KEY,
            attempt_id INTEGER NOT NULL,
            question_id INTEGER NOT NULL,
            answer_id INTEGER,
            text_answer TEXT,
            is_correct INTEGER NOT NULL,
            points_awarded INTEGER NOT NULL CHECK (points_awarded >= 0),
            FOREIGN KEY (attempt_id) REFERENCES assessment_attempts(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS course_item_progress (
            user_id INTEGER NOT NULL,
            course_item_id INTEGER NOT NULL,
            completed_at TEXT NOT NULL,
            PRIMARY KEY (user_id, course_item_id),
            FOREIGN KEY (course_item_id) REFERENCES course_items(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS course_item_read_progress (
            user_id INTEGER NOT NULL,
            course_item_id INTEGER NOT NULL,
            read_percent INTEGER NOT NULL CHECK (read_percent BETWEEN 0 AND 100),
            updated_at TEXT NOT NULL,
            PRIMARY KEY (user_id, course_item_id),
            FOREIGN KEY (course_item_id) REFERENCES course_items(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS course_progress (
            user_id INTEGER NOT NULL,
            course_id INTEGER NOT NULL,
            progress_percent INTEGER NOT NULL CHECK (progress_percent BETWEEN 0 AND 100),
            finished INTEGER NOT NULL,
            finished_at TEXT,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (user_id, course_id),
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_course_items_course_position
            ON course_items (course_id, position, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_questions_assessment_position
            ON questions (course_item_id, position, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_attempts_user_assessment_started
            ON assessment_attempts (user_id, assessment_id, started_at);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_course_progress_user_updated
            ON course_progress (user_id, updated_at);
    ",
];

/// Runs versioned migrations inside one transaction per version.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        for statement in SCHEMA_V1 {
            sqlx::query(*statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied sqlite migration");
    }

    Ok(())
}
