use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use academy_core::model::{AssessmentError, CourseError, CourseId, CourseItemId, UserId};
use academy_core::scoring::Submission;
use services::{Clock, CourseServiceError, CourseServices, CourseServicesError, ErrorKind};
use storage::repository::StorageError;

mod config;
mod seed;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("invalid --db value: {raw}")]
    InvalidDbUrl { raw: String },
    #[error("invalid --answers JSON: {0}")]
    Answers(#[source] serde_json::Error),
    #[error(transparent)]
    Service(#[from] CourseServiceError),
    #[error(transparent)]
    Init(#[from] CourseServicesError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AppError {
    fn exit_code(&self) -> i32 {
        match self {
            AppError::Service(err) => match err.kind() {
                ErrorKind::Validation | ErrorKind::InvalidType => 3,
                ErrorKind::NotFound => 4,
                ErrorKind::Forbidden => 5,
                ErrorKind::Rejected | ErrorKind::Conflict => 6,
                ErrorKind::Storage => 1,
            },
            AppError::InvalidDbUrl { .. } | AppError::Answers(_) => 2,
            _ => 1,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            AppError::Service(err) => json!({
                "error": err.kind(),
                "reason": err.rejection_reason(),
                "message": err.to_string(),
            }),
            other => json!({ "error": "APP", "message": other.to_string() }),
        }
    }
}

#[derive(Parser)]
#[command(name = "academy")]
#[command(about = "Assessment scoring and course progress", long_about = None)]
struct Cli {
    /// SQLite URL or path; overrides ACADEMY_DB_URL
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create or refresh the demo course, optionally enrolling a user
    Seed {
        #[arg(long)]
        user: Option<u64>,
    },
    /// Enroll a user in a course
    Enroll {
        #[arg(long)]
        user: u64,
        #[arg(long)]
        course: u64,
    },
    /// Submit answers for a quiz or exam
    Submit {
        #[arg(long)]
        user: u64,
        #[arg(long)]
        item: u64,
        /// JSON object keyed by question id, e.g. '{"1031": 10312, "1032": [10321, 10323]}'
        #[arg(long, default_value = "{}")]
        answers: String,
    },
    /// Report how far a chapter was read
    Read {
        #[arg(long)]
        user: u64,
        #[arg(long)]
        item: u64,
        #[arg(long, allow_negative_numbers = true)]
        percent: f64,
    },
    /// Mark a course item complete
    Complete {
        #[arg(long)]
        user: u64,
        #[arg(long)]
        item: u64,
    },
    /// Recompute course progress from stored markers and reads
    Recompute {
        #[arg(long)]
        user: u64,
        #[arg(long)]
        course: u64,
    },
    /// Show a course with the user's progress
    Overview {
        #[arg(long)]
        user: u64,
        #[arg(long)]
        course: u64,
    },
    /// List the user's courses, newest enrollment first
    MyCourses {
        #[arg(long)]
        user: u64,
    },
    /// Show the course the user was active in last
    LastCourse {
        #[arg(long)]
        user: u64,
    },
}

fn print_json(value: &impl Serialize) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let db_url = config::resolve_db_url(cli.db)?;
    config::prepare_sqlite_file(&db_url)?;
    let services = CourseServices::new_sqlite(&db_url, Clock::default()).await?;
    tracing::debug!(db_url = %db_url, "services ready");

    match cli.command {
        Command::Seed { user } => {
            let course = seed::seed_demo(services.storage()).await?;
            if let Some(user) = user {
                services
                    .enrollments()
                    .enroll(UserId::new(user), course.id)
                    .await?;
            }
            print_json(&course)
        }
        Command::Enroll { user, course } => {
            let enrollment = services
                .enrollments()
                .enroll(UserId::new(user), CourseId::new(course))
                .await?;
            print_json(&enrollment)
        }
        Command::Submit {
            user,
            item,
            answers,
        } => {
            let submission: Submission =
                serde_json::from_str(&answers).map_err(AppError::Answers)?;
            let outcome = services
                .attempts()
                .submit_attempt(UserId::new(user), CourseItemId::new(item), &submission)
                .await?;
            print_json(&outcome)
        }
        Command::Read {
            user,
            item,
            percent,
        } => {
            let outcome = services
                .progress()
                .update_read_progress(UserId::new(user), CourseItemId::new(item), percent)
                .await?;
            print_json(&outcome)
        }
        Command::Complete { user, item } => {
            let progress = services
                .progress()
                .mark_item_complete(UserId::new(user), CourseItemId::new(item))
                .await?;
            print_json(&progress)
        }
        Command::Recompute { user, course } => {
            let progress = services
                .progress()
                .recompute_progress(UserId::new(user), CourseId::new(course))
                .await?;
            print_json(&progress)
        }
        Command::Overview { user, course } => {
            let overview = services
                .overview()
                .course_overview(UserId::new(user), CourseId::new(course))
                .await?;
            print_json(&overview)
        }
        Command::MyCourses { user } => {
            let courses = services
                .enrollments()
                .my_courses(UserId::new(user))
                .await?;
            print_json(&courses)
        }
        Command::LastCourse { user } => {
            let course = services
                .overview()
                .last_active_course(UserId::new(user))
                .await?;
            print_json(&course)
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        tracing::error!(error = %err, "command failed");
        eprintln!("{}", err.to_json());
        std::process::exit(err.exit_code());
    }
}
