// src/db/mod.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use tracing::info;

use crate::config::AppConfig;
use crate::models::{
    AssignmentSubmission, Company, Completion, Course, CourseAccess, Enrolment, ForumPost,
    GradeRecord, LogEntry, Person, QuizAttempt, TeachingAssignment,
};

pub mod memory;
pub mod postgres;

pub use memory::MemorySchoolData;
pub use postgres::PgSchoolData;

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("unexpected data: {0}")]
    Decode(String),
}

pub type DataResult<T> = Result<T, DataError>;

/// Tenant-scoped read access to the learning platform.
///
/// Every method returns rows for one company only. Implementations drop
/// deleted and suspended users and the site course (id 1) before returning,
/// so callers never filter those themselves. Methods taking `since` only
/// return rows timestamped at or after it (unix seconds).
#[async_trait]
pub trait SchoolData: Send + Sync {
    /// The company the user manages, if they hold a manager role in one.
    async fn managed_company(&self, user_id: i64) -> DataResult<Option<Company>>;

    async fn courses(&self, company_id: i64) -> DataResult<Vec<Course>>;
    async fn students(&self, company_id: i64) -> DataResult<Vec<Person>>;
    async fn teachers(&self, company_id: i64) -> DataResult<Vec<Person>>;

    async fn enrolments(&self, company_id: i64) -> DataResult<Vec<Enrolment>>;
    async fn teaching_assignments(&self, company_id: i64) -> DataResult<Vec<TeachingAssignment>>;
    async fn completions(&self, company_id: i64) -> DataResult<Vec<Completion>>;
    async fn course_access(&self, company_id: i64) -> DataResult<Vec<CourseAccess>>;
    async fn grades(&self, company_id: i64) -> DataResult<Vec<GradeRecord>>;
    async fn assignment_submissions(&self, company_id: i64) -> DataResult<Vec<AssignmentSubmission>>;

    async fn quiz_attempts(&self, company_id: i64, since: i64) -> DataResult<Vec<QuizAttempt>>;
    async fn log_entries(&self, company_id: i64, since: i64) -> DataResult<Vec<LogEntry>>;
    async fn forum_posts(&self, company_id: i64, since: i64) -> DataResult<Vec<ForumPost>>;
}

pub async fn connect(config: &AppConfig) -> anyhow::Result<Pool<Postgres>> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;

    info!("connected to PostgreSQL");
    Ok(pool)
}
