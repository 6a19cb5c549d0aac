// src/config.rs

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in your .env file")]
    Missing(&'static str),
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Weights for the 0-100 engagement composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngagementWeights {
    pub per_login: f64,
    pub per_active_hour: f64,
    pub per_forum_post: f64,
    /// Longest gap between two log entries still counted as one session.
    pub session_cap_secs: i64,
}

impl Default for EngagementWeights {
    fn default() -> Self {
        Self {
            per_login: 5.0,
            per_active_hour: 2.0,
            per_forum_post: 10.0,
            session_cap_secs: 30 * 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeacherWeights {
    pub courses: f64,
    pub completion: f64,
    pub students: f64,
    pub course_target: f64,
    pub student_target: f64,
}

impl Default for TeacherWeights {
    fn default() -> Self {
        Self {
            courses: 0.3,
            completion: 0.4,
            students: 0.3,
            course_target: 5.0,
            student_target: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StudentWeights {
    pub completion: f64,
    pub grade: f64,
    pub engagement: f64,
}

impl Default for StudentWeights {
    fn default() -> Self {
        Self { completion: 0.3, grade: 0.4, engagement: 0.3 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub engagement: EngagementWeights,
    pub teacher: TeacherWeights,
    pub student: StudentWeights,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub table_prefix: String,
    pub login_url: String,
    pub window_days: i64,
    pub page_size: usize,
    pub scoring: ScoringConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let e = EngagementWeights::default();
        let t = TeacherWeights::default();
        let s = StudentWeights::default();

        let scoring = ScoringConfig {
            engagement: EngagementWeights {
                per_login: parse_or(&lookup, "ENGAGEMENT_LOGIN_WEIGHT", e.per_login)?,
                per_active_hour: parse_or(&lookup, "ENGAGEMENT_TIME_WEIGHT", e.per_active_hour)?,
                per_forum_post: parse_or(&lookup, "ENGAGEMENT_POST_WEIGHT", e.per_forum_post)?,
                session_cap_secs: parse_or(&lookup, "SESSION_CAP_SECS", e.session_cap_secs)?,
            },
            teacher: TeacherWeights {
                courses: parse_or(&lookup, "TEACHER_COURSES_WEIGHT", t.courses)?,
                completion: parse_or(&lookup, "TEACHER_COMPLETION_WEIGHT", t.completion)?,
                students: parse_or(&lookup, "TEACHER_STUDENTS_WEIGHT", t.students)?,
                course_target: parse_or(&lookup, "TEACHER_COURSE_TARGET", t.course_target)?,
                student_target: parse_or(&lookup, "TEACHER_STUDENT_TARGET", t.student_target)?,
            },
            student: StudentWeights {
                completion: parse_or(&lookup, "STUDENT_COMPLETION_WEIGHT", s.completion)?,
                grade: parse_or(&lookup, "STUDENT_GRADE_WEIGHT", s.grade)?,
                engagement: parse_or(&lookup, "STUDENT_ENGAGEMENT_WEIGHT", s.engagement)?,
            },
        };

        Ok(Self {
            port: parse_or(&lookup, "PORT", 8080)?,
            database_url,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            table_prefix: lookup("DB_TABLE_PREFIX").unwrap_or_else(|| "mdl_".into()),
            login_url: lookup("LOGIN_URL").unwrap_or_else(|| "/login/index.php".into()),
            window_days: parse_or(&lookup, "REPORT_WINDOW_DAYS", 30i64)?.clamp(1, 365),
            page_size: parse_or(&lookup, "REPORT_PAGE_SIZE", 25usize)?.max(1),
            scoring,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
