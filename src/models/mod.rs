// src/models/mod.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ───────────────────────────────────────
// Core tenancy
// ───────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub shortname: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: i64,
    pub fullname: String,
    pub shortname: String,
    pub visible: bool,
    pub startdate: i64, // unix seconds, 0 = unset
}

/// A student or teacher row. Deleted and suspended accounts are filtered
/// out before they reach this type.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Person {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub lastaccess: i64, // 0 = never logged in
}

impl Person {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname).trim().to_string()
    }

    pub fn last_access(&self) -> Option<i64> {
        (self.lastaccess > 0).then_some(self.lastaccess)
    }
}

// ───────────────────────────────────────
// Enrolment & progress
// ───────────────────────────────────────
pub const ENROL_ACTIVE: i64 = 0;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Enrolment {
    pub user_id: i64,
    pub course_id: i64,
    pub status: i64, // 0 active, 1 suspended
}

impl Enrolment {
    pub fn is_active(&self) -> bool {
        self.status == ENROL_ACTIVE
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TeachingAssignment {
    pub user_id: i64,
    pub course_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Completion {
    pub user_id: i64,
    pub course_id: i64,
    pub timecompleted: Option<i64>,
}

impl Completion {
    pub fn is_complete(&self) -> bool {
        self.timecompleted.is_some_and(|t| t > 0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CourseAccess {
    pub user_id: i64,
    pub course_id: i64,
    pub timeaccess: i64,
}

// ───────────────────────────────────────
// Grades, quizzes, assignments
// ───────────────────────────────────────
pub const ITEM_COURSE: &str = "course";
pub const ITEM_QUIZ: &str = "quiz";
pub const ITEM_ASSIGN: &str = "assign";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GradeRecord {
    pub user_id: i64,
    pub course_id: i64,
    pub item_type: String, // course | quiz | assign | other
    pub finalgrade: Option<f64>,
    pub grademax: f64,
}

impl GradeRecord {
    /// Percentage of the maximum, `None` for ungraded items.
    pub fn percent(&self) -> Option<f64> {
        match self.finalgrade {
            Some(g) if self.grademax > 0.0 => Some(g / self.grademax * 100.0),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizAttempt {
    pub user_id: i64,
    pub course_id: i64,
    pub state: String, // inprogress | overdue | finished | abandoned
    pub timefinish: i64,
}

impl QuizAttempt {
    pub fn is_finished(&self) -> bool {
        self.state == "finished"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssignmentSubmission {
    pub user_id: i64,
    pub course_id: i64,
    pub status: String, // new | draft | submitted | reopened
    pub timemodified: i64,
    pub graded_at: Option<i64>,
    pub grade: Option<f64>,
}

impl AssignmentSubmission {
    /// Submitted work with no grade, or graded before the last resubmission.
    pub fn is_pending_grading(&self) -> bool {
        if self.status != "submitted" {
            return false;
        }
        match (self.grade, self.graded_at) {
            (Some(g), Some(at)) if g >= 0.0 => at < self.timemodified,
            _ => true,
        }
    }
}

// ───────────────────────────────────────
// Activity
// ───────────────────────────────────────
pub const ACTION_LOGGED_IN: &str = "loggedin";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LogEntry {
    pub user_id: i64,
    pub course_id: Option<i64>,
    pub action: String,
    pub timecreated: i64,
}

impl LogEntry {
    pub fn is_login(&self) -> bool {
        self.action == ACTION_LOGGED_IN
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ForumPost {
    pub user_id: i64,
    pub course_id: i64,
    pub created: i64,
}

// ───────────────────────────────────────
// Derived report records
// ───────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityTier {
    Critical,
    Warning,
    LowActivity,
    Active,
}

impl ActivityTier {
    pub const ALL: [ActivityTier; 4] = [
        ActivityTier::Critical,
        ActivityTier::Warning,
        ActivityTier::LowActivity,
        ActivityTier::Active,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ActivityTier::Critical => "Critical",
            ActivityTier::Warning => "Warning",
            ActivityTier::LowActivity => "Low Activity",
            ActivityTier::Active => "Active",
        }
    }

    pub fn parse(s: &str) -> Option<ActivityTier> {
        match s.trim().to_lowercase().as_str() {
            "critical" => Some(ActivityTier::Critical),
            "warning" => Some(ActivityTier::Warning),
            "low_activity" | "low-activity" | "low" => Some(ActivityTier::LowActivity),
            "active" => Some(ActivityTier::Active),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentPerformanceRecord {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub courses_enrolled: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub not_started: usize,
    pub average_grade: f64,
    pub completion_rate: f64,
    pub engagement_score: f64,
    pub performance_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherPerformanceRecord {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub courses_taught: usize,
    pub students: usize,
    pub completion_rate: f64,
    pub average_grade: f64,
    pub engagement_score: f64,
    pub pending_grading: usize,
    pub performance_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseEnrollmentSummary {
    pub course_id: i64,
    pub name: String,
    pub visible: bool,
    pub start_date: Option<String>, // YYYY-MM-DD
    pub enrolled: usize,
    pub active: usize,
    pub suspended: usize,
    pub completed: usize,
    pub completion_rate: f64,
    pub average_grade: f64,
    pub average_quiz_grade: f64,
    pub average_assignment_grade: f64,
    pub teachers: usize,
    pub quiz_attempts: usize,
    pub assignment_submissions: usize,
    pub pending_grading: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InactivityRecord {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub last_access: Option<i64>,
    pub days_inactive: Option<i64>, // None = never logged in
    pub tier: ActivityTier,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TierCounts {
    pub critical: usize,
    pub warning: usize,
    pub low_activity: usize,
    pub active: usize,
}

impl TierCounts {
    pub fn add(&mut self, tier: ActivityTier) {
        match tier {
            ActivityTier::Critical => self.critical += 1,
            ActivityTier::Warning => self.warning += 1,
            ActivityTier::LowActivity => self.low_activity += 1,
            ActivityTier::Active => self.active += 1,
        }
    }

    pub fn get(&self, tier: ActivityTier) -> usize {
        match tier {
            ActivityTier::Critical => self.critical,
            ActivityTier::Warning => self.warning,
            ActivityTier::LowActivity => self.low_activity,
            ActivityTier::Active => self.active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantOverview {
    pub company: Company,
    pub window_days: i64,
    pub students: usize,
    pub teachers: usize,
    pub courses: usize,
    pub enrolments: usize,
    pub completion_rate: f64,
    pub average_grade: f64,
    pub active_users: usize,
    pub pending_grading: usize,
    pub tier_counts: TierCounts,
}
