#![allow(dead_code)]

use chrono::Utc;
use school_reports::config::{AppConfig, ScoringConfig};
use school_reports::db::MemorySchoolData;
use school_reports::models::AssignmentSubmission;

pub const DAY: i64 = 86_400;

pub const NORTH: i64 = 10;
pub const SOUTH: i64 = 20;

pub const NORTH_MANAGER: i64 = 100;
pub const SOUTH_MANAGER: i64 = 200;
pub const PLAIN_USER: i64 = 150;

pub const ANN: i64 = 401;
pub const BEN: i64 = 402;
pub const CAT: i64 = 403;
pub const DAN_DELETED: i64 = 404;
pub const SUE_SUSPENDED: i64 = 405;
pub const SAM_SITE_ONLY: i64 = 406;
pub const ZED_SOUTH: i64 = 501;

pub const TINA: i64 = 300;
pub const TOM: i64 = 301;

pub fn now() -> i64 {
    Utc::now().timestamp()
}

pub fn config() -> AppConfig {
    AppConfig {
        port: 0,
        database_url: "postgres://unused".into(),
        db_max_connections: 1,
        table_prefix: "mdl_".into(),
        login_url: "/login/index.php".into(),
        window_days: 30,
        page_size: 25,
        scoring: ScoringConfig::default(),
    }
}

fn submission(user_id: i64, course_id: i64, modified: i64, graded_at: Option<i64>) -> AssignmentSubmission {
    AssignmentSubmission {
        user_id,
        course_id,
        status: "submitted".into(),
        timemodified: modified,
        graded_at,
        grade: graded_at.map(|_| 7.0),
    }
}

/// Two schools. North has four courses, two teachers and three visible
/// students plus a deleted, a suspended and a site-course-only account.
pub fn fixture() -> MemorySchoolData {
    let now = now();
    let mut data = MemorySchoolData::new();

    data.add_company(NORTH, "North High")
        .add_company(SOUTH, "South High")
        .add_course(NORTH, 1, "Site home")
        .add_course(NORTH, 11, "Algebra")
        .add_course(NORTH, 12, "Biology")
        .add_course(NORTH, 13, "Chemistry")
        .add_course(NORTH, 14, "Drama")
        .add_course(SOUTH, 21, "Geography");

    data.add_manager(NORTH, NORTH_MANAGER, "Nora", "Manager")
        .add_manager(SOUTH, SOUTH_MANAGER, "Sid", "Manager")
        .add_user(NORTH, PLAIN_USER, "Pat", "Plain", now);

    data.add_user(NORTH, TINA, "Tina", "Teach", now - DAY)
        .add_user(NORTH, TOM, "Tom", "Tutor", now - 2 * DAY)
        .assign_teacher(TINA, 11)
        .assign_teacher(TINA, 12)
        .assign_teacher(TINA, 13)
        .assign_teacher(TOM, 14);

    data.add_user(NORTH, ANN, "Ann", "Able", now - DAY)
        .enrol_student(ANN, 11, true)
        .enrol_student(ANN, 12, true)
        .enrol_student(ANN, 13, true)
        .enrol_student(ANN, 14, true)
        .complete(ANN, 11, now - 10 * DAY)
        .complete(ANN, 12, now - 5 * DAY)
        .course_grade(ANN, 11, Some(80.0), 100.0)
        .course_grade(ANN, 12, Some(60.0), 100.0)
        .access_course(ANN, 13, now - 2 * DAY)
        .add_login(ANN, now - DAY)
        .add_login(ANN, now - 2 * DAY)
        .add_login(ANN, now - 3 * DAY)
        .add_login(ANN, now - 4 * DAY)
        .add_forum_post(ANN, 13, now - DAY)
        .add_forum_post(ANN, 13, now - 2 * DAY)
        .add_forum_post(ANN, 14, now - 3 * DAY)
        .add_submission(submission(ANN, 11, now - DAY, None));

    data.add_user(NORTH, BEN, "Ben", "Brown", now - 7 * DAY - 60)
        .enrol_student(BEN, 11, true)
        .enrol_student(BEN, 12, false)
        .add_submission(submission(BEN, 11, now - 3 * DAY, Some(now - 2 * DAY)));

    data.add_user(NORTH, CAT, "Cat", "Cole", 0)
        .enrol_student(CAT, 11, true);

    data.add_user(NORTH, DAN_DELETED, "Dan", "Deleted", now)
        .enrol_student(DAN_DELETED, 11, true)
        .complete(DAN_DELETED, 11, now)
        .delete_user(DAN_DELETED);

    data.add_user(NORTH, SUE_SUSPENDED, "Sue", "Suspended", now)
        .enrol_student(SUE_SUSPENDED, 11, true)
        .suspend_user(SUE_SUSPENDED);

    data.add_user(NORTH, SAM_SITE_ONLY, "Sam", "Site", now)
        .enrol_student(SAM_SITE_ONLY, 1, true);

    data.add_user(SOUTH, ZED_SOUTH, "Zed", "Zulu", now - 20 * DAY)
        .enrol_student(ZED_SOUTH, 21, true)
        .complete(ZED_SOUTH, 21, now - DAY);

    data
}
