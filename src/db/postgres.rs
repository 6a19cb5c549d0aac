// src/db/postgres.rs
//
// SchoolData over the platform's own Postgres schema (core tables plus the
// company_* tables of the multi-tenancy plugin). All queries are read-only
// and parameterized; only the table prefix is spliced into the SQL text.

use async_trait::async_trait;
use sqlx::{query_as, PgPool};
use tracing::debug;

use super::{DataError, DataResult, SchoolData};
use crate::models::{
    AssignmentSubmission, Company, Completion, Course, CourseAccess, Enrolment, ForumPost,
    GradeRecord, LogEntry, Person, QuizAttempt, TeachingAssignment,
};

const STUDENT_ROLES: &str = "('student')";
const TEACHER_ROLES: &str = "('editingteacher', 'teacher')";
const CONTEXT_COURSE: i32 = 50;

#[derive(Clone)]
pub struct PgSchoolData {
    pool: PgPool,
    prefix: String,
}

impl PgSchoolData {
    pub fn new(pool: PgPool, prefix: impl Into<String>) -> DataResult<Self> {
        let prefix = prefix.into();
        if !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(DataError::Decode(format!("invalid table prefix '{prefix}'")));
        }
        Ok(Self { pool, prefix })
    }

    fn t(&self, table: &str) -> String {
        format!("{}{}", self.prefix, table)
    }

    /// `$1` is always the company id.
    fn member(&self, user_col: &str) -> String {
        format!(
            "EXISTS (SELECT 1 FROM {cu} cu JOIN {u} mu ON mu.id = cu.userid \
             WHERE cu.companyid = $1 AND cu.userid = {user_col} \
             AND mu.deleted = 0 AND mu.suspended = 0)",
            cu = self.t("company_users"),
            u = self.t("user"),
        )
    }

    fn company_course(&self, course_col: &str) -> String {
        format!(
            "{course_col} <> 1 AND EXISTS (SELECT 1 FROM {cc} cc \
             WHERE cc.companyid = $1 AND cc.courseid = {course_col})",
            cc = self.t("company_course"),
        )
    }

    async fn people_with_roles(&self, company_id: i64, roles: &str) -> DataResult<Vec<Person>> {
        let sql = format!(
            r#"SELECT DISTINCT u.id, u.firstname, u.lastname, u.email, u.lastaccess
               FROM {user} u
               JOIN {ra} ra ON ra.userid = u.id
               JOIN {role} r ON r.id = ra.roleid AND r.shortname IN {roles}
               JOIN {ctx} ctx ON ctx.id = ra.contextid AND ctx.contextlevel = {level}
               WHERE {member} AND {course}
               ORDER BY u.lastname, u.firstname, u.id"#,
            user = self.t("user"),
            ra = self.t("role_assignments"),
            role = self.t("role"),
            ctx = self.t("context"),
            level = CONTEXT_COURSE,
            member = self.member("u.id"),
            course = self.company_course("ctx.instanceid"),
        );
        let rows = query_as::<_, Person>(&sql)
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?;
        debug!(company_id, roles, count = rows.len(), "loaded people");
        Ok(rows)
    }
}

#[async_trait]
impl SchoolData for PgSchoolData {
    async fn managed_company(&self, user_id: i64) -> DataResult<Option<Company>> {
        let sql = format!(
            r#"SELECT c.id, c.name, c.shortname
               FROM {company} c
               JOIN {cu} cu ON cu.companyid = c.id
               JOIN {user} u ON u.id = cu.userid
               WHERE cu.userid = $1 AND cu.managertype > 0
                 AND u.deleted = 0 AND u.suspended = 0
               ORDER BY c.id
               LIMIT 1"#,
            company = self.t("company"),
            cu = self.t("company_users"),
            user = self.t("user"),
        );
        Ok(query_as::<_, Company>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn courses(&self, company_id: i64) -> DataResult<Vec<Course>> {
        let sql = format!(
            r#"SELECT c.id, c.fullname, c.shortname, (c.visible = 1) AS visible, c.startdate
               FROM {course} c
               WHERE {filter}
               ORDER BY c.fullname, c.id"#,
            course = self.t("course"),
            filter = self.company_course("c.id"),
        );
        Ok(query_as::<_, Course>(&sql)
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn students(&self, company_id: i64) -> DataResult<Vec<Person>> {
        self.people_with_roles(company_id, STUDENT_ROLES).await
    }

    async fn teachers(&self, company_id: i64) -> DataResult<Vec<Person>> {
        self.people_with_roles(company_id, TEACHER_ROLES).await
    }

    async fn enrolments(&self, company_id: i64) -> DataResult<Vec<Enrolment>> {
        // One row per (user, course); any active method counts as active.
        let sql = format!(
            r#"SELECT ue.userid AS user_id, e.courseid AS course_id, MIN(ue.status)::int8 AS status
               FROM {ue} ue
               JOIN {enrol} e ON e.id = ue.enrolid
               WHERE {member} AND {course}
               GROUP BY ue.userid, e.courseid"#,
            ue = self.t("user_enrolments"),
            enrol = self.t("enrol"),
            member = self.member("ue.userid"),
            course = self.company_course("e.courseid"),
        );
        Ok(query_as::<_, Enrolment>(&sql)
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn teaching_assignments(&self, company_id: i64) -> DataResult<Vec<TeachingAssignment>> {
        let sql = format!(
            r#"SELECT DISTINCT ra.userid AS user_id, ctx.instanceid AS course_id
               FROM {ra} ra
               JOIN {role} r ON r.id = ra.roleid AND r.shortname IN {roles}
               JOIN {ctx} ctx ON ctx.id = ra.contextid AND ctx.contextlevel = {level}
               WHERE {member} AND {course}"#,
            ra = self.t("role_assignments"),
            role = self.t("role"),
            ctx = self.t("context"),
            roles = TEACHER_ROLES,
            level = CONTEXT_COURSE,
            member = self.member("ra.userid"),
            course = self.company_course("ctx.instanceid"),
        );
        Ok(query_as::<_, TeachingAssignment>(&sql)
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn completions(&self, company_id: i64) -> DataResult<Vec<Completion>> {
        let sql = format!(
            r#"SELECT cc.userid AS user_id, cc.course AS course_id, cc.timecompleted
               FROM {completions} cc
               WHERE {member} AND {course}"#,
            completions = self.t("course_completions"),
            member = self.member("cc.userid"),
            course = self.company_course("cc.course"),
        );
        Ok(query_as::<_, Completion>(&sql)
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn course_access(&self, company_id: i64) -> DataResult<Vec<CourseAccess>> {
        let sql = format!(
            r#"SELECT la.userid AS user_id, la.courseid AS course_id, la.timeaccess
               FROM {la} la
               WHERE {member} AND {course}"#,
            la = self.t("user_lastaccess"),
            member = self.member("la.userid"),
            course = self.company_course("la.courseid"),
        );
        Ok(query_as::<_, CourseAccess>(&sql)
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn grades(&self, company_id: i64) -> DataResult<Vec<GradeRecord>> {
        let sql = format!(
            r#"SELECT gg.userid AS user_id, gi.courseid AS course_id,
                      CASE WHEN gi.itemtype = 'course' THEN 'course'
                           WHEN gi.itemmodule = 'quiz' THEN 'quiz'
                           WHEN gi.itemmodule = 'assign' THEN 'assign'
                           ELSE 'other' END AS item_type,
                      gg.finalgrade::float8 AS finalgrade,
                      gi.grademax::float8 AS grademax
               FROM {gg} gg
               JOIN {gi} gi ON gi.id = gg.itemid
               WHERE {member} AND {course}"#,
            gg = self.t("grade_grades"),
            gi = self.t("grade_items"),
            member = self.member("gg.userid"),
            course = self.company_course("gi.courseid"),
        );
        Ok(query_as::<_, GradeRecord>(&sql)
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn assignment_submissions(&self, company_id: i64) -> DataResult<Vec<AssignmentSubmission>> {
        let sql = format!(
            r#"SELECT s.userid AS user_id, a.course AS course_id,
                      s.status, s.timemodified,
                      ag.timemodified AS graded_at, ag.grade::float8 AS grade
               FROM {sub} s
               JOIN {assign} a ON a.id = s.assignment
               LEFT JOIN {ag} ag ON ag.assignment = s.assignment
                                AND ag.userid = s.userid
                                AND ag.attemptnumber = s.attemptnumber
               WHERE s.latest = 1 AND {member} AND {course}"#,
            sub = self.t("assign_submission"),
            assign = self.t("assign"),
            ag = self.t("assign_grades"),
            member = self.member("s.userid"),
            course = self.company_course("a.course"),
        );
        Ok(query_as::<_, AssignmentSubmission>(&sql)
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn quiz_attempts(&self, company_id: i64, since: i64) -> DataResult<Vec<QuizAttempt>> {
        let sql = format!(
            r#"SELECT qa.userid AS user_id, q.course AS course_id,
                      qa.state, qa.timefinish
               FROM {qa} qa
               JOIN {quiz} q ON q.id = qa.quiz
               WHERE qa.preview = 0 AND qa.timefinish >= $2
                 AND {member} AND {course}"#,
            qa = self.t("quiz_attempts"),
            quiz = self.t("quiz"),
            member = self.member("qa.userid"),
            course = self.company_course("q.course"),
        );
        Ok(query_as::<_, QuizAttempt>(&sql)
            .bind(company_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn log_entries(&self, company_id: i64, since: i64) -> DataResult<Vec<LogEntry>> {
        let sql = format!(
            r#"SELECT l.userid AS user_id, NULLIF(l.courseid, 0) AS course_id,
                      l.action, l.timecreated
               FROM {log} l
               WHERE l.timecreated >= $2 AND {member}
                 AND (l.courseid IN (0, 1) OR EXISTS (
                      SELECT 1 FROM {cc} cc WHERE cc.companyid = $1 AND cc.courseid = l.courseid))
               ORDER BY l.userid, l.timecreated"#,
            log = self.t("logstore_standard_log"),
            cc = self.t("company_course"),
            member = self.member("l.userid"),
        );
        let rows = query_as::<_, LogEntry>(&sql)
            .bind(company_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;
        debug!(company_id, since, count = rows.len(), "loaded log entries");
        Ok(rows)
    }

    async fn forum_posts(&self, company_id: i64, since: i64) -> DataResult<Vec<ForumPost>> {
        let sql = format!(
            r#"SELECT p.userid AS user_id, d.course AS course_id, p.created
               FROM {posts} p
               JOIN {disc} d ON d.id = p.discussion
               WHERE p.created >= $2 AND {member} AND {course}"#,
            posts = self.t("forum_posts"),
            disc = self.t("forum_discussions"),
            member = self.member("p.userid"),
            course = self.company_course("d.course"),
        );
        Ok(query_as::<_, ForumPost>(&sql)
            .bind(company_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await?)
    }
}
