// src/db/memory.rs

use std::collections::HashSet;

use async_trait::async_trait;

use super::{DataError, DataResult, SchoolData};
use crate::models::{
    AssignmentSubmission, Company, Completion, Course, CourseAccess, Enrolment, ForumPost,
    GradeRecord, LogEntry, Person, QuizAttempt, TeachingAssignment,
};

const SITE_COURSE: i64 = 1;

#[derive(Debug, Clone)]
struct StoredUser {
    person: Person,
    deleted: bool,
    suspended: bool,
}

#[derive(Debug, Clone, Copy)]
struct Membership {
    company_id: i64,
    user_id: i64,
    manager: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Student,
    Teacher,
}

/// In-memory SchoolData for tests and demos. Applies the same tenant
/// scoping as the Postgres adapter.
#[derive(Debug, Clone, Default)]
pub struct MemorySchoolData {
    companies: Vec<Company>,
    members: Vec<Membership>,
    company_courses: Vec<(i64, i64)>,
    users: Vec<StoredUser>,
    roles: Vec<(i64, i64, Role)>,
    courses: Vec<Course>,
    enrolments: Vec<Enrolment>,
    completions: Vec<Completion>,
    access: Vec<CourseAccess>,
    grades: Vec<GradeRecord>,
    submissions: Vec<AssignmentSubmission>,
    quiz_attempts: Vec<QuizAttempt>,
    logs: Vec<LogEntry>,
    posts: Vec<ForumPost>,
    failing: HashSet<&'static str>,
}

impl MemorySchoolData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_company(&mut self, id: i64, name: &str) -> &mut Self {
        self.companies.push(Company {
            id,
            name: name.to_string(),
            shortname: name.to_lowercase().replace(' ', "-"),
        });
        self
    }

    pub fn add_course(&mut self, company_id: i64, id: i64, name: &str) -> &mut Self {
        self.courses.push(Course {
            id,
            fullname: name.to_string(),
            shortname: format!("C{id}"),
            visible: true,
            startdate: 0,
        });
        self.company_courses.push((company_id, id));
        self
    }

    pub fn add_user(&mut self, company_id: i64, id: i64, first: &str, last: &str, lastaccess: i64) -> &mut Self {
        self.users.push(StoredUser {
            person: Person {
                id,
                firstname: first.to_string(),
                lastname: last.to_string(),
                email: format!("{}.{}@example.com", first, last).to_lowercase(),
                lastaccess,
            },
            deleted: false,
            suspended: false,
        });
        self.members.push(Membership { company_id, user_id: id, manager: false });
        self
    }

    pub fn add_manager(&mut self, company_id: i64, id: i64, first: &str, last: &str) -> &mut Self {
        self.add_user(company_id, id, first, last, 0);
        if let Some(m) = self.members.iter_mut().rev().find(|m| m.user_id == id) {
            m.manager = true;
        }
        self
    }

    pub fn delete_user(&mut self, id: i64) -> &mut Self {
        self.users.iter_mut().filter(|u| u.person.id == id).for_each(|u| u.deleted = true);
        self
    }

    pub fn suspend_user(&mut self, id: i64) -> &mut Self {
        self.users.iter_mut().filter(|u| u.person.id == id).for_each(|u| u.suspended = true);
        self
    }

    /// Student role plus an enrolment (`active = false` for a suspended one).
    pub fn enrol_student(&mut self, user_id: i64, course_id: i64, active: bool) -> &mut Self {
        self.roles.push((user_id, course_id, Role::Student));
        self.enrolments.push(Enrolment { user_id, course_id, status: if active { 0 } else { 1 } });
        self
    }

    pub fn assign_teacher(&mut self, user_id: i64, course_id: i64) -> &mut Self {
        self.roles.push((user_id, course_id, Role::Teacher));
        self.enrolments.push(Enrolment { user_id, course_id, status: 0 });
        self
    }

    pub fn complete(&mut self, user_id: i64, course_id: i64, at: i64) -> &mut Self {
        self.completions.push(Completion { user_id, course_id, timecompleted: Some(at) });
        self
    }

    pub fn access_course(&mut self, user_id: i64, course_id: i64, at: i64) -> &mut Self {
        self.access.push(CourseAccess { user_id, course_id, timeaccess: at });
        self
    }

    pub fn add_grade(&mut self, record: GradeRecord) -> &mut Self {
        self.grades.push(record);
        self
    }

    pub fn course_grade(&mut self, user_id: i64, course_id: i64, grade: Option<f64>, max: f64) -> &mut Self {
        self.add_grade(GradeRecord {
            user_id,
            course_id,
            item_type: crate::models::ITEM_COURSE.into(),
            finalgrade: grade,
            grademax: max,
        })
    }

    pub fn add_submission(&mut self, record: AssignmentSubmission) -> &mut Self {
        self.submissions.push(record);
        self
    }

    pub fn add_quiz_attempt(&mut self, record: QuizAttempt) -> &mut Self {
        self.quiz_attempts.push(record);
        self
    }

    pub fn add_log(&mut self, user_id: i64, course_id: Option<i64>, action: &str, at: i64) -> &mut Self {
        self.logs.push(LogEntry { user_id, course_id, action: action.to_string(), timecreated: at });
        self
    }

    pub fn add_login(&mut self, user_id: i64, at: i64) -> &mut Self {
        self.add_log(user_id, None, crate::models::ACTION_LOGGED_IN, at)
    }

    pub fn add_forum_post(&mut self, user_id: i64, course_id: i64, at: i64) -> &mut Self {
        self.posts.push(ForumPost { user_id, course_id, created: at });
        self
    }

    /// Makes the named SchoolData method fail with a decode error.
    pub fn fail(&mut self, method: &'static str) -> &mut Self {
        self.failing.insert(method);
        self
    }

    fn check(&self, method: &'static str) -> DataResult<()> {
        if self.failing.contains(method) {
            Err(DataError::Decode(format!("{method} unavailable")))
        } else {
            Ok(())
        }
    }

    fn is_member(&self, company_id: i64, user_id: i64) -> bool {
        let active = self
            .users
            .iter()
            .any(|u| u.person.id == user_id && !u.deleted && !u.suspended);
        active
            && self
                .members
                .iter()
                .any(|m| m.company_id == company_id && m.user_id == user_id)
    }

    fn in_company(&self, company_id: i64, course_id: i64) -> bool {
        course_id != SITE_COURSE
            && self
                .company_courses
                .iter()
                .any(|&(c, id)| c == company_id && id == course_id)
    }

    fn people(&self, company_id: i64, role: Role) -> Vec<Person> {
        let mut out: Vec<Person> = self
            .users
            .iter()
            .filter(|u| self.is_member(company_id, u.person.id))
            .filter(|u| {
                self.roles
                    .iter()
                    .any(|&(uid, cid, r)| uid == u.person.id && r == role && self.in_company(company_id, cid))
            })
            .map(|u| u.person.clone())
            .collect();
        out.sort_by(|a, b| (&a.lastname, &a.firstname, a.id).cmp(&(&b.lastname, &b.firstname, b.id)));
        out.dedup_by_key(|p| p.id);
        out
    }

    fn scoped<T: Clone>(&self, company_id: i64, rows: &[T], key: impl Fn(&T) -> (i64, i64)) -> Vec<T> {
        rows.iter()
            .filter(|r| {
                let (user_id, course_id) = key(r);
                self.is_member(company_id, user_id) && self.in_company(company_id, course_id)
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SchoolData for MemorySchoolData {
    async fn managed_company(&self, user_id: i64) -> DataResult<Option<Company>> {
        self.check("managed_company")?;
        let active = self
            .users
            .iter()
            .any(|u| u.person.id == user_id && !u.deleted && !u.suspended);
        if !active {
            return Ok(None);
        }
        Ok(self
            .members
            .iter()
            .filter(|m| m.user_id == user_id && m.manager)
            .filter_map(|m| self.companies.iter().find(|c| c.id == m.company_id))
            .min_by_key(|c| c.id)
            .cloned())
    }

    async fn courses(&self, company_id: i64) -> DataResult<Vec<Course>> {
        self.check("courses")?;
        let mut out: Vec<Course> = self
            .courses
            .iter()
            .filter(|c| self.in_company(company_id, c.id))
            .cloned()
            .collect();
        out.sort_by(|a, b| (&a.fullname, a.id).cmp(&(&b.fullname, b.id)));
        Ok(out)
    }

    async fn students(&self, company_id: i64) -> DataResult<Vec<Person>> {
        self.check("students")?;
        Ok(self.people(company_id, Role::Student))
    }

    async fn teachers(&self, company_id: i64) -> DataResult<Vec<Person>> {
        self.check("teachers")?;
        Ok(self.people(company_id, Role::Teacher))
    }

    async fn enrolments(&self, company_id: i64) -> DataResult<Vec<Enrolment>> {
        self.check("enrolments")?;
        Ok(self.scoped(company_id, &self.enrolments, |e| (e.user_id, e.course_id)))
    }

    async fn teaching_assignments(&self, company_id: i64) -> DataResult<Vec<TeachingAssignment>> {
        self.check("teaching_assignments")?;
        let mut out: Vec<TeachingAssignment> = self
            .roles
            .iter()
            .filter(|&&(uid, cid, r)| {
                r == Role::Teacher && self.is_member(company_id, uid) && self.in_company(company_id, cid)
            })
            .map(|&(user_id, course_id, _)| TeachingAssignment { user_id, course_id })
            .collect();
        out.sort_by_key(|t| (t.user_id, t.course_id));
        out.dedup_by_key(|t| (t.user_id, t.course_id));
        Ok(out)
    }

    async fn completions(&self, company_id: i64) -> DataResult<Vec<Completion>> {
        self.check("completions")?;
        Ok(self.scoped(company_id, &self.completions, |c| (c.user_id, c.course_id)))
    }

    async fn course_access(&self, company_id: i64) -> DataResult<Vec<CourseAccess>> {
        self.check("course_access")?;
        Ok(self.scoped(company_id, &self.access, |a| (a.user_id, a.course_id)))
    }

    async fn grades(&self, company_id: i64) -> DataResult<Vec<GradeRecord>> {
        self.check("grades")?;
        Ok(self.scoped(company_id, &self.grades, |g| (g.user_id, g.course_id)))
    }

    async fn assignment_submissions(&self, company_id: i64) -> DataResult<Vec<AssignmentSubmission>> {
        self.check("assignment_submissions")?;
        Ok(self.scoped(company_id, &self.submissions, |s| (s.user_id, s.course_id)))
    }

    async fn quiz_attempts(&self, company_id: i64, since: i64) -> DataResult<Vec<QuizAttempt>> {
        self.check("quiz_attempts")?;
        let mut rows = self.scoped(company_id, &self.quiz_attempts, |q| (q.user_id, q.course_id));
        rows.retain(|q| q.timefinish >= since);
        Ok(rows)
    }

    async fn log_entries(&self, company_id: i64, since: i64) -> DataResult<Vec<LogEntry>> {
        self.check("log_entries")?;
        let mut rows: Vec<LogEntry> = self
            .logs
            .iter()
            .filter(|l| l.timecreated >= since && self.is_member(company_id, l.user_id))
            .filter(|l| match l.course_id {
                None | Some(SITE_COURSE) => true,
                Some(cid) => self.in_company(company_id, cid),
            })
            .cloned()
            .collect();
        rows.sort_by_key(|l| (l.user_id, l.timecreated));
        Ok(rows)
    }

    async fn forum_posts(&self, company_id: i64, since: i64) -> DataResult<Vec<ForumPost>> {
        self.check("forum_posts")?;
        let mut rows = self.scoped(company_id, &self.posts, |p| (p.user_id, p.course_id));
        rows.retain(|p| p.created >= since);
        Ok(rows)
    }
}
