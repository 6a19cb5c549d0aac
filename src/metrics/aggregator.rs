// src/metrics/aggregator.rs

use std::collections::{BTreeSet, HashMap, HashSet};
use std::future::Future;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::{
    average_grade, classify_inactivity, completion_rate, days_between, engagement_score,
    estimate_active_seconds, student_performance_score, teacher_performance_score, ActivitySample,
    SECONDS_PER_DAY,
};
use crate::config::ScoringConfig;
use crate::db::{DataResult, SchoolData};
use crate::models::{
    Company, Completion, CourseEnrollmentSummary, Enrolment, ForumPost, GradeRecord,
    InactivityRecord, LogEntry, Person, StudentPerformanceRecord, TeacherPerformanceRecord,
    TenantOverview, TierCounts, ITEM_ASSIGN, ITEM_COURSE, ITEM_QUIZ,
};

/// Which tenant a report is for and how far back activity counts.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub company: Company,
    pub window_days: i64,
    pub since: i64,
}

impl TenantContext {
    pub fn new(company: Company, window_days: i64, now: i64) -> Self {
        let window_days = window_days.max(1);
        Self {
            company,
            window_days,
            since: now - window_days * SECONDS_PER_DAY,
        }
    }

    pub fn company_id(&self) -> i64 {
        self.company.id
    }
}

pub struct MetricsAggregator<'a> {
    data: &'a dyn SchoolData,
    scoring: &'a ScoringConfig,
    now: i64,
}

/// Rows come back empty when the source fails; reports then show zeros.
async fn or_empty<T, F>(what: &'static str, company_id: i64, fut: F) -> Vec<T>
where
    F: Future<Output = DataResult<Vec<T>>>,
{
    match fut.await {
        Ok(rows) => rows,
        Err(e) => {
            warn!(company_id, source = what, error = %e, "report query failed, using empty rows");
            Vec::new()
        }
    }
}

/// Student enrolments and completions shared by several reports.
struct Roster {
    students: HashSet<i64>,
    // active (student, course) pairs
    enrolled: BTreeSet<(i64, i64)>,
    completed: HashSet<(i64, i64)>,
}

impl Roster {
    fn build(students: &[Person], enrolments: &[Enrolment], completions: &[Completion]) -> Self {
        let ids: HashSet<i64> = students.iter().map(|s| s.id).collect();
        let enrolled = enrolments
            .iter()
            .filter(|e| e.is_active() && ids.contains(&e.user_id))
            .map(|e| (e.user_id, e.course_id))
            .collect();
        let completed = completions
            .iter()
            .filter(|c| c.is_complete())
            .map(|c| (c.user_id, c.course_id))
            .collect();
        Self { students: ids, enrolled, completed }
    }

    fn is_completed(&self, pair: &(i64, i64)) -> bool {
        self.completed.contains(pair)
    }
}

fn course_grades_by_pair(grades: &[GradeRecord]) -> HashMap<(i64, i64), Vec<&GradeRecord>> {
    let mut map: HashMap<(i64, i64), Vec<&GradeRecord>> = HashMap::new();
    for g in grades.iter().filter(|g| g.item_type == ITEM_COURSE) {
        map.entry((g.user_id, g.course_id)).or_default().push(g);
    }
    map
}

fn activity_by_user(
    logs: &[LogEntry],
    posts: &[ForumPost],
    session_cap: i64,
) -> HashMap<i64, ActivitySample> {
    let mut stamps: HashMap<i64, Vec<i64>> = HashMap::new();
    let mut samples: HashMap<i64, ActivitySample> = HashMap::new();

    for l in logs {
        stamps.entry(l.user_id).or_default().push(l.timecreated);
        if l.is_login() {
            samples.entry(l.user_id).or_default().logins += 1;
        }
    }
    for p in posts {
        samples.entry(p.user_id).or_default().forum_posts += 1;
    }
    for (user_id, ts) in stamps {
        samples.entry(user_id).or_default().active_seconds = estimate_active_seconds(&ts, session_cap);
    }
    samples
}

fn format_day(ts: i64) -> Option<String> {
    if ts <= 0 {
        return None;
    }
    DateTime::<Utc>::from_timestamp(ts, 0).map(|d| d.date_naive().to_string())
}

fn by_score_then_name(a: (f64, &str), b: (f64, &str)) -> std::cmp::Ordering {
    b.0.partial_cmp(&a.0)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then_with(|| a.1.cmp(b.1))
}

impl<'a> MetricsAggregator<'a> {
    pub fn new(data: &'a dyn SchoolData, scoring: &'a ScoringConfig, now: i64) -> Self {
        Self { data, scoring, now }
    }

    pub async fn student_performance(&self, ctx: &TenantContext) -> Vec<StudentPerformanceRecord> {
        let cid = ctx.company_id();
        let students = or_empty("students", cid, self.data.students(cid)).await;
        let enrolments = or_empty("enrolments", cid, self.data.enrolments(cid)).await;
        let completions = or_empty("completions", cid, self.data.completions(cid)).await;
        let access = or_empty("course_access", cid, self.data.course_access(cid)).await;
        let grades = or_empty("grades", cid, self.data.grades(cid)).await;
        let logs = or_empty("log_entries", cid, self.data.log_entries(cid, ctx.since)).await;
        let posts = or_empty("forum_posts", cid, self.data.forum_posts(cid, ctx.since)).await;

        let roster = Roster::build(&students, &enrolments, &completions);
        let pair_grades = course_grades_by_pair(&grades);
        let activity = activity_by_user(&logs, &posts, self.scoring.engagement.session_cap_secs);

        // Any sign of work in a course counts as started.
        let mut started: HashSet<(i64, i64)> = access.iter().map(|a| (a.user_id, a.course_id)).collect();
        started.extend(
            grades
                .iter()
                .filter(|g| g.finalgrade.is_some())
                .map(|g| (g.user_id, g.course_id)),
        );
        started.extend(logs.iter().filter_map(|l| l.course_id.map(|c| (l.user_id, c))));

        let mut records: Vec<StudentPerformanceRecord> = students
            .iter()
            .map(|s| {
                let pairs: Vec<(i64, i64)> = roster
                    .enrolled
                    .range((s.id, i64::MIN)..=(s.id, i64::MAX))
                    .copied()
                    .collect();
                let completed = pairs.iter().filter(|p| roster.is_completed(p)).count();
                let in_progress = pairs
                    .iter()
                    .filter(|p| !roster.is_completed(p) && started.contains(*p))
                    .count();
                let enrolled = pairs.len();
                let avg = average_grade(
                    pairs
                        .iter()
                        .filter_map(|p| pair_grades.get(p))
                        .flatten()
                        .copied(),
                );
                let rate = completion_rate(completed, enrolled);
                let engagement = engagement_score(
                    activity.get(&s.id).copied().unwrap_or_default(),
                    &self.scoring.engagement,
                );

                StudentPerformanceRecord {
                    user_id: s.id,
                    name: s.full_name(),
                    email: s.email.clone(),
                    courses_enrolled: enrolled,
                    completed,
                    in_progress,
                    not_started: enrolled - completed - in_progress,
                    average_grade: avg,
                    completion_rate: rate,
                    engagement_score: engagement,
                    performance_score: student_performance_score(
                        rate,
                        avg,
                        engagement,
                        &self.scoring.student,
                    ),
                }
            })
            .collect();

        records.sort_by(|a, b| {
            by_score_then_name((a.performance_score, a.name.as_str()), (b.performance_score, b.name.as_str()))
        });
        debug!(company_id = cid, count = records.len(), "built student performance");
        records
    }

    pub async fn teacher_performance(&self, ctx: &TenantContext) -> Vec<TeacherPerformanceRecord> {
        let cid = ctx.company_id();
        let teachers = or_empty("teachers", cid, self.data.teachers(cid)).await;
        let teaching = or_empty("teaching_assignments", cid, self.data.teaching_assignments(cid)).await;
        let students = or_empty("students", cid, self.data.students(cid)).await;
        let enrolments = or_empty("enrolments", cid, self.data.enrolments(cid)).await;
        let completions = or_empty("completions", cid, self.data.completions(cid)).await;
        let grades = or_empty("grades", cid, self.data.grades(cid)).await;
        let submissions = or_empty("assignment_submissions", cid, self.data.assignment_submissions(cid)).await;
        let logs = or_empty("log_entries", cid, self.data.log_entries(cid, ctx.since)).await;
        let posts = or_empty("forum_posts", cid, self.data.forum_posts(cid, ctx.since)).await;

        let roster = Roster::build(&students, &enrolments, &completions);
        let pair_grades = course_grades_by_pair(&grades);
        let activity = activity_by_user(&logs, &posts, self.scoring.engagement.session_cap_secs);

        let mut courses_of: HashMap<i64, HashSet<i64>> = HashMap::new();
        for t in &teaching {
            courses_of.entry(t.user_id).or_default().insert(t.course_id);
        }

        let mut pending_by_course: HashMap<i64, usize> = HashMap::new();
        for s in submissions
            .iter()
            .filter(|s| roster.students.contains(&s.user_id) && s.is_pending_grading())
        {
            *pending_by_course.entry(s.course_id).or_default() += 1;
        }

        let mut records: Vec<TeacherPerformanceRecord> = teachers
            .iter()
            .map(|t| {
                let courses = courses_of.get(&t.id).cloned().unwrap_or_default();
                let pairs: Vec<&(i64, i64)> = roster
                    .enrolled
                    .iter()
                    .filter(|(_, course)| courses.contains(course))
                    .collect();
                let taught: HashSet<i64> = pairs.iter().map(|(user, _)| *user).collect();
                let completed = pairs.iter().filter(|p| roster.is_completed(p)).count();
                let rate = completion_rate(completed, pairs.len());
                let avg = average_grade(
                    pairs
                        .iter()
                        .filter_map(|p| pair_grades.get(*p))
                        .flatten()
                        .copied(),
                );
                let pending = courses
                    .iter()
                    .map(|c| pending_by_course.get(c).copied().unwrap_or(0))
                    .sum();

                TeacherPerformanceRecord {
                    user_id: t.id,
                    name: t.full_name(),
                    email: t.email.clone(),
                    courses_taught: courses.len(),
                    students: taught.len(),
                    completion_rate: rate,
                    average_grade: avg,
                    engagement_score: engagement_score(
                        activity.get(&t.id).copied().unwrap_or_default(),
                        &self.scoring.engagement,
                    ),
                    pending_grading: pending,
                    performance_score: teacher_performance_score(
                        courses.len(),
                        taught.len(),
                        rate,
                        &self.scoring.teacher,
                    ),
                }
            })
            .collect();

        records.sort_by(|a, b| {
            by_score_then_name((a.performance_score, a.name.as_str()), (b.performance_score, b.name.as_str()))
        });
        debug!(company_id = cid, count = records.len(), "built teacher performance");
        records
    }

    pub async fn course_enrollments(&self, ctx: &TenantContext) -> Vec<CourseEnrollmentSummary> {
        let cid = ctx.company_id();
        let courses = or_empty("courses", cid, self.data.courses(cid)).await;
        let students = or_empty("students", cid, self.data.students(cid)).await;
        let enrolments = or_empty("enrolments", cid, self.data.enrolments(cid)).await;
        let completions = or_empty("completions", cid, self.data.completions(cid)).await;
        let grades = or_empty("grades", cid, self.data.grades(cid)).await;
        let teaching = or_empty("teaching_assignments", cid, self.data.teaching_assignments(cid)).await;
        let attempts = or_empty("quiz_attempts", cid, self.data.quiz_attempts(cid, ctx.since)).await;
        let submissions = or_empty("assignment_submissions", cid, self.data.assignment_submissions(cid)).await;

        let roster = Roster::build(&students, &enrolments, &completions);
        let pair_grades = course_grades_by_pair(&grades);

        let summaries: Vec<CourseEnrollmentSummary> = courses
            .iter()
            .map(|c| {
                let student_rows: Vec<&Enrolment> = enrolments
                    .iter()
                    .filter(|e| e.course_id == c.id && roster.students.contains(&e.user_id))
                    .collect();
                let active = student_rows.iter().filter(|e| e.is_active()).count();
                let enrolled = student_rows.len();
                let completed = student_rows
                    .iter()
                    .filter(|e| roster.is_completed(&(e.user_id, c.id)))
                    .count();
                let avg = average_grade(
                    student_rows
                        .iter()
                        .filter_map(|e| pair_grades.get(&(e.user_id, c.id)))
                        .flatten()
                        .copied(),
                );
                let item_average = |kind: &str| {
                    average_grade(grades.iter().filter(|g| {
                        g.course_id == c.id
                            && g.item_type == kind
                            && student_rows.iter().any(|e| e.user_id == g.user_id)
                    }))
                };
                let course_subs = submissions
                    .iter()
                    .filter(|s| s.course_id == c.id && roster.students.contains(&s.user_id));

                CourseEnrollmentSummary {
                    course_id: c.id,
                    name: c.fullname.clone(),
                    visible: c.visible,
                    start_date: format_day(c.startdate),
                    enrolled,
                    active,
                    suspended: enrolled - active,
                    completed,
                    completion_rate: completion_rate(completed, enrolled),
                    average_grade: avg,
                    average_quiz_grade: item_average(ITEM_QUIZ),
                    average_assignment_grade: item_average(ITEM_ASSIGN),
                    teachers: teaching.iter().filter(|t| t.course_id == c.id).count(),
                    quiz_attempts: attempts
                        .iter()
                        .filter(|a| a.course_id == c.id && a.is_finished())
                        .count(),
                    assignment_submissions: course_subs
                        .clone()
                        .filter(|s| s.status == "submitted")
                        .count(),
                    pending_grading: course_subs.filter(|s| s.is_pending_grading()).count(),
                }
            })
            .collect();

        debug!(company_id = cid, count = summaries.len(), "built course summaries");
        summaries
    }

    pub async fn inactivity(&self, ctx: &TenantContext) -> Vec<InactivityRecord> {
        let cid = ctx.company_id();
        let students = or_empty("students", cid, self.data.students(cid)).await;

        let mut records: Vec<InactivityRecord> = students
            .iter()
            .map(|s| {
                let last_access = s.last_access();
                let days = last_access.map(|t| days_between(self.now, t));
                InactivityRecord {
                    user_id: s.id,
                    name: s.full_name(),
                    email: s.email.clone(),
                    last_access,
                    days_inactive: days,
                    tier: classify_inactivity(days),
                }
            })
            .collect();

        // Never-logged-in first, then longest absence.
        records.sort_by(|a, b| {
            let key = |r: &InactivityRecord| r.days_inactive.unwrap_or(i64::MAX);
            key(b).cmp(&key(a)).then_with(|| a.name.cmp(&b.name))
        });
        records
    }

    pub async fn overview(&self, ctx: &TenantContext) -> TenantOverview {
        let cid = ctx.company_id();
        let courses = or_empty("courses", cid, self.data.courses(cid)).await;
        let teachers = or_empty("teachers", cid, self.data.teachers(cid)).await;
        let students = or_empty("students", cid, self.data.students(cid)).await;
        let enrolments = or_empty("enrolments", cid, self.data.enrolments(cid)).await;
        let completions = or_empty("completions", cid, self.data.completions(cid)).await;
        let grades = or_empty("grades", cid, self.data.grades(cid)).await;
        let submissions = or_empty("assignment_submissions", cid, self.data.assignment_submissions(cid)).await;
        let logs = or_empty("log_entries", cid, self.data.log_entries(cid, ctx.since)).await;

        let roster = Roster::build(&students, &enrolments, &completions);
        let pair_grades = course_grades_by_pair(&grades);
        let completed = roster.enrolled.iter().filter(|p| roster.is_completed(p)).count();
        let avg = average_grade(
            roster
                .enrolled
                .iter()
                .filter_map(|p| pair_grades.get(p))
                .flatten()
                .copied(),
        );
        let active_users: HashSet<i64> = logs.iter().map(|l| l.user_id).collect();
        let pending = submissions
            .iter()
            .filter(|s| roster.students.contains(&s.user_id) && s.is_pending_grading())
            .count();

        let mut tier_counts = TierCounts::default();
        for s in &students {
            let days = s.last_access().map(|t| days_between(self.now, t));
            tier_counts.add(classify_inactivity(days));
        }

        TenantOverview {
            company: ctx.company.clone(),
            window_days: ctx.window_days,
            students: students.len(),
            teachers: teachers.len(),
            courses: courses.len(),
            enrolments: roster.enrolled.len(),
            completion_rate: completion_rate(completed, roster.enrolled.len()),
            average_grade: avg,
            active_users: active_users.len(),
            pending_grading: pending,
            tier_counts,
        }
    }
}
