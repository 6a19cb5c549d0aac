mod common;

use common::*;
use school_reports::config::ScoringConfig;
use school_reports::db::{MemorySchoolData, SchoolData};
use school_reports::metrics::aggregator::{MetricsAggregator, TenantContext};
use school_reports::models::{ActivityTier, Company, GradeRecord, QuizAttempt};

async fn north_ctx(data: &MemorySchoolData) -> TenantContext {
    north_ctx_for(data, 30).await
}

async fn north_ctx_for(data: &MemorySchoolData, days: i64) -> TenantContext {
    let company: Company = data.managed_company(NORTH_MANAGER).await.unwrap().unwrap();
    assert_eq!(company.id, NORTH);
    TenantContext::new(company, days, now())
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[tokio::test]
async fn student_progress_splits_completed_in_progress_and_not_started() {
    let data = fixture();
    let scoring = ScoringConfig::default();
    let ctx = north_ctx(&data).await;
    let agg = MetricsAggregator::new(&data, &scoring, now());

    let records = agg.student_performance(&ctx).await;
    let ids: Vec<i64> = records.iter().map(|r| r.user_id).collect();
    assert_eq!(ids, vec![ANN, BEN, CAT]);

    let ann = &records[0];
    assert_eq!(ann.courses_enrolled, 4);
    assert_eq!(ann.completed, 2);
    assert_eq!(ann.in_progress, 1);
    assert_eq!(ann.not_started, 1);
    assert_eq!(ann.completion_rate, 50.0);
    assert_eq!(ann.average_grade, 70.0);
    // 4 logins × 5 + 1.5 h × 2 + 3 posts × 10
    assert_eq!(ann.engagement_score, 53.0);
    assert!(close(ann.performance_score, 58.9));

    let ben = &records[1];
    assert_eq!(ben.courses_enrolled, 1, "suspended enrolment is not counted");
    assert_eq!(ben.average_grade, 0.0);
    assert_eq!(ben.completion_rate, 0.0);
    assert_eq!(ben.not_started, 1);
}

#[tokio::test]
async fn deleted_suspended_and_site_course_users_never_appear() {
    let data = fixture();
    let scoring = ScoringConfig::default();
    let ctx = north_ctx(&data).await;
    let agg = MetricsAggregator::new(&data, &scoring, now());

    let hidden = [DAN_DELETED, SUE_SUSPENDED, SAM_SITE_ONLY, ZED_SOUTH];
    for r in agg.student_performance(&ctx).await {
        assert!(!hidden.contains(&r.user_id));
    }
    for r in agg.inactivity(&ctx).await {
        assert!(!hidden.contains(&r.user_id));
    }
    let courses = agg.course_enrollments(&ctx).await;
    assert!(courses.iter().all(|c| c.course_id != 1 && c.course_id != 21));
}

#[tokio::test]
async fn teacher_scores_follow_weighted_formula() {
    let data = fixture();
    let scoring = ScoringConfig::default();
    let ctx = north_ctx(&data).await;
    let agg = MetricsAggregator::new(&data, &scoring, now());

    let records = agg.teacher_performance(&ctx).await;
    assert_eq!(records.len(), 2);

    let tina = &records[0];
    assert_eq!(tina.user_id, TINA);
    assert_eq!(tina.courses_taught, 3);
    assert_eq!(tina.students, 3);
    assert_eq!(tina.completion_rate, 40.0);
    assert_eq!(tina.average_grade, 70.0);
    assert_eq!(tina.pending_grading, 1);
    assert_eq!(tina.engagement_score, 0.0);
    // 100 × (0.3 × 3/5 + 0.4 × 0.4 + 0.3 × 3/20)
    assert!(close(tina.performance_score, 38.5));

    let tom = &records[1];
    assert_eq!(tom.user_id, TOM);
    assert_eq!(tom.students, 1);
    assert!(close(tom.performance_score, 7.5));
}

#[tokio::test]
async fn course_summaries_count_enrolment_states() {
    let data = fixture();
    let scoring = ScoringConfig::default();
    let ctx = north_ctx(&data).await;
    let agg = MetricsAggregator::new(&data, &scoring, now());

    let courses = agg.course_enrollments(&ctx).await;
    let names: Vec<&str> = courses.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Algebra", "Biology", "Chemistry", "Drama"]);

    let algebra = &courses[0];
    assert_eq!(algebra.enrolled, 3);
    assert_eq!(algebra.active, 3);
    assert_eq!(algebra.completed, 1);
    assert_eq!(algebra.completion_rate, 33.3);
    assert_eq!(algebra.average_grade, 80.0);
    assert_eq!(algebra.teachers, 1);
    assert_eq!(algebra.assignment_submissions, 2);
    assert_eq!(algebra.pending_grading, 1);

    let biology = &courses[1];
    assert_eq!(biology.enrolled, 2);
    assert_eq!(biology.active, 1);
    assert_eq!(biology.suspended, 1);
    assert_eq!(biology.completion_rate, 50.0);

    let drama = &courses[3];
    assert_eq!(drama.completed, 0);
    assert_eq!(drama.average_grade, 0.0);
}

#[tokio::test]
async fn course_with_no_students_has_zero_rate() {
    let mut data = fixture();
    data.add_course(NORTH, 15, "Empty elective");
    let scoring = ScoringConfig::default();
    let ctx = north_ctx(&data).await;
    let agg = MetricsAggregator::new(&data, &scoring, now());

    let courses = agg.course_enrollments(&ctx).await;
    let empty = courses.iter().find(|c| c.course_id == 15).unwrap();
    assert_eq!(empty.enrolled, 0);
    assert_eq!(empty.completion_rate, 0.0);
    assert_eq!(empty.average_grade, 0.0);
}

#[tokio::test]
async fn quiz_attempts_respect_the_window() {
    let mut data = fixture();
    let now = now();
    for (finish, state) in [
        (now - DAY, "finished"),
        (now - 60 * DAY, "finished"),
        (now - DAY, "abandoned"),
        (0, "inprogress"),
    ] {
        data.add_quiz_attempt(QuizAttempt {
            user_id: ANN,
            course_id: 13,
            state: state.into(),
            timefinish: finish,
        });
    }
    let scoring = ScoringConfig::default();
    let ctx = north_ctx(&data).await;
    let agg = MetricsAggregator::new(&data, &scoring, now);

    let courses = agg.course_enrollments(&ctx).await;
    let chemistry = courses.iter().find(|c| c.course_id == 13).unwrap();
    assert_eq!(chemistry.quiz_attempts, 1);
}

#[tokio::test]
async fn activity_outside_the_window_does_not_count() {
    let mut data = fixture();
    let old = now() - 60 * DAY;
    data.add_login(ANN, old).add_forum_post(ANN, 13, old);
    let scoring = ScoringConfig::default();
    let agg = MetricsAggregator::new(&data, &scoring, now());

    let month = north_ctx_for(&data, 30).await;
    let ann = agg.student_performance(&month).await.into_iter().find(|r| r.user_id == ANN).unwrap();
    assert_eq!(ann.engagement_score, 53.0);

    // 5 logins × 5 + 2 h × 2 + 4 posts × 10
    let quarter = north_ctx_for(&data, 90).await;
    let ann = agg.student_performance(&quarter).await.into_iter().find(|r| r.user_id == ANN).unwrap();
    assert_eq!(ann.engagement_score, 69.0);
}

#[tokio::test]
async fn course_summaries_average_quiz_and_assignment_items() {
    let mut data = fixture();
    let item = |user_id, course_id, kind: &str, grade: Option<f64>| GradeRecord {
        user_id,
        course_id,
        item_type: kind.into(),
        finalgrade: grade,
        grademax: 10.0,
    };
    data.add_grade(item(ANN, 11, "quiz", Some(8.0)))
        .add_grade(item(BEN, 11, "quiz", Some(6.0)))
        .add_grade(item(CAT, 11, "quiz", None))
        .add_grade(item(DAN_DELETED, 11, "quiz", Some(0.0)))
        .add_grade(item(ANN, 11, "assign", Some(9.0)))
        .add_grade(item(ANN, 11, "other", Some(1.0)));
    let scoring = ScoringConfig::default();
    let ctx = north_ctx(&data).await;
    let agg = MetricsAggregator::new(&data, &scoring, now());

    let courses = agg.course_enrollments(&ctx).await;
    let algebra = courses.iter().find(|c| c.course_id == 11).unwrap();
    assert_eq!(algebra.average_quiz_grade, 70.0);
    assert_eq!(algebra.average_assignment_grade, 90.0);
    assert_eq!(algebra.average_grade, 80.0, "course total is unaffected");

    let chemistry = courses.iter().find(|c| c.course_id == 13).unwrap();
    assert_eq!(chemistry.average_quiz_grade, 0.0);
}

#[tokio::test]
async fn inactivity_tiers_rank_never_logged_in_first() {
    let data = fixture();
    let scoring = ScoringConfig::default();
    let ctx = north_ctx(&data).await;
    let agg = MetricsAggregator::new(&data, &scoring, now());

    let records = agg.inactivity(&ctx).await;
    let tiers: Vec<(i64, ActivityTier)> = records.iter().map(|r| (r.user_id, r.tier)).collect();
    assert_eq!(
        tiers,
        vec![
            (CAT, ActivityTier::Critical),
            (BEN, ActivityTier::Warning),
            (ANN, ActivityTier::Active),
        ]
    );
    assert_eq!(records[0].days_inactive, None);
    assert_eq!(records[1].days_inactive, Some(7));
}

#[tokio::test]
async fn overview_totals_for_one_tenant() {
    let data = fixture();
    let scoring = ScoringConfig::default();
    let ctx = north_ctx(&data).await;
    let agg = MetricsAggregator::new(&data, &scoring, now());

    let o = agg.overview(&ctx).await;
    assert_eq!(o.company.id, NORTH);
    assert_eq!(o.students, 3);
    assert_eq!(o.teachers, 2);
    assert_eq!(o.courses, 4);
    assert_eq!(o.enrolments, 6);
    assert_eq!(o.completion_rate, 33.3);
    assert_eq!(o.average_grade, 70.0);
    assert_eq!(o.active_users, 1);
    assert_eq!(o.pending_grading, 1);
    assert_eq!(o.tier_counts.critical, 1);
    assert_eq!(o.tier_counts.warning, 1);
    assert_eq!(o.tier_counts.active, 1);
}

#[tokio::test]
async fn other_tenant_sees_only_its_own_rows() {
    let data = fixture();
    let scoring = ScoringConfig::default();
    let company = data.managed_company(SOUTH_MANAGER).await.unwrap().unwrap();
    let ctx = TenantContext::new(company, 30, now());
    let agg = MetricsAggregator::new(&data, &scoring, now());

    let students = agg.student_performance(&ctx).await;
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].user_id, ZED_SOUTH);
    assert_eq!(students[0].completion_rate, 100.0);
    assert!(agg.teacher_performance(&ctx).await.is_empty());
}

#[tokio::test]
async fn failing_sources_degrade_to_zero_values() {
    let mut data = fixture();
    data.fail("grades").fail("log_entries").fail("completions");
    let scoring = ScoringConfig::default();
    let ctx = north_ctx(&data).await;
    let agg = MetricsAggregator::new(&data, &scoring, now());

    let records = agg.student_performance(&ctx).await;
    assert_eq!(records.len(), 3);
    for r in &records {
        assert_eq!(r.average_grade, 0.0);
        assert_eq!(r.completed, 0);
        assert!(r.engagement_score.is_finite());
    }

    data.fail("students");
    let agg = MetricsAggregator::new(&data, &scoring, now());
    assert!(agg.student_performance(&ctx).await.is_empty());
    assert_eq!(agg.overview(&ctx).await.completion_rate, 0.0);
}
