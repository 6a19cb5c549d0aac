// src/routes/courses.rs

use axum::{
    extract::{Query, State},
    Json,
};
use maud::Markup;

use super::{scope, ReportQuery};
use crate::access::TenantManager;
use crate::models::CourseEnrollmentSummary;
use crate::render::{fmt_pct, Chart, Page, Table};
use crate::AppState;

pub async fn courses_json(
    State(state): State<AppState>,
    manager: TenantManager,
    Query(q): Query<ReportQuery>,
) -> Json<Vec<CourseEnrollmentSummary>> {
    let s = scope(&state, manager, &q);
    Json(s.aggregator.course_enrollments(&s.ctx).await)
}

pub async fn courses_page(
    State(state): State<AppState>,
    manager: TenantManager,
    Query(q): Query<ReportQuery>,
) -> Markup {
    let s = scope(&state, manager, &q);
    let summaries = s.aggregator.course_enrollments(&s.ctx).await;

    let mut table = Table::new(vec![
        "Course", "Visible", "Start", "Enrolled", "Active", "Suspended", "Completed",
        "Completion", "Avg grade", "Quiz avg", "Assignment avg", "Teachers", "Quiz attempts", "Submissions", "Pending grading",
    ]);
    for c in &summaries {
        table.row(vec![
            c.name.clone(),
            if c.visible { "Yes".into() } else { "No".into() },
            c.start_date.clone().unwrap_or_else(|| "-".into()),
            c.enrolled.to_string(),
            c.active.to_string(),
            c.suspended.to_string(),
            c.completed.to_string(),
            fmt_pct(c.completion_rate),
            fmt_pct(c.average_grade),
            fmt_pct(c.average_quiz_grade),
            fmt_pct(c.average_assignment_grade),
            c.teachers.to_string(),
            c.quiz_attempts.to_string(),
            c.assignment_submissions.to_string(),
            c.pending_grading.to_string(),
        ]);
    }

    let labels = summaries.iter().map(|c| c.name.clone()).collect();
    let chart = Chart::new("bar", labels)
        .dataset("Completed", summaries.iter().map(|c| c.completed as f64).collect())
        .dataset(
            "Not completed",
            summaries
                .iter()
                .map(|c| c.enrolled.saturating_sub(c.completed) as f64)
                .collect(),
        )
        .stacked();

    let enrolled: usize = summaries.iter().map(|c| c.enrolled).sum();

    Page::new("Course enrolments", &s.ctx.company.name, "/reports/courses", s.ctx.window_days)
        .page_size(s.page_size)
        .stat("Courses", summaries.len())
        .stat("Student enrolments", enrolled)
        .chart(chart)
        .table(table)
        .render()
}
