// src/routes/teachers.rs

use axum::{
    extract::{Query, State},
    Json,
};
use maud::Markup;

use super::{scope, ReportQuery};
use crate::access::TenantManager;
use crate::models::TeacherPerformanceRecord;
use crate::render::{fmt_pct, fmt_score, Chart, Page, Table};
use crate::AppState;

pub async fn teachers_json(
    State(state): State<AppState>,
    manager: TenantManager,
    Query(q): Query<ReportQuery>,
) -> Json<Vec<TeacherPerformanceRecord>> {
    let s = scope(&state, manager, &q);
    Json(s.aggregator.teacher_performance(&s.ctx).await)
}

pub async fn teachers_page(
    State(state): State<AppState>,
    manager: TenantManager,
    Query(q): Query<ReportQuery>,
) -> Markup {
    let s = scope(&state, manager, &q);
    let records = s.aggregator.teacher_performance(&s.ctx).await;

    let mut table = Table::new(vec![
        "Teacher", "Email", "Courses", "Students", "Completion", "Avg grade",
        "Engagement", "Pending grading", "Performance",
    ]);
    for r in &records {
        table.row(vec![
            r.name.clone(),
            r.email.clone(),
            r.courses_taught.to_string(),
            r.students.to_string(),
            fmt_pct(r.completion_rate),
            fmt_pct(r.average_grade),
            fmt_score(r.engagement_score),
            r.pending_grading.to_string(),
            fmt_score(r.performance_score),
        ]);
    }

    let chart = Chart::new("bar", records.iter().map(|r| r.name.clone()).collect())
        .dataset("Performance", records.iter().map(|r| r.performance_score).collect())
        .dataset("Engagement", records.iter().map(|r| r.engagement_score).collect());

    let pending: usize = records.iter().map(|r| r.pending_grading).sum();

    Page::new("Teacher performance", &s.ctx.company.name, "/reports/teachers", s.ctx.window_days)
        .page_size(s.page_size)
        .stat("Teachers", records.len())
        .stat("Pending grading", pending)
        .chart(chart)
        .table(table)
        .render()
}
