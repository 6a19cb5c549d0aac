// src/routes/students.rs

use axum::{
    extract::{Query, State},
    Json,
};
use maud::Markup;

use super::{scope, ReportQuery};
use crate::access::TenantManager;
use crate::models::StudentPerformanceRecord;
use crate::render::{fmt_pct, fmt_score, Chart, Page, Table};
use crate::AppState;

const CHART_TOP: usize = 15;

pub async fn students_json(
    State(state): State<AppState>,
    manager: TenantManager,
    Query(q): Query<ReportQuery>,
) -> Json<Vec<StudentPerformanceRecord>> {
    let s = scope(&state, manager, &q);
    Json(s.aggregator.student_performance(&s.ctx).await)
}

pub async fn students_page(
    State(state): State<AppState>,
    manager: TenantManager,
    Query(q): Query<ReportQuery>,
) -> Markup {
    let s = scope(&state, manager, &q);
    let records = s.aggregator.student_performance(&s.ctx).await;

    let mut table = Table::new(vec![
        "Student", "Email", "Enrolled", "Completed", "In progress", "Not started",
        "Avg grade", "Completion", "Engagement", "Performance",
    ]);
    for r in &records {
        table.row(vec![
            r.name.clone(),
            r.email.clone(),
            r.courses_enrolled.to_string(),
            r.completed.to_string(),
            r.in_progress.to_string(),
            r.not_started.to_string(),
            fmt_pct(r.average_grade),
            fmt_pct(r.completion_rate),
            fmt_score(r.engagement_score),
            fmt_score(r.performance_score),
        ]);
    }

    let top = &records[..records.len().min(CHART_TOP)];
    let chart = Chart::new("bar", top.iter().map(|r| r.name.clone()).collect())
        .dataset("Completion %", top.iter().map(|r| r.completion_rate).collect())
        .dataset("Avg grade %", top.iter().map(|r| r.average_grade).collect())
        .dataset("Performance", top.iter().map(|r| r.performance_score).collect());

    let completed: usize = records.iter().map(|r| r.completed).sum();
    let enrolled: usize = records.iter().map(|r| r.courses_enrolled).sum();

    Page::new("Student performance", &s.ctx.company.name, "/reports/students", s.ctx.window_days)
        .page_size(s.page_size)
        .stat("Students", records.len())
        .stat("Enrolments", enrolled)
        .stat("Completions", completed)
        .stat("Overall completion", fmt_pct(crate::metrics::completion_rate(completed, enrolled)))
        .chart(chart)
        .table(table)
        .render()
}
