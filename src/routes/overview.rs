// src/routes/overview.rs

use axum::{
    extract::{Query, State},
    Json,
};
use maud::Markup;

use super::{scope, ReportQuery};
use crate::access::TenantManager;
use crate::models::{ActivityTier, TenantOverview};
use crate::render::{fmt_pct, Chart, Page};
use crate::AppState;

pub async fn overview_json(
    State(state): State<AppState>,
    manager: TenantManager,
    Query(q): Query<ReportQuery>,
) -> Json<TenantOverview> {
    let s = scope(&state, manager, &q);
    Json(s.aggregator.overview(&s.ctx).await)
}

pub async fn overview_page(
    State(state): State<AppState>,
    manager: TenantManager,
    Query(q): Query<ReportQuery>,
) -> Markup {
    let s = scope(&state, manager, &q);
    let o = s.aggregator.overview(&s.ctx).await;

    let tiers = Chart::new(
        "doughnut",
        ActivityTier::ALL.iter().map(|t| t.label().to_string()).collect(),
    )
    .dataset(
        "Students",
        ActivityTier::ALL.iter().map(|t| o.tier_counts.get(*t) as f64).collect(),
    );

    Page::new("School overview", &o.company.name, "/reports", o.window_days)
        .page_size(s.page_size)
        .stat("Students", o.students)
        .stat("Teachers", o.teachers)
        .stat("Courses", o.courses)
        .stat("Active enrolments", o.enrolments)
        .stat("Completion rate", fmt_pct(o.completion_rate))
        .stat("Average grade", fmt_pct(o.average_grade))
        .stat("Active users", o.active_users)
        .stat("Pending grading", o.pending_grading)
        .chart(tiers)
        .render()
}
