// src/routes/inactivity.rs

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use maud::Markup;

use super::{scope, ReportQuery};
use crate::access::TenantManager;
use crate::models::{ActivityTier, InactivityRecord, TierCounts};
use crate::render::{Chart, Page, Table};
use crate::AppState;

fn filter_tier(records: Vec<InactivityRecord>, tier: Option<&str>) -> Vec<InactivityRecord> {
    match tier.and_then(ActivityTier::parse) {
        Some(t) => records.into_iter().filter(|r| r.tier == t).collect(),
        None => records,
    }
}

pub async fn inactivity_json(
    State(state): State<AppState>,
    manager: TenantManager,
    Query(q): Query<ReportQuery>,
) -> Json<Vec<InactivityRecord>> {
    let s = scope(&state, manager, &q);
    let records = s.aggregator.inactivity(&s.ctx).await;
    Json(filter_tier(records, q.tier.as_deref()))
}

pub async fn inactivity_page(
    State(state): State<AppState>,
    manager: TenantManager,
    Query(q): Query<ReportQuery>,
) -> Markup {
    let s = scope(&state, manager, &q);
    let all = s.aggregator.inactivity(&s.ctx).await;

    let mut counts = TierCounts::default();
    for r in &all {
        counts.add(r.tier);
    }
    let records = filter_tier(all, q.tier.as_deref());

    let mut table = Table::new(vec!["Student", "Email", "Last access", "Days inactive", "Status"]);
    for r in &records {
        let last = r
            .last_access
            .and_then(|t| DateTime::<Utc>::from_timestamp(t, 0))
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "Never logged in".into());
        let days = r
            .days_inactive
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".into());
        table.row(vec![r.name.clone(), r.email.clone(), last, days, r.tier.label().to_string()]);
    }

    let chart = Chart::new(
        "doughnut",
        ActivityTier::ALL.iter().map(|t| t.label().to_string()).collect(),
    )
    .dataset(
        "Students",
        ActivityTier::ALL.iter().map(|t| counts.get(*t) as f64).collect(),
    );

    Page::new("Student inactivity", &s.ctx.company.name, "/reports/inactivity", s.ctx.window_days)
        .page_size(s.page_size)
        .stat("Critical (14+ days)", counts.critical)
        .stat("Warning (7-13 days)", counts.warning)
        .stat("Low activity (3-6 days)", counts.low_activity)
        .stat("Active", counts.active)
        .chart(chart)
        .table(table)
        .render()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, tier: ActivityTier) -> InactivityRecord {
        InactivityRecord {
            user_id: id,
            name: format!("S{id}"),
            email: String::new(),
            last_access: None,
            days_inactive: None,
            tier,
        }
    }

    #[test]
    fn tier_filter_keeps_matching_rows() {
        let rows = vec![record(1, ActivityTier::Critical), record(2, ActivityTier::Active)];
        let kept = filter_tier(rows.clone(), Some("critical"));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].user_id, 1);
        assert_eq!(filter_tier(rows.clone(), Some("bogus")).len(), 2);
        assert_eq!(filter_tier(rows, None).len(), 2);
    }
}
