// src/routes/mod.rs

use serde::Deserialize;
use tracing::debug;

use crate::access::TenantManager;
use crate::metrics::aggregator::{MetricsAggregator, TenantContext};
use crate::AppState;

pub mod courses;
pub mod health;
pub mod inactivity;
pub mod overview;
pub mod students;
pub mod teachers;

pub const MAX_WINDOW_DAYS: i64 = 365;

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub days: Option<i64>,
    pub tier: Option<String>,
}

/// Everything a report handler needs: the tenant, the window and an
/// aggregator bound to the shared data source.
pub struct ReportScope<'a> {
    pub ctx: TenantContext,
    pub aggregator: MetricsAggregator<'a>,
    pub page_size: usize,
}

pub fn scope<'a>(state: &'a AppState, manager: TenantManager, q: &ReportQuery) -> ReportScope<'a> {
    let now = chrono::Utc::now().timestamp();
    let days = q
        .days
        .unwrap_or(state.config.window_days)
        .clamp(1, MAX_WINDOW_DAYS);
    debug!(user_id = manager.user_id, company_id = manager.company.id, days, "report scope");
    ReportScope {
        ctx: TenantContext::new(manager.company, days, now),
        aggregator: MetricsAggregator::new(state.data.as_ref(), &state.config.scoring, now),
        page_size: state.config.page_size,
    }
}
