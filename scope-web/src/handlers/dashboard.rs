//! Analytics dashboard handlers

use super::{chrome, csv_response, section};
use crate::{
    auth::AuthState,
    templates::{DashboardTemplate, StatsView, TrendView, ViolationsView},
    AppState, Result,
};
use askama::Template;
use axum::{
    extract::State,
    response::{Html, Response},
    Extension,
};
use scope_core::{
    export::{export_filename, violations_to_csv, ExportPurpose},
    stats::format_count,
};

/// Dashboard page handler
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthState>,
) -> Result<Html<String>> {
    let settings = &state.settings;
    let service = &state.dashboard;

    let (stats, stats_notice) = section(service.aggregate_stats().await, "statistics");
    let (trend, trend_notice) = section(service.violation_trend().await, "violation trend");
    let (violations, violations_notice) = section(
        service.recent_violations(settings.violations_limit).await,
        "recent violations",
    );

    let template = DashboardTemplate {
        chrome: chrome(&state, &auth, "dashboard"),
        stats: stats.map(|s| StatsView::new(&s, &settings.thresholds)),
        stats_notice,
        trend: trend.as_ref().map(TrendView::new),
        trend_notice,
        violations: violations.map(|report| ViolationsView {
            total: format_count(report.total),
            rows: report.rows,
        }),
        violations_notice,
        last_updated: settings.now().format("%Y-%m-%d %H:%M:%S").to_string(),
        data_source: settings.data_source.clone(),
    };
    Ok(Html(template.render()?))
}

/// CSV of the recent violations table
pub async fn export_violations(State(state): State<AppState>) -> Result<Response> {
    let report = state
        .dashboard
        .recent_violations(state.settings.violations_limit)
        .await?;
    let filename = export_filename(ExportPurpose::Violations, state.settings.now());
    csv_response(&filename, violations_to_csv(&report.rows)?)
}
