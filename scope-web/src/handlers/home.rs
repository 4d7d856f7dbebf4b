//! Home page: headline statistics and the most recent records

use super::{chrome, csv_response, section};
use crate::{
    auth::AuthState,
    templates::{HomeTemplate, StatsView},
    AppState, Result,
};
use askama::Template;
use axum::{
    extract::State,
    response::{Html, Response},
    Extension,
};
use scope_core::export::{export_filename, records_to_csv, ExportPurpose};

/// Home page handler
pub async fn home(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthState>,
) -> Result<Html<String>> {
    let settings = &state.settings;
    let (stats, stats_notice) = section(state.dashboard.aggregate_stats().await, "statistics");
    let (recent, recent_notice) = section(
        state.dashboard.recent_records(settings.recent_limit).await,
        "recent records",
    );

    let template = HomeTemplate {
        chrome: chrome(&state, &auth, "home"),
        stats: stats.map(|s| StatsView::new(&s, &settings.thresholds)),
        stats_notice,
        recent,
        recent_notice,
        recent_limit: settings.recent_limit,
    };
    Ok(Html(template.render()?))
}

/// CSV of the most recent records table
pub async fn export_recent(State(state): State<AppState>) -> Result<Response> {
    let records = state
        .dashboard
        .recent_records(state.settings.recent_limit)
        .await?;
    let filename = export_filename(ExportPurpose::RecentRecords, state.settings.now());
    csv_response(&filename, records_to_csv(&records)?)
}
