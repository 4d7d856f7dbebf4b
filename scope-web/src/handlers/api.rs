//! JSON API handlers

use super::records::FilterParams;
use crate::{AppState, Error, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let timestamp = chrono::Utc::now().to_rfc3339();
    let metrics = state.storage.cache_metrics();
    let cache = json!({
        "hits": metrics.hit_count(),
        "misses": metrics.miss_count(),
        "hit_rate": metrics.hit_rate(),
    });
    match state.storage.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "service": "scope-web",
                "object_store": state.storage.objects().kind(),
                "cache": cache,
                "timestamp": timestamp
            })),
        ),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": "scope-web",
                    "error": "Record store unavailable",
                    "cache": cache,
                    "timestamp": timestamp
                })),
            )
        }
    }
}

/// Aggregate statistics with the compliance level
pub async fn api_stats(State(state): State<AppState>) -> Result<Json<Value>> {
    let stats = state.dashboard.aggregate_stats().await?;
    let level = stats.level(&state.settings.thresholds);

    Ok(Json(json!({
        "stats": stats,
        "level": level.label(),
        "target_percent": state.settings.thresholds.target_percent,
    })))
}

/// Query parameters for record listing
#[derive(Debug, Default, Deserialize)]
pub struct RecordsApiQuery {
    pub status: Option<String>,
    pub date: Option<String>,
    pub limit: Option<usize>,
}

/// Filtered records in display form, newest first
pub async fn api_records(
    State(state): State<AppState>,
    Query(query): Query<RecordsApiQuery>,
) -> Result<Json<Value>> {
    let filter = FilterParams {
        status: query.status,
        date: query.date,
    }
    .parse()?;
    let max = state.settings.browse_limit;
    let limit = match query.limit {
        Some(0) => return Err(Error::BadRequest("limit must be at least 1".to_string())),
        Some(limit) => limit.min(max),
        None => max,
    };

    let records = state.dashboard.browse(&filter, limit).await?;
    Ok(Json(json!({
        "filter": filter,
        "count": records.len(),
        "records": records,
    })))
}
