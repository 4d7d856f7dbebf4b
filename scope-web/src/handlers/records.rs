//! Record browser: filters, detail panel, refresh, export and image proxy

use super::{chrome, csv_response, section};
use crate::{
    auth::AuthState,
    templates::{DetailView, RecordsTemplate, StatusOption},
    AppState, Result,
};
use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use scope_core::{
    export::{export_filename, records_to_csv, ExportPurpose},
    filter::parse_date_field,
    RecordFilter, StatusFilter,
};
use scope_storage::ObjectFetchError;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Filter parameters shared by the page, refresh and export
#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    pub status: Option<String>,
    pub date: Option<String>,
}

impl FilterParams {
    /// Validate into a filter; blank values mean "no constraint"
    pub fn parse(&self) -> scope_core::Result<RecordFilter> {
        let status = match self.status.as_deref() {
            Some(value) => value.parse::<StatusFilter>()?,
            None => StatusFilter::All,
        };
        let date = parse_date_field(self.date.as_deref())?;
        Ok(RecordFilter::new(status, date))
    }
}

/// Query string of the record browser
#[derive(Debug, Default, Deserialize)]
pub struct RecordsQuery {
    pub status: Option<String>,
    pub date: Option<String>,
    pub selected: Option<String>,
}

/// `status=...&date=...` for links that keep the active filter
fn filter_query(filter: &RecordFilter) -> String {
    format!(
        "status={}&date={}",
        filter.status.as_str(),
        filter.date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
    )
}

/// Record browser page
pub async fn records_page(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthState>,
    Query(query): Query<RecordsQuery>,
) -> Result<Html<String>> {
    let params = FilterParams {
        status: query.status,
        date: query.date,
    };
    let (filter, filter_notice) = match params.parse() {
        Ok(filter) => (filter, None),
        Err(e) => {
            debug!("Rejected record filter: {}", e);
            (RecordFilter::default(), Some(format!("{}. Showing all records.", e)))
        }
    };

    let (records, records_notice) = section(
        state.dashboard.browse(&filter, state.settings.browse_limit).await,
        "records",
    );

    let selected = query
        .selected
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let (detail, detail_notice) = match &selected {
        Some(id) => match state.dashboard.record_detail(id).await {
            Ok(Some((_, detail))) => (Some(DetailView::new(detail)), None),
            Ok(None) => (None, Some(format!("Record {} was not found.", id))),
            Err(e) => section::<DetailView>(Err(e), "record details"),
        },
        None => (None, None),
    };

    let template = RecordsTemplate {
        chrome: chrome(&state, &auth, "records"),
        status_options: StatusOption::all(filter.status),
        date_value: filter
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        filter_notice,
        records,
        records_notice,
        selected: selected.unwrap_or_default(),
        detail,
        detail_notice,
        filter_query: filter_query(&filter),
        status_value: filter.status.as_str().to_string(),
    };
    Ok(Html(template.render()?))
}

/// Drop cached query results and reload the browser with the same filter
pub async fn refresh_records(State(state): State<AppState>, Form(params): Form<FilterParams>) -> Redirect {
    state.storage.refresh().await;
    info!("Record cache refreshed on operator request");

    match params.parse() {
        Ok(filter) => Redirect::to(&format!("/records?{}", filter_query(&filter))),
        Err(_) => Redirect::to("/records"),
    }
}

/// CSV of the filtered record table
pub async fn export_records(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> Result<Response> {
    let filter = params.parse()?;
    let records = state
        .dashboard
        .browse(&filter, state.settings.browse_limit)
        .await?;
    let filename = export_filename(ExportPurpose::Records, state.settings.now());
    csv_response(&filename, records_to_csv(&records)?)
}

fn image_unavailable(status: StatusCode) -> Response {
    (status, "image unavailable").into_response()
}

fn content_type_for(extension: Option<&str>) -> &'static str {
    match extension {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Stream the image of a record from the object store
pub async fn record_image(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let Some(record) = state.dashboard.find_record(&id).await? else {
        return Ok(image_unavailable(StatusCode::NOT_FOUND));
    };

    let location = match record.object_location() {
        Some(Ok(location)) => location,
        Some(Err(e)) => {
            warn!(record_id = %id, "Unusable image location: {}", e);
            return Ok(image_unavailable(StatusCode::NOT_FOUND));
        }
        None => return Ok(image_unavailable(StatusCode::NOT_FOUND)),
    };

    match state.storage.objects().fetch_object(&location).await {
        Ok(bytes) => {
            let extension = location.extension();
            let mut response = bytes.into_response();
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static(content_type_for(extension.as_deref())),
            );
            Ok(response)
        }
        Err(e) => {
            warn!(record_id = %id, kind = e.kind(), "Image fetch failed: {}", e);
            let status = match e {
                ObjectFetchError::InvalidLocation { .. } | ObjectFetchError::NotFound { .. } => {
                    StatusCode::NOT_FOUND
                }
                ObjectFetchError::Unauthorized { .. } | ObjectFetchError::Transient { .. } => {
                    StatusCode::BAD_GATEWAY
                }
            };
            Ok(image_unavailable(status))
        }
    }
}
