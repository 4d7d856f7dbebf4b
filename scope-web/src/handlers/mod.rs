//! Web handlers for the SCOPE dashboard

pub mod api;
pub mod dashboard;
pub mod home;
pub mod records;

use crate::{auth::AuthState, templates::Chrome, AppState, Error, Result};
use axum::{
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderValue,
    },
    response::{IntoResponse, Response},
};
use tracing::error;

pub use api::{api_records, api_stats, health};
pub use dashboard::{dashboard, export_violations};
pub use home::{export_recent, home};
pub use records::{export_records, record_image, records_page, refresh_records};

/// Page frame for the signed-in operator
pub(crate) fn chrome(state: &AppState, auth: &AuthState, page: &str) -> Chrome {
    Chrome::new(&state.settings.product_name, auth.username(), page)
}

/// Splits a section result into its data and the notice shown in its place.
///
/// A failed section never fails the page.
pub(crate) fn section<T>(result: scope_storage::Result<T>, what: &str) -> (Option<T>, Option<String>) {
    match result {
        Ok(value) => (Some(value), None),
        Err(e) => {
            error!("Failed to load {}: {}", what, e);
            let notice = if e.is_store_unavailable() {
                format!("Could not load {}: the record store is unavailable.", what)
            } else {
                format!("Could not load {}.", what)
            };
            (None, Some(notice))
        }
    }
}

/// CSV attachment response
pub(crate) fn csv_response(filename: &str, body: Vec<u8>) -> Result<Response> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|e| Error::Internal(anyhow::anyhow!("Invalid export filename: {}", e)))?;

    let mut response = body.into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8"));
    headers.insert(CONTENT_DISPOSITION, disposition);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_notice_on_unavailable_store() {
        let (data, notice) = section::<u64>(
            Err(scope_storage::Error::Migration("locked".into())),
            "statistics",
        );
        assert!(data.is_none());
        assert_eq!(
            notice.as_deref(),
            Some("Could not load statistics: the record store is unavailable.")
        );

        let (data, notice) = section(Ok(3u64), "statistics");
        assert_eq!(data, Some(3));
        assert!(notice.is_none());
    }

    #[test]
    fn test_csv_response_headers() {
        let response = csv_response("violations_20240102_030405.csv", b"No\n".to_vec()).unwrap();
        assert_eq!(response.headers()[CONTENT_TYPE], "text/csv; charset=utf-8");
        assert_eq!(
            response.headers()[CONTENT_DISPOSITION],
            "attachment; filename=\"violations_20240102_030405.csv\""
        );
    }
}
