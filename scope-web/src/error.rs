//! Error types for web interface

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Web interface error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] scope_storage::Error),

    #[error("Core domain error: {0}")]
    Core(#[from] scope_core::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Convenience result type for web operations
pub type Result<T> = std::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Error::Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication required".to_string()),
            Error::Core(ref err) if err.is_validation() => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Storage(ref err) if err.is_store_unavailable() => {
                tracing::error!("Record store unavailable: {}", err);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Record store unavailable".to_string(),
                )
            }
            Error::Storage(ref err) => {
                tracing::error!("Storage error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            Error::Core(ref err) => {
                tracing::error!("Core error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            Error::Template(ref err) => {
                tracing::error!("Template error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Template rendering error".to_string(),
                )
            }
            Error::Io(ref err) => {
                tracing::error!("IO error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            Error::Internal(ref err) => {
                tracing::error!("Internal error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let unavailable = Error::Storage(scope_storage::Error::Migration("locked".into()));
        assert_eq!(unavailable.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);

        let invalid = Error::Core(scope_core::Error::validation("bad date"));
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);

        assert_eq!(Error::Unauthorized.into_response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            Error::NotFound("record".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
    }
}
