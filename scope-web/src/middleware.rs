//! Request logging and security headers

use axum::{
    extract::{MatchedPath, Request},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info_span, Instrument};

/// Threshold for slow request warnings in milliseconds
const SLOW_REQUEST_THRESHOLD_MS: u128 = 1000;

/// Logs every request with its status and latency
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let matched_path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| path.clone());

    let span = info_span!(
        "request",
        method = %method,
        path = %path,
        matched_path = %matched_path,
    );

    async move {
        let response = next.run(req).await;
        let elapsed = start.elapsed();
        let status = response.status();

        tracing::info!(
            status = %status,
            elapsed_ms = elapsed.as_millis(),
            "Request completed"
        );

        if elapsed.as_millis() > SLOW_REQUEST_THRESHOLD_MS {
            tracing::warn!(
                status = %status,
                elapsed_ms = elapsed.as_millis(),
                "Slow request detected"
            );
        }

        response
    }
    .instrument(span)
    .await
}

/// Adds basic security headers to every response
pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    // Pages carry inline styles only; images come from our own proxy
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' data:; object-src 'self'",
        ),
    );
    // Dashboard data changes underneath us
    if !headers.contains_key(header::CACHE_CONTROL) {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }

    response
}
