//! End-to-end router tests over an in-memory record store

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use scope_storage::{
    objects::LocalObjectStore, MemoryRecordStore, QueryCacheConfig, StorageManager,
};
use scope_web::{
    auth::{AuthService, UserCredentials},
    create_app, AppState, DashboardSettings,
};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: MemoryRecordStore,
    _images: TempDir,
}

fn seed() -> Vec<scope_storage::core::DetectionRecord> {
    use scope_storage::core::DetectionRecord;
    vec![
        DetectionRecord::builder("r1")
            .filename("photo_1.jpg")
            .image_location("https://acct.blob.core.windows.net/photo/photo_1.jpg")
            .uploaded_at(Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap())
            .processed_at(Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 5).unwrap())
            .processed(true)
            .compliance_status("helmet")
            .confidence(0.93)
            .build(),
        DetectionRecord::builder("r2")
            .filename("photo_2.jpg")
            .image_location("https://acct.blob.core.windows.net/photo/photo_2.jpg")
            .uploaded_at(Utc.with_ymd_and_hms(2024, 1, 3, 9, 30, 0).unwrap())
            .processed_at(Utc.with_ymd_and_hms(2024, 1, 3, 9, 30, 2).unwrap())
            .processed(true)
            .compliance_status("violation")
            .confidence(0.88)
            .build(),
        DetectionRecord::builder("r3")
            .filename("photo_3.jpg")
            .processed(false)
            .build(),
    ]
}

fn test_app() -> TestApp {
    let images = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(images.path().join("photo")).unwrap();
    std::fs::write(images.path().join("photo/photo_1.jpg"), b"\xff\xd8jpeg").unwrap();

    let store = MemoryRecordStore::new(seed());
    let storage = StorageManager::from_parts(
        Arc::new(store.clone()),
        Arc::new(LocalObjectStore::new(images.path())),
        &QueryCacheConfig::default(),
    );
    let users = vec![UserCredentials::with_password("admin", "admin123", 4).unwrap()];
    let auth = AuthService::new(users, Duration::hours(8));
    let state = AppState::new(Arc::new(storage), auth, DashboardSettings::default());

    TestApp {
        router: create_app(state),
        store,
        _images: images,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, String::from_utf8_lossy(&body).into_owned())
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, form: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(form.to_string())).unwrap()
}

async fn login(router: &Router) -> String {
    let (status, headers, _) = send(router, post_form("/login", "username=admin&password=admin123", None)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    let set_cookie = headers[header::SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn test_pages_require_login() {
    let app = test_app();

    let (status, headers, _) = send(&app.router, get("/", None)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(headers[header::LOCATION], "/login");

    let (status, _, body) = send(&app.router, get("/api/stats", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Authentication required"));

    let (status, _, body) = send(&app.router, get("/login", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Sign in"));
}

#[tokio::test]
async fn test_login_feedback() {
    let app = test_app();

    let (status, _, body) = send(&app.router, post_form("/login", "username=admin&password=", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Please enter both username and password."));

    let (status, headers, body) = send(&app.router, post_form("/login", "username=admin&password=nope", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!headers.contains_key(header::SET_COOKIE));
    assert!(body.contains("Invalid username or password."));
}

#[tokio::test]
async fn test_home_shows_stats_and_recent_records() {
    let app = test_app();
    let cookie = login(&app.router).await;

    let (status, headers, body) = send(&app.router, get("/", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(body.contains("Signed in as admin"));
    assert!(body.contains("Total Images"));
    // Newest upload first, the undated record last
    let p2 = body.find("photo_2.jpg").unwrap();
    let p1 = body.find("photo_1.jpg").unwrap();
    let p3 = body.find("photo_3.jpg").unwrap();
    assert!(p2 < p1 && p1 < p3);
}

#[tokio::test]
async fn test_unavailable_store_renders_notices() {
    let app = test_app();
    let cookie = login(&app.router).await;
    app.store.set_unavailable(true);

    let (status, _, body) = send(&app.router, get("/dashboard", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Could not load statistics: the record store is unavailable."));
    assert!(body.contains("Could not load recent violations"));

    let (status, _, body) = send(&app.router, get("/api/health", None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("unhealthy"));

    let (status, _, _) = send(&app.router, get("/api/stats", Some(&cookie))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_health_reports_cache_counters() {
    let app = test_app();
    let cookie = login(&app.router).await;

    let (status, _, body) = send(&app.router, get("/api/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    let health: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["cache"]["hits"], 0);
    assert_eq!(health["cache"]["misses"], 0);

    // Four count queries per statistics load; the second load is served from cache
    send(&app.router, get("/api/stats", Some(&cookie))).await;
    send(&app.router, get("/api/stats", Some(&cookie))).await;

    let (_, _, body) = send(&app.router, get("/api/health", None)).await;
    let health: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["cache"]["hits"], 4);
    assert_eq!(health["cache"]["misses"], 4);
    assert_eq!(health["cache"]["hit_rate"], 0.5);
}

#[tokio::test]
async fn test_records_filter_and_detail() {
    let app = test_app();
    let cookie = login(&app.router).await;

    let (status, _, body) = send(
        &app.router,
        get("/records?status=violation&date=2024-01-03&selected=r2", Some(&cookie)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("photo_2.jpg"));
    assert!(!body.contains("photo_1.jpg"));
    assert!(body.contains("03 January 2024"));
    assert!(body.contains("/records/r2/image"));

    let (_, _, body) = send(&app.router, get("/records?date=2024-01-05", Some(&cookie))).await;
    assert!(body.contains("No data matches the filter."));

    let (status, _, body) = send(&app.router, get("/records?status=maybe", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Showing all records."));
    assert!(body.contains("photo_3.jpg"));

    let (_, _, body) = send(&app.router, get("/records?selected=missing", Some(&cookie))).await;
    assert!(body.contains("Record missing was not found."));
}

#[tokio::test]
async fn test_csv_exports() {
    let app = test_app();
    let cookie = login(&app.router).await;

    let (status, headers, body) = send(&app.router, get("/export/records.csv?status=compliant", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"records_"));
    let mut lines = body.lines();
    assert_eq!(lines.next(), Some("No,Date,Time,File Name,Confidence,Status"));
    assert!(lines.next().unwrap().contains("photo_1.jpg"));
    assert!(lines.next().is_none());

    let (status, _, _) = send(&app.router, get("/export/records.csv?date=yesterday", Some(&cookie))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = send(&app.router, get("/export/violations.csv", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with("No,File Name,Image URL,Confidence,Detected At"));
    assert!(body.contains("0.880"));
}

#[tokio::test]
async fn test_record_image_proxy() {
    let app = test_app();
    let cookie = login(&app.router).await;

    let (status, headers, body) = send(&app.router, get("/records/r1/image", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/jpeg");
    assert!(body.ends_with("jpeg"));

    // Object missing from the store
    let (status, _, body) = send(&app.router, get("/records/r2/image", Some(&cookie))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "image unavailable");

    // No location recorded
    let (status, _, _) = send(&app.router, get("/records/r3/image", Some(&cookie))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(&app.router, get("/records/nope/image", Some(&cookie))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_records_limit() {
    let app = test_app();
    let cookie = login(&app.router).await;

    let (status, _, body) = send(&app.router, get("/api/records?status=violation&limit=1", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["count"], 1);
    assert_eq!(json["filter"]["status"], "violation");
    assert_eq!(json["records"][0]["filename"], "photo_2.jpg");
    assert_eq!(json["records"][0]["confidence"], "88.0%");

    let (status, _, _) = send(&app.router, get("/api/records?limit=0", Some(&cookie))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(&app.router, get("/api/records?status=unknown", Some(&cookie))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_reloads_store_and_keeps_filter() {
    let app = test_app();
    let cookie = login(&app.router).await;

    let (_, _, body) = send(&app.router, get("/api/stats", Some(&cookie))).await;
    assert!(body.contains("\"total\":3"));

    app.store.replace(vec![]);
    let (_, _, body) = send(&app.router, get("/api/stats", Some(&cookie))).await;
    assert!(body.contains("\"total\":3"), "served from cache");

    let (status, headers, _) = send(
        &app.router,
        post_form("/records/refresh", "status=violation&date=2024-01-03", Some(&cookie)),
    )
    .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(headers[header::LOCATION], "/records?status=violation&date=2024-01-03");

    let (_, _, body) = send(&app.router, get("/api/stats", Some(&cookie))).await;
    assert!(body.contains("\"total\":0"));
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = test_app();
    let cookie = login(&app.router).await;

    let (status, headers, _) = send(&app.router, post_form("/logout", "", Some(&cookie))).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(headers[header::LOCATION], "/login");

    let (status, _, _) = send(&app.router, get("/", Some(&cookie))).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
}
