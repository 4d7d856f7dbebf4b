//! HTTP object store against a mock blob endpoint

use scope_storage::objects::{BlobEndpoint, HttpObjectStore, ObjectFetchError, ObjectStore};
use std::time::Duration;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

async fn store_for(server: &MockServer, sas: Option<&str>) -> HttpObjectStore {
    let mut connection_string = format!("BlobEndpoint={}", server.uri());
    if let Some(sas) = sas {
        connection_string.push_str(&format!(";SharedAccessSignature={}", sas));
    }
    let endpoint = BlobEndpoint::from_connection_string(&connection_string).unwrap();
    HttpObjectStore::new(endpoint, Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn test_fetches_object_with_sas() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/photo/photo_1.jpg"))
        .and(query_param("sig", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\xff\xd8jpeg".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server, Some("sv=2022&sig=abc")).await;
    let data = store
        .fetch_binary("https://acct.blob.core.windows.net/photo/photo_1.jpg")
        .await
        .unwrap();
    assert_eq!(&data[..], b"\xff\xd8jpeg");
}

#[tokio::test]
async fn test_failures_are_distinguishable() {
    let server = MockServer::start().await;
    Mock::given(path("/photo/missing.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(path("/private/a.jpg"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(path("/photo/busy.jpg"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let store = store_for(&server, None).await;

    let err = store.fetch_binary("https://h/photo/missing.jpg").await.unwrap_err();
    assert!(matches!(err, ObjectFetchError::NotFound { .. }));

    let err = store.fetch_binary("https://h/private/a.jpg").await.unwrap_err();
    assert!(matches!(err, ObjectFetchError::Unauthorized { .. }));

    let err = store.fetch_binary("https://h/photo/busy.jpg").await.unwrap_err();
    assert!(err.is_transient());

    let err = store.fetch_binary("not-a-reference").await.unwrap_err();
    assert!(matches!(err, ObjectFetchError::InvalidLocation { .. }));
}

#[tokio::test]
async fn test_timeout_is_transient() {
    let server = MockServer::start().await;
    Mock::given(path("/photo/slow.jpg"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let endpoint = BlobEndpoint::from_connection_string(&format!("BlobEndpoint={}", server.uri())).unwrap();
    let store = HttpObjectStore::new(endpoint, Duration::from_millis(200)).unwrap();

    let err = store.fetch_binary("https://h/photo/slow.jpg").await.unwrap_err();
    assert!(err.is_transient());
}
