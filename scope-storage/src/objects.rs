//! Object store gateway for detection images
//!
//! Images are addressed by a reference URI whose last two path segments name
//! the container and the object. Two backends exist:
//!
//! - [`HttpObjectStore`] talks to a blob service endpoint described by an
//!   Azure-style connection string (`BlobEndpoint=...;SharedAccessSignature=...`
//!   or `AccountName=...;EndpointSuffix=...`).
//! - [`LocalObjectStore`] reads `<root>/<container>/<object>` from disk.
//!
//! Failures are reported as [`ObjectFetchError`] so callers can show an
//! "image unavailable" notice without failing the page.

use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use scope_core::ObjectLocation;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    path::{Component, Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// Distinguishable image retrieval failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObjectFetchError {
    #[error("invalid image reference: {reference}")]
    InvalidLocation { reference: String },

    #[error("image not found: {location}")]
    NotFound { location: String },

    #[error("not authorized to read image: {location}")]
    Unauthorized { location: String },

    #[error("transient failure fetching {location}: {reason}")]
    Transient { location: String, reason: String },
}

impl ObjectFetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            ObjectFetchError::InvalidLocation { .. } => "invalid_location",
            ObjectFetchError::NotFound { .. } => "not_found",
            ObjectFetchError::Unauthorized { .. } => "unauthorized",
            ObjectFetchError::Transient { .. } => "transient",
        }
    }

    /// Whether retrying later could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, ObjectFetchError::Transient { .. })
    }
}

pub type FetchResult<T> = std::result::Result<T, ObjectFetchError>;

/// Read-only gateway to image binaries
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the object at a parsed location
    async fn fetch_object(&self, location: &ObjectLocation) -> FetchResult<Bytes>;

    /// Backend name for logs and the health endpoint
    fn kind(&self) -> &'static str;

    /// Parse `reference` and fetch the object it names
    async fn fetch_binary(&self, reference: &str) -> FetchResult<Bytes> {
        let location = ObjectLocation::parse(reference).map_err(|_| ObjectFetchError::InvalidLocation {
            reference: reference.to_string(),
        })?;
        debug!(container = %location.container, object = %location.object, "Fetching object");
        self.fetch_object(&location).await
    }
}

/// Which backend to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectStoreKind {
    #[default]
    Http,
    Local,
}

/// Object store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    pub kind: ObjectStoreKind,
    pub connection_string: Option<String>,
    pub local_root: Option<PathBuf>,
    pub timeout_seconds: u64,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            kind: ObjectStoreKind::Http,
            connection_string: None,
            local_root: None,
            timeout_seconds: 10,
        }
    }
}

/// Build the configured backend. Called once per process.
pub fn build_object_store(config: &ObjectStoreConfig) -> Result<Arc<dyn ObjectStore>> {
    match config.kind {
        ObjectStoreKind::Http => {
            let connection_string = config.connection_string.as_deref().ok_or_else(|| {
                Error::Configuration("object_store.connection_string is required for the http backend".into())
            })?;
            let endpoint = BlobEndpoint::from_connection_string(connection_string)?;
            let store = HttpObjectStore::new(endpoint, Duration::from_secs(config.timeout_seconds))?;
            info!("Object store: http endpoint {}", store.endpoint.base);
            Ok(Arc::new(store))
        }
        ObjectStoreKind::Local => {
            let root = config.local_root.clone().ok_or_else(|| {
                Error::Configuration("object_store.local_root is required for the local backend".into())
            })?;
            info!("Object store: local directory {}", root.display());
            Ok(Arc::new(LocalObjectStore::new(root)))
        }
    }
}

/// Blob service base URL plus optional SAS token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobEndpoint {
    pub base: Url,
    pub sas_token: Option<String>,
}

impl BlobEndpoint {
    /// Parse an Azure-style `Key=Value;...` connection string
    pub fn from_connection_string(value: &str) -> Result<Self> {
        let fields: HashMap<String, String> = value
            .split(';')
            .filter_map(|part| part.split_once('='))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .filter(|(_, v)| !v.is_empty())
            .collect();

        let base = match fields.get("blobendpoint") {
            Some(endpoint) => endpoint.clone(),
            None => {
                let account = fields.get("accountname").ok_or_else(|| {
                    Error::Configuration("connection string needs BlobEndpoint or AccountName".into())
                })?;
                let protocol = fields
                    .get("defaultendpointsprotocol")
                    .map(String::as_str)
                    .unwrap_or("https");
                let suffix = fields
                    .get("endpointsuffix")
                    .map(String::as_str)
                    .unwrap_or("core.windows.net");
                format!("{}://{}.blob.{}", protocol, account, suffix)
            }
        };

        let mut base = Url::parse(&base)
            .map_err(|e| Error::Configuration(format!("invalid blob endpoint '{}': {}", base, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let sas_token = fields
            .get("sharedaccesssignature")
            .map(|sas| sas.trim_start_matches('?').to_string());

        if sas_token.is_none() && fields.contains_key("accountkey") {
            warn!("AccountKey is not used for signing; only public or SAS-authorized containers are readable");
        }

        Ok(Self { base, sas_token })
    }

    /// Absolute URL of an object
    pub fn object_url(&self, location: &ObjectLocation) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Configuration(format!("blob endpoint '{}' cannot be a base", self.base)))?
            .pop_if_empty()
            .push(&location.container)
            .extend(location.object.split('/'));
        url.set_query(self.sas_token.as_deref());
        Ok(url)
    }
}

/// Blob service backend over HTTP
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: BlobEndpoint,
}

impl HttpObjectStore {
    pub fn new(endpoint: BlobEndpoint, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &BlobEndpoint {
        &self.endpoint
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn fetch_object(&self, location: &ObjectLocation) -> FetchResult<Bytes> {
        let label = location.to_string();
        let url = self
            .endpoint
            .object_url(location)
            .map_err(|e| ObjectFetchError::Transient {
                location: label.clone(),
                reason: e.to_string(),
            })?;

        let response = self
            .client
            .get(url)
            .header("x-ms-version", "2021-08-06")
            .send()
            .await
            .map_err(|e| ObjectFetchError::Transient {
                location: label.clone(),
                reason: e.to_string(),
            })?;

        match response.status() {
            status if status.is_success() => {
                response.bytes().await.map_err(|e| ObjectFetchError::Transient {
                    location: label,
                    reason: e.to_string(),
                })
            }
            StatusCode::NOT_FOUND => Err(ObjectFetchError::NotFound { location: label }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ObjectFetchError::Unauthorized { location: label })
            }
            status => Err(ObjectFetchError::Transient {
                location: label,
                reason: format!("unexpected status {}", status),
            }),
        }
    }

    fn kind(&self) -> &'static str {
        "http"
    }
}

/// Filesystem backend rooted at a directory
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Path of an object, refusing anything that escapes the root
    fn resolve(&self, location: &ObjectLocation) -> Option<PathBuf> {
        let relative = Path::new(&location.container).join(&location.object);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        safe.then(|| self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn fetch_object(&self, location: &ObjectLocation) -> FetchResult<Bytes> {
        let label = location.to_string();
        let path = self
            .resolve(location)
            .ok_or_else(|| ObjectFetchError::InvalidLocation {
                reference: label.clone(),
            })?;

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ObjectFetchError::NotFound { location: label })
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(ObjectFetchError::Unauthorized { location: label })
            }
            Err(e) => Err(ObjectFetchError::Transient {
                location: label,
                reason: e.to_string(),
            }),
        }
    }

    fn kind(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_string_with_sas() {
        let endpoint = BlobEndpoint::from_connection_string(
            "BlobEndpoint=https://acct.blob.core.windows.net;SharedAccessSignature=?sv=2022&sig=abc",
        )
        .unwrap();
        assert_eq!(endpoint.base.as_str(), "https://acct.blob.core.windows.net/");
        assert_eq!(endpoint.sas_token.as_deref(), Some("sv=2022&sig=abc"));

        let location = ObjectLocation::parse("https://other.host/photo/2024/a.jpg").unwrap();
        let url = endpoint.object_url(&location).unwrap();
        assert_eq!(
            url.as_str(),
            "https://acct.blob.core.windows.net/2024/a.jpg?sv=2022&sig=abc"
        );
    }

    #[test]
    fn test_connection_string_with_account() {
        let endpoint = BlobEndpoint::from_connection_string(
            "DefaultEndpointsProtocol=https;AccountName=scopeimg;AccountKey=c2VjcmV0;EndpointSuffix=core.windows.net",
        )
        .unwrap();
        assert_eq!(endpoint.base.as_str(), "https://scopeimg.blob.core.windows.net/");
        assert_eq!(endpoint.sas_token, None);
    }

    #[test]
    fn test_connection_string_rejects_missing_endpoint() {
        assert!(BlobEndpoint::from_connection_string("AccountKey=abc").is_err());
        assert!(BlobEndpoint::from_connection_string("BlobEndpoint=not a url").is_err());
    }

    #[test]
    fn test_build_requires_backend_settings() {
        let http = ObjectStoreConfig::default();
        assert!(matches!(build_object_store(&http), Err(Error::Configuration(_))));

        let local = ObjectStoreConfig {
            kind: ObjectStoreKind::Local,
            ..ObjectStoreConfig::default()
        };
        assert!(matches!(build_object_store(&local), Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_local_store_reads_and_classifies() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("photo")).unwrap();
        std::fs::write(dir.path().join("photo/a.jpg"), b"jpeg").unwrap();

        let store = LocalObjectStore::new(dir.path());
        let data = store.fetch_binary("https://x.blob.core.windows.net/photo/a.jpg").await.unwrap();
        assert_eq!(&data[..], b"jpeg");

        let err = store.fetch_binary("https://x/photo/missing.jpg").await.unwrap_err();
        assert_eq!(err.kind(), "not_found");

        let err = store.fetch_binary("a.jpg").await.unwrap_err();
        assert_eq!(err.kind(), "invalid_location");
    }

    #[tokio::test]
    async fn test_local_store_refuses_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let location = ObjectLocation {
            container: "..".to_string(),
            object: "etc".to_string(),
        };
        let err = store.fetch_object(&location).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_location");
    }
}
