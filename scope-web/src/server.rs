//! Web server for the SCOPE dashboard

use crate::{
    auth::{auth_middleware, login_handler, login_page, logout_handler},
    handlers,
    middleware::{logging_middleware, security_headers_middleware},
    AppState, Result,
};
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use std::{future::Future, time::Duration};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

/// How often expired sessions are purged
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Web server configuration
#[derive(Debug, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
        }
    }
}

impl WebConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Build the application router
pub fn create_app(state: AppState) -> Router {
    let auth = state.auth.clone();

    Router::new()
        // Pages
        .route("/", get(handlers::home))
        .route("/dashboard", get(handlers::dashboard))
        .route("/records", get(handlers::records_page))
        .route("/records/refresh", post(handlers::refresh_records))
        .route("/records/:id/image", get(handlers::record_image))
        // Exports
        .route("/export/recent.csv", get(handlers::export_recent))
        .route("/export/violations.csv", get(handlers::export_violations))
        .route("/export/records.csv", get(handlers::export_records))
        // API
        .route("/api/health", get(handlers::health))
        .route("/api/stats", get(handlers::api_stats))
        .route("/api/records", get(handlers::api_records))
        // Sessions
        .route("/login", get(login_page).post(login_handler))
        .route("/logout", post(logout_handler))
        .with_state(state)
        .layer(from_fn_with_state(auth, auth_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(from_fn(logging_middleware))
                .layer(from_fn(security_headers_middleware)),
        )
}

/// Web server instance
pub struct WebServer {
    config: WebConfig,
    state: AppState,
}

impl WebServer {
    /// Create a new web server
    pub fn new(config: WebConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sweeper = tokio::spawn(sweep_sessions(self.state.clone()));

        let app = create_app(self.state);
        let listener = tokio::net::TcpListener::bind(self.config.addr()).await?;
        info!("Web dashboard listening on http://{}", listener.local_addr()?);

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        sweeper.abort();
        served?;
        info!("Web dashboard stopped");
        Ok(())
    }
}

async fn sweep_sessions(state: AppState) {
    let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        match state.auth.session_store.cleanup_expired() {
            Ok(0) => {}
            Ok(removed) => debug!("Removed {} expired sessions", removed),
            Err(e) => warn!("Session cleanup failed: {}", e),
        }
    }
}
