//! Main server implementation

use crate::{config::Config, Result};
use scope_storage::StorageManager;
use scope_web::{
    auth::{demo_users, AuthService},
    AppState, WebServer,
};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

/// bcrypt cost for demo accounts hashed at startup
const DEMO_HASH_COST: u32 = 10;

/// Owns the storage layer and the web interface for one process
pub struct Server {
    config: Config,
    storage: Arc<StorageManager>,
    web: WebServer,
}

impl Server {
    /// Connect storage and assemble the web interface
    pub async fn new(config: Config) -> Result<Self> {
        info!("Initializing server components");

        let storage = Arc::new(
            StorageManager::new(&config.storage_database(), &config.object_store, &config.cache()).await?,
        );

        let users = if config.auth.users.is_empty() {
            demo_users(DEMO_HASH_COST)?
        } else {
            info!("Loaded {} configured users", config.auth.users.len());
            config.auth.users.clone()
        };
        let auth = AuthService::new(users, config.session_ttl());

        let state = AppState::new(storage.clone(), auth, config.dashboard_settings()?);
        let web = WebServer::new(config.web(), state);

        Ok(Self { config, storage, web })
    }

    /// Serve until a shutdown signal arrives
    pub async fn run(self) -> Result<()> {
        info!("Starting SCOPE dashboard on http://{}", self.config.server_addr());

        let result = self.web.run(shutdown_signal()).await;

        info!("Shutting down server...");
        self.storage.close().await;
        result?;

        info!("Server shutdown complete");
        Ok(())
    }
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
