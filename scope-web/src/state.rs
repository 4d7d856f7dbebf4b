//! Shared application state

use crate::auth::AuthService;
use chrono::{DateTime, FixedOffset, Utc};
use scope_core::{time::utc_offset, ComplianceThresholds};
use scope_storage::{DashboardService, StorageManager};
use std::sync::Arc;

/// Presentation settings of the dashboard
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub product_name: String,
    /// Shown in the analytics footer
    pub data_source: String,
    pub recent_limit: usize,
    pub violations_limit: usize,
    pub browse_limit: usize,
    pub utc_offset: FixedOffset,
    pub thresholds: ComplianceThresholds,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            product_name: "SCOPE".to_string(),
            data_source: "Detection record store".to_string(),
            recent_limit: 10,
            violations_limit: 100,
            browse_limit: 500,
            utc_offset: utc_offset(),
            thresholds: ComplianceThresholds::default(),
        }
    }
}

impl DashboardSettings {
    /// Current time in the display offset
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.utc_offset)
    }
}

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<StorageManager>,
    pub dashboard: Arc<DashboardService>,
    pub auth: Arc<AuthService>,
    pub settings: Arc<DashboardSettings>,
}

impl AppState {
    pub fn new(storage: Arc<StorageManager>, auth: AuthService, settings: DashboardSettings) -> Self {
        let dashboard = storage.dashboard(settings.utc_offset);
        Self {
            storage,
            dashboard: Arc::new(dashboard),
            auth: Arc::new(auth),
            settings: Arc::new(settings),
        }
    }
}
