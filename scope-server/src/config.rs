//! Configuration management for the server

use crate::{Error, Result};
use chrono::Duration;
use scope_core::{time::parse_utc_offset, ComplianceThresholds};
use scope_storage::{DatabaseConfig as StorageDatabaseConfig, ObjectStoreConfig, QueryCacheConfig};
use scope_web::{auth::UserCredentials, DashboardSettings, WebConfig};
use serde::Deserialize;

/// Prefix of environment overrides, e.g. `SCOPE__SERVER__PORT`
pub const ENV_PREFIX: &str = "SCOPE";

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub object_store: ObjectStoreConfig,
    pub dashboard: DashboardConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
    pub migrate_on_startup: bool,
}

/// Dashboard presentation and query limits
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    pub product_name: String,
    pub data_source: String,
    pub recent_limit: usize,
    pub violations_limit: usize,
    pub browse_limit: usize,
    pub stats_ttl_seconds: u64,
    pub records_ttl_seconds: u64,
    pub utc_offset: String,
    pub compliance_target_percent: f64,
    pub fair_threshold_percent: f64,
}

/// Login configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub session_ttl_hours: i64,
    #[serde(default)]
    pub users: Vec<UserCredentials>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load configuration from `config/default`, `config/local` and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, reading `path` instead of `config/local` when given
    pub fn load_from(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8501)?
            .set_default("database.url", "sqlite:./scope.db?mode=rwc")?
            .set_default("database.migrate_on_startup", true)?
            .set_default("object_store.kind", "local")?
            .set_default("object_store.local_root", "./data/images")?
            .set_default("object_store.timeout_seconds", 10)?
            .set_default("dashboard.product_name", "SCOPE")?
            .set_default("dashboard.data_source", "Detection record store")?
            .set_default("dashboard.recent_limit", 10)?
            .set_default("dashboard.violations_limit", 100)?
            .set_default("dashboard.browse_limit", 500)?
            .set_default("dashboard.stats_ttl_seconds", 60)?
            .set_default("dashboard.records_ttl_seconds", 30)?
            .set_default("dashboard.utc_offset", "+00:00")?
            .set_default("dashboard.compliance_target_percent", 80.0)?
            .set_default("dashboard.fair_threshold_percent", 60.0)?
            .set_default("auth.session_ttl_hours", 24)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(config::File::with_name("config/default").required(false));

        builder = match path {
            Some(path) => builder.add_source(config::File::with_name(path).required(true)),
            None => builder.add_source(config::File::with_name("config/local").required(false)),
        };

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Reject values the dashboard cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Configuration("server.port must be greater than 0".into()));
        }
        if self.database.url.trim().is_empty() {
            return Err(Error::Configuration("database.url must not be empty".into()));
        }

        let d = &self.dashboard;
        let limits = [
            ("recent_limit", d.recent_limit),
            ("violations_limit", d.violations_limit),
            ("browse_limit", d.browse_limit),
        ];
        if let Some((name, _)) = limits.iter().find(|(_, value)| *value == 0) {
            return Err(Error::Configuration(format!("dashboard.{} must be greater than 0", name)));
        }
        if self.auth.session_ttl_hours <= 0 {
            return Err(Error::Configuration("auth.session_ttl_hours must be greater than 0".into()));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(Error::Configuration(format!(
                "logging.format must be 'pretty' or 'json', got '{}'",
                self.logging.format
            )));
        }

        parse_utc_offset(&d.utc_offset)?;
        self.thresholds()?;
        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn thresholds(&self) -> Result<ComplianceThresholds> {
        Ok(ComplianceThresholds::new(
            self.dashboard.compliance_target_percent,
            self.dashboard.fair_threshold_percent,
        )?)
    }

    pub fn storage_database(&self) -> StorageDatabaseConfig {
        StorageDatabaseConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            migrate_on_startup: self.database.migrate_on_startup,
        }
    }

    pub fn cache(&self) -> QueryCacheConfig {
        QueryCacheConfig {
            count_ttl: std::time::Duration::from_secs(self.dashboard.stats_ttl_seconds),
            find_ttl: std::time::Duration::from_secs(self.dashboard.records_ttl_seconds),
            ..QueryCacheConfig::default()
        }
    }

    pub fn web(&self) -> WebConfig {
        WebConfig {
            host: self.server.host.clone(),
            port: self.server.port,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::hours(self.auth.session_ttl_hours)
    }

    pub fn dashboard_settings(&self) -> Result<DashboardSettings> {
        let d = &self.dashboard;
        Ok(DashboardSettings {
            product_name: d.product_name.clone(),
            data_source: d.data_source.clone(),
            recent_limit: d.recent_limit,
            violations_limit: d.violations_limit,
            browse_limit: d.browse_limit,
            utc_offset: parse_utc_offset(&d.utc_offset)?,
            thresholds: self.thresholds()?,
        })
    }
}
