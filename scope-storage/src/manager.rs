//! Storage manager owning the long-lived store handles

use crate::{
    cache::{CacheMetrics, CachedRecordStore, QueryCacheConfig},
    objects::{build_object_store, ObjectStore, ObjectStoreConfig},
    repositories::{RecordStore, SqliteRecordStore},
    services::DashboardService,
    Error, Result,
};
use chrono::FixedOffset;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::sync::Arc;
use tracing::info;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
    pub migrate_on_startup: bool,
}

/// Owns the record store pool, the query cache and the object store.
///
/// Built once per process; handlers share it through `Arc`.
pub struct StorageManager {
    pool: Option<Pool<Sqlite>>,
    records: Arc<CachedRecordStore>,
    objects: Arc<dyn ObjectStore>,
}

impl StorageManager {
    /// Connect to the database and build the configured object store
    pub async fn new(
        database: &DatabaseConfig,
        objects: &ObjectStoreConfig,
        cache: &QueryCacheConfig,
    ) -> Result<Self> {
        info!("Connecting to database: {}", database.url);

        let pool = SqlitePoolOptions::new()
            .max_connections(database.max_connections.unwrap_or(5))
            .connect(&database.url)
            .await?;

        info!("Database connection established");

        let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::new(pool.clone()));
        let manager = Self {
            pool: Some(pool),
            records: Arc::new(CachedRecordStore::new(store, cache)),
            objects: build_object_store(objects)?,
        };

        if database.migrate_on_startup {
            manager.migrate().await?;
        }
        Ok(manager)
    }

    /// Assemble a manager from existing stores, without a database pool
    pub fn from_parts(
        store: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStore>,
        cache: &QueryCacheConfig,
    ) -> Self {
        Self {
            pool: None,
            records: Arc::new(CachedRecordStore::new(store, cache)),
            objects,
        }
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };
        info!("Running database migrations");

        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(|e| Error::Migration(e.to_string()))?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Cached record store
    pub fn records(&self) -> Arc<dyn RecordStore> {
        self.records.clone()
    }

    /// Object store for images
    pub fn objects(&self) -> Arc<dyn ObjectStore> {
        self.objects.clone()
    }

    /// Dashboard service over the cached record store
    pub fn dashboard(&self, offset: FixedOffset) -> DashboardService {
        DashboardService::new(self.records(), offset)
    }

    /// Hit and miss counters of the query cache
    pub fn cache_metrics(&self) -> Arc<CacheMetrics> {
        self.records.metrics()
    }

    /// Forget cached query results
    pub async fn refresh(&self) {
        self.records.invalidate_all().await;
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<()> {
        self.records.ping().await
    }

    /// Close the pool on shutdown
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
            info!("Database pool closed");
        }
    }
}
