//! Store gateways for the SCOPE compliance dashboard
//!
//! This crate provides the read-only record store (SQLite via sqlx), the
//! object store for detection images, a short-lived query cache and the
//! dashboard service that combines them with the core domain logic.

pub mod cache;
pub mod error;
pub mod manager;
pub mod objects;
pub mod repositories;
pub mod services;

pub use cache::{CacheMetrics, CachedRecordStore, QueryCacheConfig};
pub use error::{Error, Result};
pub use manager::{DatabaseConfig, StorageManager};
pub use objects::{ObjectFetchError, ObjectStore, ObjectStoreConfig, ObjectStoreKind};
pub use repositories::{MemoryRecordStore, RecordStore, SqliteRecordStore};
pub use services::{DashboardService, ViolationReport};

/// Re-export core types for convenience
pub use scope_core as core;
