//! Short-lived query result cache
//!
//! Wraps a [`RecordStore`] and memoizes identical count and find queries for
//! a few tens of seconds. Errors are never cached, and a miss always falls
//! through to the wrapped store, so results match an uncached query.

use crate::{repositories::RecordStore, Result};
use async_trait::async_trait;
use moka::future::Cache;
use scope_core::{DetectionRecord, RecordPredicate};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing::{debug, info};

/// Cache settings
#[derive(Debug, Clone)]
pub struct QueryCacheConfig {
    /// TTL of count queries (statistics)
    pub count_ttl: Duration,
    /// TTL of find queries (record tables)
    pub find_ttl: Duration,
    pub max_entries: u64,
}

impl Default for QueryCacheConfig {
    fn default() -> Self {
        Self {
            count_ttl: Duration::from_secs(60),
            find_ttl: Duration::from_secs(30),
            max_entries: 1_000,
        }
    }
}

/// Hit and miss counters
#[derive(Debug, Default)]
pub struct CacheMetrics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
}

impl CacheMetrics {
    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn miss_count(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hit_count();
        let total = hits + self.miss_count();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Record store decorator with TTL caching
pub struct CachedRecordStore {
    inner: Arc<dyn RecordStore>,
    counts: Cache<RecordPredicate, u64>,
    finds: Cache<(RecordPredicate, usize), Arc<Vec<DetectionRecord>>>,
    metrics: Arc<CacheMetrics>,
}

impl CachedRecordStore {
    pub fn new(inner: Arc<dyn RecordStore>, config: &QueryCacheConfig) -> Self {
        let counts = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.count_ttl)
            .build();
        let finds = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.find_ttl)
            .build();

        Self {
            inner,
            counts,
            finds,
            metrics: Arc::new(CacheMetrics::default()),
        }
    }

    /// Drop every cached result
    pub async fn invalidate_all(&self) {
        self.counts.invalidate_all();
        self.finds.invalidate_all();
        self.counts.run_pending_tasks().await;
        self.finds.run_pending_tasks().await;
        info!("Cleared query cache");
    }

    pub fn metrics(&self) -> Arc<CacheMetrics> {
        self.metrics.clone()
    }

    fn hit(&self, what: &str) {
        self.metrics.hits.fetch_add(1, Ordering::Relaxed);
        debug!("Query cache hit: {}", what);
    }

    fn miss(&self) {
        self.metrics.misses.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl RecordStore for CachedRecordStore {
    async fn count_where(&self, predicate: &RecordPredicate) -> Result<u64> {
        if let Some(count) = self.counts.get(predicate).await {
            self.hit("count");
            return Ok(count);
        }
        self.miss();

        let count = self.inner.count_where(predicate).await?;
        self.counts.insert(predicate.clone(), count).await;
        Ok(count)
    }

    async fn find_where(&self, predicate: &RecordPredicate, limit: usize) -> Result<Vec<DetectionRecord>> {
        let key = (predicate.clone(), limit);
        if let Some(records) = self.finds.get(&key).await {
            self.hit("find");
            return Ok(records.as_ref().clone());
        }
        self.miss();

        let records = self.inner.find_where(predicate, limit).await?;
        self.finds.insert(key, Arc::new(records.clone())).await;
        Ok(records)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<DetectionRecord>> {
        self.inner.find_by_id(id).await
    }

    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }
}
