//! In-memory record store
//!
//! Applies [`RecordPredicate::matches`] over a fixed record set. Used for
//! demos and tests; it can be switched into a failing mode to exercise the
//! store-unavailable paths.

use super::record::RecordStore;
use crate::{Error, Result};
use async_trait::async_trait;
use scope_core::{DetectionRecord, RecordPredicate};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, RwLock,
};

/// Record store holding its records in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryRecordStore {
    records: Arc<RwLock<Vec<DetectionRecord>>>,
    unavailable: Arc<AtomicBool>,
    queries: Arc<AtomicU64>,
}

impl MemoryRecordStore {
    pub fn new(records: Vec<DetectionRecord>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
            ..Self::default()
        }
    }

    /// Replace the stored records
    pub fn replace(&self, records: Vec<DetectionRecord>) {
        if let Ok(mut guard) = self.records.write() {
            *guard = records;
        }
    }

    /// Make every subsequent query fail like a lost connection
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of queries served so far
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }

    fn snapshot(&self) -> Result<Vec<DetectionRecord>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::Database(sqlx::Error::PoolClosed));
        }
        self.records
            .read()
            .map(|records| records.clone())
            .map_err(|_| Error::Internal(anyhow::anyhow!("record store lock poisoned")))
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn count_where(&self, predicate: &RecordPredicate) -> Result<u64> {
        let records = self.snapshot()?;
        Ok(records.iter().filter(|r| predicate.matches(r)).count() as u64)
    }

    async fn find_where(&self, predicate: &RecordPredicate, limit: usize) -> Result<Vec<DetectionRecord>> {
        let records = self.snapshot()?;
        Ok(records
            .into_iter()
            .filter(|r| predicate.matches(r))
            .take(limit)
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<DetectionRecord>> {
        let records = self.snapshot()?;
        Ok(records.into_iter().find(|r| r.id == id))
    }

    async fn ping(&self) -> Result<()> {
        self.snapshot().map(|_| ())
    }
}
