//! Dashboard queries
//!
//! Combines the record store with the core aggregation and normalization
//! so each page section is one call. Sorting always happens here, after the
//! fetch, never in the store.

use crate::{repositories::RecordStore, Result};
use chrono::FixedOffset;
use scope_core::{
    AggregateStats, ComplianceStatus, DetectionRecord, DisplayRecord, Normalizer, RecordDetail,
    RecordFilter, RecordPredicate, ViolationRow, ViolationTrend,
};
use std::sync::Arc;
use tracing::debug;

/// Violation table plus the number of violations it was drawn from
#[derive(Debug, Clone)]
pub struct ViolationReport {
    pub rows: Vec<ViolationRow>,
    pub total: u64,
}

/// Service answering every dashboard query
pub struct DashboardService {
    store: Arc<dyn RecordStore>,
    normalizer: Normalizer,
}

impl DashboardService {
    /// Create a new dashboard service
    pub fn new(store: Arc<dyn RecordStore>, offset: FixedOffset) -> Self {
        Self {
            store,
            normalizer: Normalizer::new(offset),
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Statistics from four count queries
    pub async fn aggregate_stats(&self) -> Result<AggregateStats> {
        let processed = RecordPredicate::all().with_processed(true);

        let total = self.store.count_where(&RecordPredicate::all()).await?;
        let processed_count = self.store.count_where(&processed).await?;
        let compliant = self
            .store
            .count_where(&processed.clone().with_status(ComplianceStatus::Compliant))
            .await?;
        let violation = self
            .store
            .count_where(&processed.with_status(ComplianceStatus::Violation))
            .await?;

        let stats = AggregateStats::from_counts(total, processed_count, compliant, violation);
        debug!(?stats, "Aggregated statistics");
        Ok(stats)
    }

    /// The `limit` most recently uploaded records
    pub async fn recent_records(&self, limit: usize) -> Result<Vec<DisplayRecord>> {
        let records = self.store.find_all_where(&RecordPredicate::all()).await?;
        Ok(self.normalizer.most_recent(records, limit))
    }

    /// Records matching the operator's filter, newest first
    pub async fn browse(&self, filter: &RecordFilter, limit: usize) -> Result<Vec<DisplayRecord>> {
        let predicate = filter.to_predicate(self.normalizer.offset());
        let records = self.store.find_all_where(&predicate).await?;
        debug!("Browsing {} of {} records for {:?}", limit.min(records.len()), records.len(), filter);
        Ok(self.normalizer.most_recent(records, limit))
    }

    /// Most recently detected violations
    pub async fn recent_violations(&self, limit: usize) -> Result<ViolationReport> {
        let records = self.violation_records().await?;
        let total = self
            .store
            .count_where(&RecordPredicate::all().with_status(ComplianceStatus::Violation))
            .await?;
        Ok(ViolationReport {
            rows: self.normalizer.violation_rows(records, limit),
            total,
        })
    }

    /// Daily and hourly violation counts
    pub async fn violation_trend(&self) -> Result<ViolationTrend> {
        let records = self.violation_records().await?;
        Ok(ViolationTrend::from_records(&records, self.normalizer.offset()))
    }

    /// Raw record plus its detail panel view
    pub async fn record_detail(&self, id: &str) -> Result<Option<(DetectionRecord, RecordDetail)>> {
        let record = self.store.find_by_id(id).await?;
        Ok(record.map(|r| {
            let detail = self.normalizer.detail(&r);
            (r, detail)
        }))
    }

    pub async fn find_record(&self, id: &str) -> Result<Option<DetectionRecord>> {
        self.store.find_by_id(id).await
    }

    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    async fn violation_records(&self) -> Result<Vec<DetectionRecord>> {
        let predicate = RecordPredicate::all().with_status(ComplianceStatus::Violation);
        self.store.find_all_where(&predicate).await
    }
}
