//! Detection record repository implementation

use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use scope_core::{DetectionRecord, RecordPredicate};
use sqlx::{FromRow, Pool, QueryBuilder, Sqlite};
use tracing::{debug, warn};

const SELECT_COLUMNS: &str = "SELECT id, filename, url, blob_url, uploaded_at, processed_at, \
     processed, helmet_status, confidence FROM image_metadata";

/// Read-only gateway to the detection record store.
///
/// `find_where` makes no ordering promise; callers sort client-side.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Number of records matching `predicate`
    async fn count_where(&self, predicate: &RecordPredicate) -> Result<u64>;

    /// Up to `limit` records matching `predicate`, in store order
    async fn find_where(&self, predicate: &RecordPredicate, limit: usize) -> Result<Vec<DetectionRecord>>;

    /// Every record matching `predicate`, in store order
    async fn find_all_where(&self, predicate: &RecordPredicate) -> Result<Vec<DetectionRecord>> {
        self.find_where(predicate, usize::MAX).await
    }

    /// Single record by store id
    async fn find_by_id(&self, id: &str) -> Result<Option<DetectionRecord>>;

    /// Cheap connectivity probe
    async fn ping(&self) -> Result<()>;
}

/// Raw row as stored; every column may be absent or malformed
#[derive(Debug, Clone, FromRow)]
pub struct RecordRow {
    pub id: String,
    pub filename: Option<String>,
    pub url: Option<String>,
    pub blob_url: Option<String>,
    pub uploaded_at: Option<String>,
    pub processed_at: Option<String>,
    pub processed: Option<bool>,
    pub helmet_status: Option<String>,
    pub confidence: Option<f64>,
}

impl RecordRow {
    /// Lenient conversion into the domain model.
    ///
    /// Unparseable timestamps become `None`; `url` wins over `blob_url`.
    pub fn into_record(self) -> DetectionRecord {
        let uploaded_at = parse_timestamp(&self.id, "uploaded_at", self.uploaded_at.as_deref());
        let processed_at = parse_timestamp(&self.id, "processed_at", self.processed_at.as_deref());
        let image_location = self
            .url
            .filter(|u| !u.trim().is_empty())
            .or(self.blob_url.filter(|u| !u.trim().is_empty()));

        DetectionRecord {
            id: self.id,
            filename: self.filename,
            image_location,
            uploaded_at,
            processed_at,
            processed: self.processed.unwrap_or(false),
            compliance_status: self.helmet_status,
            confidence: self.confidence,
        }
    }
}

/// Accepts RFC 3339 and naive `YYYY-MM-DD HH:MM:SS[.f]` (taken as UTC)
pub fn parse_timestamp(id: &str, field: &str, value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;

    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, pattern) {
            return Some(naive.and_utc());
        }
    }

    warn!(record_id = id, field, value, "Malformed timestamp, treating as absent");
    None
}

/// Append the `WHERE` clause for `predicate`
fn push_predicate(builder: &mut QueryBuilder<'_, Sqlite>, predicate: &RecordPredicate) {
    builder.push(" WHERE 1 = 1");

    if let Some(labels) = &predicate.status_in {
        if labels.is_empty() {
            builder.push(" AND 0 = 1");
        } else {
            builder.push(" AND helmet_status IN (");
            let mut separated = builder.separated(", ");
            for label in labels {
                separated.push_bind(label.clone());
            }
            separated.push_unseparated(")");
        }
    }

    if let Some(processed) = predicate.processed {
        builder.push(" AND processed = ").push_bind(processed);
    }

    // julianday() yields NULL for absent or unparseable values, which never match
    if let Some(range) = &predicate.uploaded_between {
        builder
            .push(" AND julianday(uploaded_at) >= julianday(")
            .push_bind(range.start.to_rfc3339())
            .push(") AND julianday(uploaded_at) < julianday(")
            .push_bind(range.end.to_rfc3339())
            .push(")");
    }
}

/// Repository for detection records backed by SQLite
pub struct SqliteRecordStore {
    pool: Pool<Sqlite>,
}

impl SqliteRecordStore {
    /// Create a new record repository
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn count_where(&self, predicate: &RecordPredicate) -> Result<u64> {
        debug!(?predicate, "Counting records");

        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM image_metadata");
        push_predicate(&mut builder, predicate);

        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(count.max(0) as u64)
    }

    async fn find_where(&self, predicate: &RecordPredicate, limit: usize) -> Result<Vec<DetectionRecord>> {
        debug!(?predicate, limit, "Finding records");

        let mut builder = QueryBuilder::new(SELECT_COLUMNS);
        push_predicate(&mut builder, predicate);
        builder
            .push(" LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));

        let rows: Vec<RecordRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        debug!("Found {} records", rows.len());
        Ok(rows.into_iter().map(RecordRow::into_record).collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<DetectionRecord>> {
        debug!("Finding record by ID: {}", id);

        let row: Option<RecordRow> = sqlx::query_as(&format!("{} WHERE id = ?1", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(RecordRow::into_record))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    include!("record_tests.rs");
}
