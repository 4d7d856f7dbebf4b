//! Record normalization for display
//!
//! The record store cannot be trusted to return rows in any order, so every
//! view sorts client-side with [`sort_by_recency`] before numbering or
//! truncating. Every derived field has a fallback so one malformed record
//! never blocks the rest of the set.

use crate::{record::ComplianceStatus, time::to_local, DetectionRecord};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Marker for a value that is not available
pub const NOT_AVAILABLE: &str = "N/A";

/// Timestamp a view is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecencyKey {
    UploadedAt,
    ProcessedAt,
}

impl RecencyKey {
    fn of(self, record: &DetectionRecord) -> Option<DateTime<Utc>> {
        match self {
            RecencyKey::UploadedAt => record.uploaded_at,
            RecencyKey::ProcessedAt => record.processed_at,
        }
    }
}

/// Stable sort, most recent first. Records without the timestamp sort last.
pub fn sort_by_recency(records: &mut [DetectionRecord], key: RecencyKey) {
    // Option orders None below Some, so reversing puts missing timestamps last
    records.sort_by(|a, b| key.of(b).cmp(&key.of(a)));
}

/// Percentage with one decimal, or `N/A`
pub fn confidence_label(confidence: Option<f64>) -> String {
    match confidence.filter(|c| c.is_finite()) {
        Some(c) => format!("{:.1}%", c * 100.0),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Display-ready projection of a detection record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayRecord {
    /// 1-based position in the sorted view
    pub index: usize,
    pub record_id: String,
    pub date: String,
    pub time: String,
    pub filename: String,
    pub status: ComplianceStatus,
    pub confidence: String,
}

impl DisplayRecord {
    pub fn status_label(&self) -> &'static str {
        self.status.display_label()
    }
}

/// Row of the recent-violations table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationRow {
    pub index: usize,
    pub record_id: String,
    pub filename: String,
    pub image_url: String,
    /// Raw fraction rounded to three decimals
    pub confidence: String,
    pub detected_at: String,
}

/// Everything the detail panel shows about one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDetail {
    pub record_id: String,
    pub filename: String,
    pub status: ComplianceStatus,
    pub date_long: String,
    pub time: String,
    pub confidence: String,
    pub image_url: Option<String>,
}

/// Maps detection records into display shapes in one display offset
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    offset: FixedOffset,
}

impl Normalizer {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Sort by upload time and number every record
    pub fn normalize(&self, records: Vec<DetectionRecord>) -> Vec<DisplayRecord> {
        self.most_recent(records, usize::MAX)
    }

    /// The `limit` most recently uploaded records.
    ///
    /// The whole set is sorted before truncation.
    pub fn most_recent(&self, mut records: Vec<DetectionRecord>, limit: usize) -> Vec<DisplayRecord> {
        sort_by_recency(&mut records, RecencyKey::UploadedAt);
        records
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, record)| self.display(i + 1, record))
            .collect()
    }

    /// Violation rows ordered by detection time, truncated after sorting
    pub fn violation_rows(&self, mut records: Vec<DetectionRecord>, limit: usize) -> Vec<ViolationRow> {
        sort_by_recency(&mut records, RecencyKey::ProcessedAt);
        records
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, record)| ViolationRow {
                index: i + 1,
                record_id: record.id.clone(),
                filename: filename_or_na(record),
                image_url: record
                    .image_location
                    .clone()
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                confidence: record
                    .confidence()
                    .map(|c| format!("{:.3}", c))
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                detected_at: self.format_or_na(record.processed_at, "%Y-%m-%d %H:%M:%S"),
            })
            .collect()
    }

    /// Project one record at a given 1-based position
    pub fn display(&self, index: usize, record: &DetectionRecord) -> DisplayRecord {
        DisplayRecord {
            index,
            record_id: record.id.clone(),
            date: self.format_or_na(record.uploaded_at, "%Y-%m-%d"),
            time: self.format_or_na(record.uploaded_at, "%H:%M:%S"),
            filename: filename_or_na(record),
            status: record.status(),
            confidence: confidence_label(record.confidence),
        }
    }

    /// Detail panel view of one record
    pub fn detail(&self, record: &DetectionRecord) -> RecordDetail {
        RecordDetail {
            record_id: record.id.clone(),
            filename: filename_or_na(record),
            status: record.status(),
            date_long: self.format_or_na(record.uploaded_at, "%d %B %Y"),
            time: self.format_or_na(record.uploaded_at, "%H:%M:%S"),
            confidence: confidence_label(record.confidence),
            image_url: record.image_location.clone(),
        }
    }

    /// Format a timestamp in the display offset
    pub fn format(&self, at: DateTime<Utc>, pattern: &str) -> String {
        to_local(at, self.offset).format(pattern).to_string()
    }

    fn format_or_na(&self, at: Option<DateTime<Utc>>, pattern: &str) -> String {
        at.map(|at| self.format(at, pattern))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }
}

fn filename_or_na(record: &DetectionRecord) -> String {
    record
        .filename
        .clone()
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{parse_utc_offset, utc_offset};
    use chrono::TimeZone;

    fn uploaded(id: &str, day: u32) -> DetectionRecord {
        DetectionRecord::builder(id)
            .uploaded_at(Utc.with_ymd_and_hms(2024, 1, day, 8, 0, 0).unwrap())
            .build()
    }

    fn ids(records: &[DetectionRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_missing_timestamp_sorts_last() {
        let mut records = vec![
            DetectionRecord::builder("missing").build(),
            uploaded("jan3", 3),
            uploaded("jan1", 1),
            uploaded("jan2", 2),
        ];
        sort_by_recency(&mut records, RecencyKey::UploadedAt);
        assert_eq!(ids(&records), vec!["jan3", "jan2", "jan1", "missing"]);
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let mut records = vec![
            uploaded("a", 1),
            DetectionRecord::builder("none-1").build(),
            uploaded("b", 1),
            DetectionRecord::builder("none-2").build(),
            uploaded("c", 1),
        ];
        sort_by_recency(&mut records, RecencyKey::UploadedAt);
        assert_eq!(ids(&records), vec!["a", "b", "c", "none-1", "none-2"]);
    }

    #[test]
    fn test_sort_by_processed_at() {
        let at = |h| Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap();
        let mut records = vec![
            DetectionRecord::builder("early").processed_at(at(1)).uploaded_at(at(9)).build(),
            DetectionRecord::builder("late").processed_at(at(5)).uploaded_at(at(2)).build(),
        ];
        sort_by_recency(&mut records, RecencyKey::ProcessedAt);
        assert_eq!(ids(&records), vec!["late", "early"]);
    }

    #[test]
    fn test_most_recent_truncates_after_sort() {
        let records: Vec<_> = (1..=9).map(|d| uploaded(&format!("d{}", d), d)).collect();
        let normalizer = Normalizer::new(utc_offset());

        let top = normalizer.most_recent(records, 3);
        let top_ids: Vec<_> = top.iter().map(|r| r.record_id.as_str()).collect();
        assert_eq!(top_ids, vec!["d9", "d8", "d7"]);
        assert_eq!(top.iter().map(|r| r.index).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_display_fields() {
        let record = DetectionRecord::builder("r1")
            .filename("photo_1.jpg")
            .uploaded_at(Utc.with_ymd_and_hms(2025, 11, 13, 17, 15, 31).unwrap())
            .compliance_status("compliant")
            .confidence(0.8734)
            .build();

        let display = Normalizer::new(utc_offset()).display(1, &record);
        assert_eq!(display.date, "2025-11-13");
        assert_eq!(display.time, "17:15:31");
        assert_eq!(display.filename, "photo_1.jpg");
        assert_eq!(display.status_label(), "Compliant");
        assert_eq!(display.confidence, "87.3%");
    }

    #[test]
    fn test_display_fallbacks() {
        let record = DetectionRecord::builder("bare").compliance_status("???").build();
        let display = Normalizer::new(utc_offset()).display(4, &record);
        assert_eq!(display.index, 4);
        assert_eq!(display.date, NOT_AVAILABLE);
        assert_eq!(display.time, NOT_AVAILABLE);
        assert_eq!(display.filename, NOT_AVAILABLE);
        assert_eq!(display.confidence, NOT_AVAILABLE);
        assert_eq!(display.status, ComplianceStatus::Violation);
    }

    #[test]
    fn test_confidence_zero_is_a_measurement() {
        assert_eq!(confidence_label(Some(0.0)), "0.0%");
        assert_eq!(confidence_label(Some(1.0)), "100.0%");
        assert_eq!(confidence_label(None), NOT_AVAILABLE);
        assert_eq!(confidence_label(Some(f64::INFINITY)), NOT_AVAILABLE);
    }

    #[test]
    fn test_display_in_local_offset() {
        let record = DetectionRecord::builder("r")
            .uploaded_at(Utc.with_ymd_and_hms(2024, 1, 1, 20, 0, 0).unwrap())
            .build();
        let wib = Normalizer::new(parse_utc_offset("+07:00").unwrap());
        let display = wib.display(1, &record);
        assert_eq!(display.date, "2024-01-02");
        assert_eq!(display.time, "03:00:00");
    }

    #[test]
    fn test_violation_rows() {
        let at = |h| Utc.with_ymd_and_hms(2024, 3, 4, h, 5, 6).unwrap();
        let records = vec![
            DetectionRecord::builder("old")
                .compliance_status("no_helmet")
                .processed_at(at(1))
                .confidence(0.91234)
                .image_location("https://acct.blob.core.windows.net/photo/old.jpg")
                .build(),
            DetectionRecord::builder("undated").compliance_status("violation").build(),
            DetectionRecord::builder("new")
                .compliance_status("violation")
                .processed_at(at(9))
                .build(),
        ];

        let rows = Normalizer::new(utc_offset()).violation_rows(records, 10);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].record_id, "new");
        assert_eq!(rows[0].detected_at, "2024-03-04 09:05:06");
        assert_eq!(rows[0].confidence, NOT_AVAILABLE);
        assert_eq!(rows[1].confidence, "0.912");
        assert_eq!(rows[1].image_url, "https://acct.blob.core.windows.net/photo/old.jpg");
        assert_eq!(rows[2].record_id, "undated");
        assert_eq!(rows[2].detected_at, NOT_AVAILABLE);
        assert_eq!(rows[2].image_url, NOT_AVAILABLE);
    }

    #[test]
    fn test_detail() {
        let record = DetectionRecord::builder("65f1")
            .filename("photo.jpg")
            .uploaded_at(Utc.with_ymd_and_hms(2025, 11, 13, 17, 15, 31).unwrap())
            .compliance_status("helmet")
            .image_location("https://acct.blob.core.windows.net/photo/photo.jpg")
            .build();

        let detail = Normalizer::new(utc_offset()).detail(&record);
        assert_eq!(detail.date_long, "13 November 2025");
        assert_eq!(detail.time, "17:15:31");
        assert_eq!(detail.status, ComplianceStatus::Compliant);
        assert_eq!(detail.confidence, NOT_AVAILABLE);
        assert!(detail.image_url.is_some());
    }
}
