//! CSV export of display tables
//!
//! Exports reproduce the column names shown on screen. Files are named
//! `<purpose>_<YYYYMMDD_HHMMSS>.csv`.

use crate::{
    normalize::{DisplayRecord, ViolationRow},
    record::ComplianceStatus,
    Error, Result,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Header row of a record table export
pub const RECORD_COLUMNS: [&str; 6] = ["No", "Date", "Time", "File Name", "Confidence", "Status"];

/// Header row of a violations table export
pub const VIOLATION_COLUMNS: [&str; 5] = ["No", "File Name", "Image URL", "Confidence", "Detected At"];

/// What a CSV export contains; the filename prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPurpose {
    RecentRecords,
    Violations,
    Records,
}

impl ExportPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportPurpose::RecentRecords => "recent_records",
            ExportPurpose::Violations => "violations",
            ExportPurpose::Records => "records",
        }
    }
}

/// `records_20251113_171531.csv`
pub fn export_filename(purpose: ExportPurpose, at: DateTime<FixedOffset>) -> String {
    format!("{}_{}.csv", purpose.as_str(), at.format("%Y%m%d_%H%M%S"))
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordRow {
    #[serde(rename = "No")]
    index: usize,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Time")]
    time: String,
    #[serde(rename = "File Name")]
    filename: String,
    #[serde(rename = "Confidence")]
    confidence: String,
    #[serde(rename = "Status")]
    status: String,
}

#[derive(Debug, Serialize)]
struct ViolationCsvRow<'a> {
    #[serde(rename = "No")]
    index: usize,
    #[serde(rename = "File Name")]
    filename: &'a str,
    #[serde(rename = "Image URL")]
    image_url: &'a str,
    #[serde(rename = "Confidence")]
    confidence: &'a str,
    #[serde(rename = "Detected At")]
    detected_at: &'a str,
}

/// Render a record table as UTF-8 CSV with a header row
pub fn records_to_csv(records: &[DisplayRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if records.is_empty() {
        writer.write_record(RECORD_COLUMNS)?;
    }
    for record in records {
        writer.serialize(RecordRow {
            index: record.index,
            date: record.date.clone(),
            time: record.time.clone(),
            filename: record.filename.clone(),
            confidence: record.confidence.clone(),
            status: record.status_label().to_string(),
        })?;
    }
    finish(writer)
}

/// Render the recent-violations table as UTF-8 CSV with a header row
pub fn violations_to_csv(rows: &[ViolationRow]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if rows.is_empty() {
        writer.write_record(VIOLATION_COLUMNS)?;
    }
    for row in rows {
        writer.serialize(ViolationCsvRow {
            index: row.index,
            filename: &row.filename,
            image_url: &row.image_url,
            confidence: &row.confidence,
            detected_at: &row.detected_at,
        })?;
    }
    finish(writer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| Error::Io(e.error().to_string()))
}

/// Compliant and violation counts of a re-imported record export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounts {
    pub compliant: u64,
    pub violation: u64,
}

impl StatusCounts {
    pub fn of(records: &[DisplayRecord]) -> Self {
        let mut counts = Self::default();
        for record in records {
            counts.add(record.status);
        }
        counts
    }

    fn add(&mut self, status: ComplianceStatus) {
        match status {
            ComplianceStatus::Compliant => self.compliant += 1,
            ComplianceStatus::Violation => self.violation += 1,
        }
    }
}

/// Parse a record export and count its status column
pub fn status_counts_from_csv(bytes: &[u8]) -> Result<StatusCounts> {
    let mut reader = csv::Reader::from_reader(bytes);
    let mut counts = StatusCounts::default();
    for row in reader.deserialize::<RecordRow>() {
        let row = row?;
        let status = ComplianceStatus::from_display_label(&row.status).ok_or_else(|| {
            Error::validation(format!("unknown status '{}' in row {}", row.status, row.index))
        })?;
        counts.add(status);
    }
    Ok(counts)
}
