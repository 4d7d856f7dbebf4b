//! Filter evaluation
//!
//! Turns the operator's status and date choices into a [`RecordPredicate`]
//! that the record store executes. Evaluation never runs a query and never
//! orders anything; ordering is the normalizer's job.

use crate::{record::ComplianceStatus, time::day_bounds, DetectionRecord, Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Status filter offered to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Compliant,
    Violation,
}

impl StatusFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Compliant => "compliant",
            StatusFilter::Violation => "violation",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Compliant => "Compliant (helmet worn)",
            StatusFilter::Violation => "Violation (no helmet)",
        }
    }

    /// Semantic state this filter selects, `None` for `All`
    pub fn status(self) -> Option<ComplianceStatus> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Compliant => Some(ComplianceStatus::Compliant),
            StatusFilter::Violation => Some(ComplianceStatus::Violation),
        }
    }

    pub fn all_variants() -> [StatusFilter; 3] {
        [StatusFilter::All, StatusFilter::Compliant, StatusFilter::Violation]
    }
}

impl FromStr for StatusFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(StatusFilter::All),
            "compliant" => Ok(StatusFilter::Compliant),
            "violation" => Ok(StatusFilter::Violation),
            other => Err(Error::validation(format!("unknown status filter '{}'", other))),
        }
    }
}

/// Half-open UTC time range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    /// First instant after the range
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// The whole calendar day `date` in `offset`
    pub fn day(date: NaiveDate, offset: FixedOffset) -> Self {
        let (start, end) = day_bounds(date, offset);
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// Conjunction of store-level constraints.
///
/// An empty predicate matches every record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RecordPredicate {
    /// Stored label must be one of these
    pub status_in: Option<Vec<String>>,
    pub processed: Option<bool>,
    pub uploaded_between: Option<TimeRange>,
}

impl RecordPredicate {
    /// Predicate matching every record
    pub fn all() -> Self {
        Self::default()
    }

    /// Constrain to the labels of `status`, both schema generations
    pub fn with_status(mut self, status: ComplianceStatus) -> Self {
        self.status_in = Some(status.store_labels().iter().map(|l| l.to_string()).collect());
        self
    }

    pub fn with_processed(mut self, processed: bool) -> Self {
        self.processed = Some(processed);
        self
    }

    pub fn with_uploaded_between(mut self, range: TimeRange) -> Self {
        self.uploaded_between = Some(range);
        self
    }

    pub fn is_unconstrained(&self) -> bool {
        self.status_in.is_none() && self.processed.is_none() && self.uploaded_between.is_none()
    }

    /// Predicate semantics applied to one record.
    ///
    /// A record without `uploaded_at` never satisfies a date range.
    pub fn matches(&self, record: &DetectionRecord) -> bool {
        if let Some(labels) = &self.status_in {
            match record.compliance_status.as_deref() {
                Some(label) if labels.iter().any(|l| l == label) => {}
                _ => return false,
            }
        }
        if let Some(processed) = self.processed {
            if record.processed != processed {
                return false;
            }
        }
        if let Some(range) = &self.uploaded_between {
            match record.uploaded_at {
                Some(at) if range.contains(at) => {}
                _ => return false,
            }
        }
        true
    }
}

/// Operator filter selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RecordFilter {
    pub status: StatusFilter,
    pub date: Option<NaiveDate>,
}

impl RecordFilter {
    pub fn new(status: StatusFilter, date: Option<NaiveDate>) -> Self {
        Self { status, date }
    }

    /// Translate the selection into store constraints, with calendar dates
    /// interpreted in `offset`.
    pub fn to_predicate(&self, offset: FixedOffset) -> RecordPredicate {
        let mut predicate = RecordPredicate::all();
        if let Some(status) = self.status.status() {
            predicate = predicate.with_status(status);
        }
        if let Some(date) = self.date {
            predicate = predicate.with_uploaded_between(TimeRange::day(date, offset));
        }
        predicate
    }
}

/// Parse an optional `YYYY-MM-DD` date from a form field; blank means none
pub fn parse_date_field(value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| Error::validation(format!("invalid date '{}', expected YYYY-MM-DD", v))),
    }
}
