//! Core domain models for the SCOPE helmet-compliance dashboard
//!
//! This crate holds everything that does not touch I/O: the detection record
//! model, the dual-schema status classification, statistics aggregation,
//! record normalization for display, filter evaluation, violation trends and
//! CSV export.

pub mod error;
pub mod export;
pub mod filter;
pub mod normalize;
pub mod record;
pub mod stats;
pub mod time;
pub mod trend;

pub use error::{Error, Result};
pub use filter::{RecordFilter, RecordPredicate, StatusFilter, TimeRange};
pub use normalize::{DisplayRecord, Normalizer, RecencyKey, RecordDetail, ViolationRow};
pub use record::{ComplianceStatus, DetectionRecord, ObjectLocation};
pub use stats::{AggregateStats, ComplianceLevel, ComplianceThresholds};
pub use trend::ViolationTrend;
