//! Detection record model and compliance classification
//!
//! Records come from an external detection pipeline and have been written by
//! two generations of that pipeline. The legacy generation labels a verdict
//! `helmet` / `no_helmet`, the current one `compliant` / `violation`. Both
//! spellings mean the same two states, and the mapping between them lives in
//! exactly one place: [`ComplianceStatus::recognize`].
//!
//! # Examples
//!
//! ```rust
//! use scope_core::record::*;
//!
//! let record = DetectionRecord::builder("65f1c0")
//!     .filename("photo_20251113_171531_427061.jpg")
//!     .compliance_status("helmet")
//!     .processed(true)
//!     .build();
//!
//! assert_eq!(record.status(), ComplianceStatus::Compliant);
//! ```

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Store labels that mean a helmet was observed, across both schema generations
pub const COMPLIANT_LABELS: [&str; 2] = ["helmet", "compliant"];

/// Store labels that mean no helmet was observed, across both schema generations
pub const VIOLATION_LABELS: [&str; 2] = ["no_helmet", "violation"];

/// Semantic verdict of a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    Violation,
}

impl ComplianceStatus {
    /// Map a stored label to its semantic state, if the label is one of the
    /// known spellings of either schema generation.
    pub fn recognize(label: &str) -> Option<Self> {
        if COMPLIANT_LABELS.contains(&label) {
            Some(ComplianceStatus::Compliant)
        } else if VIOLATION_LABELS.contains(&label) {
            Some(ComplianceStatus::Violation)
        } else {
            None
        }
    }

    /// Closed two-way classification used for display.
    ///
    /// Anything that is not explicitly compliant, including a missing or
    /// unrecognized label, is a violation.
    pub fn classify(label: Option<&str>) -> Self {
        match label.and_then(Self::recognize) {
            Some(status) => status,
            None => {
                // Unknown labels fall back to Violation; logged so data-quality
                // problems stay visible.
                if let Some(label) = label {
                    debug!(label, "unrecognized compliance label classified as violation");
                }
                ComplianceStatus::Violation
            }
        }
    }

    /// Labels to match in the store for this state, both generations
    pub fn store_labels(self) -> &'static [&'static str] {
        match self {
            ComplianceStatus::Compliant => &COMPLIANT_LABELS,
            ComplianceStatus::Violation => &VIOLATION_LABELS,
        }
    }

    /// Human readable label used in tables and exports
    pub fn display_label(self) -> &'static str {
        match self {
            ComplianceStatus::Compliant => "Compliant",
            ComplianceStatus::Violation => "Violation",
        }
    }

    /// Inverse of [`display_label`](Self::display_label)
    pub fn from_display_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Compliant" => Some(ComplianceStatus::Compliant),
            "Violation" => Some(ComplianceStatus::Violation),
            _ => None,
        }
    }

    /// CSS class suffix for status badges
    pub fn css_class(self) -> &'static str {
        match self {
            ComplianceStatus::Compliant => "compliant",
            ComplianceStatus::Violation => "violation",
        }
    }
}

impl std::fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_label())
    }
}

/// One observation of a vehicle image submitted for helmet detection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionRecord {
    pub id: String,
    pub filename: Option<String>,
    pub image_location: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed: bool,
    /// Raw stored label, either schema generation, possibly unknown
    pub compliance_status: Option<String>,
    pub confidence: Option<f64>,
}

impl DetectionRecord {
    /// Create a builder for constructing a DetectionRecord
    pub fn builder<S: Into<String>>(id: S) -> DetectionRecordBuilder {
        DetectionRecordBuilder::new(id)
    }

    /// Display classification of this record
    pub fn status(&self) -> ComplianceStatus {
        ComplianceStatus::classify(self.compliance_status.as_deref())
    }

    /// Strict classification, `None` for missing or unknown labels
    pub fn recognized_status(&self) -> Option<ComplianceStatus> {
        self.compliance_status
            .as_deref()
            .and_then(ComplianceStatus::recognize)
    }

    /// Confidence if it is a usable measurement
    pub fn confidence(&self) -> Option<f64> {
        self.confidence.filter(|c| c.is_finite())
    }

    /// Parsed image location, if the record carries one
    pub fn object_location(&self) -> Option<Result<ObjectLocation>> {
        self.image_location.as_deref().map(ObjectLocation::parse)
    }
}

/// Builder for constructing DetectionRecord instances
#[derive(Debug, Clone)]
pub struct DetectionRecordBuilder {
    record: DetectionRecord,
}

impl DetectionRecordBuilder {
    /// Create a new record builder
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            record: DetectionRecord {
                id: id.into(),
                filename: None,
                image_location: None,
                uploaded_at: None,
                processed_at: None,
                processed: false,
                compliance_status: None,
                confidence: None,
            },
        }
    }

    pub fn filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.record.filename = Some(filename.into());
        self
    }

    pub fn image_location<S: Into<String>>(mut self, location: S) -> Self {
        self.record.image_location = Some(location.into());
        self
    }

    pub fn uploaded_at(mut self, at: DateTime<Utc>) -> Self {
        self.record.uploaded_at = Some(at);
        self
    }

    pub fn processed_at(mut self, at: DateTime<Utc>) -> Self {
        self.record.processed_at = Some(at);
        self
    }

    pub fn processed(mut self, processed: bool) -> Self {
        self.record.processed = processed;
        self
    }

    pub fn compliance_status<S: Into<String>>(mut self, label: S) -> Self {
        self.record.compliance_status = Some(label.into());
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.record.confidence = Some(confidence);
        self
    }

    /// Build the record
    pub fn build(self) -> DetectionRecord {
        self.record
    }
}

/// Container and object identifiers of an image in the object store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLocation {
    pub container: String,
    pub object: String,
}

impl ObjectLocation {
    /// Parse a location reference by taking the last two path segments.
    ///
    /// `https://account.blob.core.windows.net/photo/photo_1.jpg` yields
    /// container `photo` and object `photo_1.jpg`. Query strings and
    /// fragments are ignored.
    pub fn parse(reference: &str) -> Result<Self> {
        let invalid = || Error::InvalidLocation {
            reference: reference.to_string(),
        };

        let path = reference
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim()
            .trim_end_matches('/');

        let mut segments = path.rsplit('/');
        let object = segments.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
        let container = segments.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;

        // A bare "host/file" is not a container reference
        if container.contains(':') || path.ends_with(&format!("//{}/{}", container, object)) {
            return Err(invalid());
        }

        Ok(Self {
            container: container.to_string(),
            object: object.to_string(),
        })
    }

    /// File extension of the object, lowercased
    pub fn extension(&self) -> Option<String> {
        self.object
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }
}

impl std::fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.container, self.object)
    }
}
