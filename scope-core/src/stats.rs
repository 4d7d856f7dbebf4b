//! Aggregate compliance statistics
//!
//! Statistics can be computed from an in-memory record set or from four
//! count queries against the store; both paths go through
//! [`AggregateStats::from_counts`] so the rate arithmetic exists once.

use crate::{record::ComplianceStatus, DetectionRecord, Error, Result};
use serde::{Deserialize, Serialize};

/// Derived, non-persisted compliance summary
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total: u64,
    pub processed: u64,
    pub compliant_count: u64,
    pub violation_count: u64,
    pub compliance_rate_percent: f64,
    pub violation_rate_percent: f64,
}

impl AggregateStats {
    /// Build stats from raw counts. Rates are 0 when nothing is processed.
    pub fn from_counts(total: u64, processed: u64, compliant_count: u64, violation_count: u64) -> Self {
        Self {
            total,
            processed,
            compliant_count,
            violation_count,
            compliance_rate_percent: rate(compliant_count, processed),
            violation_rate_percent: rate(violation_count, processed),
        }
    }

    /// Aggregate a record set.
    ///
    /// Only processed records with a recognized label count toward the
    /// compliant and violation totals.
    pub fn from_records(records: &[DetectionRecord]) -> Self {
        let mut processed = 0;
        let mut compliant = 0;
        let mut violation = 0;

        for record in records.iter().filter(|r| r.processed) {
            processed += 1;
            match record.recognized_status() {
                Some(ComplianceStatus::Compliant) => compliant += 1,
                Some(ComplianceStatus::Violation) => violation += 1,
                None => {}
            }
        }

        Self::from_counts(records.len() as u64, processed, compliant, violation)
    }

    /// Compliance level for the gauge
    pub fn level(&self, thresholds: &ComplianceThresholds) -> ComplianceLevel {
        thresholds.level_for(self.compliance_rate_percent)
    }

    /// Whether any processed record exists to chart
    pub fn has_processed(&self) -> bool {
        self.processed > 0
    }
}

fn rate(count: u64, processed: u64) -> f64 {
    if processed == 0 {
        0.0
    } else {
        count as f64 / processed as f64 * 100.0
    }
}

/// Gauge bands for the compliance rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplianceThresholds {
    /// Rate at or above which compliance is excellent; also the gauge target line
    pub target_percent: f64,
    /// Rate at or above which compliance is fair
    pub fair_percent: f64,
}

impl ComplianceThresholds {
    /// Create validated thresholds
    pub fn new(target_percent: f64, fair_percent: f64) -> Result<Self> {
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if !in_range(target_percent) || !in_range(fair_percent) {
            return Err(Error::validation("compliance thresholds must be within 0..=100"));
        }
        if fair_percent >= target_percent {
            return Err(Error::validation(
                "fair threshold must be below the compliance target",
            ));
        }
        Ok(Self {
            target_percent,
            fair_percent,
        })
    }

    pub fn level_for(&self, rate_percent: f64) -> ComplianceLevel {
        if rate_percent >= self.target_percent {
            ComplianceLevel::Excellent
        } else if rate_percent >= self.fair_percent {
            ComplianceLevel::Fair
        } else {
            ComplianceLevel::NeedsAttention
        }
    }
}

impl Default for ComplianceThresholds {
    fn default() -> Self {
        Self {
            target_percent: 80.0,
            fair_percent: 60.0,
        }
    }
}

/// Qualitative band of the compliance rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceLevel {
    Excellent,
    Fair,
    NeedsAttention,
}

impl ComplianceLevel {
    pub fn label(self) -> &'static str {
        match self {
            ComplianceLevel::Excellent => "Excellent",
            ComplianceLevel::Fair => "Fair",
            ComplianceLevel::NeedsAttention => "Needs attention",
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            ComplianceLevel::Excellent => "level-excellent",
            ComplianceLevel::Fair => "level-fair",
            ComplianceLevel::NeedsAttention => "level-attention",
        }
    }
}

/// `1234567` -> `1,234,567`
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `50.0` -> `50.0%`
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processed(label: &str) -> DetectionRecord {
        DetectionRecord::builder(label)
            .compliance_status(label)
            .processed(true)
            .build()
    }

    #[test]
    fn test_mixed_generations() {
        let records = vec![
            processed("helmet"),
            processed("no_helmet"),
            processed("violation"),
            processed("compliant"),
        ];

        let stats = AggregateStats::from_records(&records);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.processed, 4);
        assert_eq!(stats.compliant_count, 2);
        assert_eq!(stats.violation_count, 2);
        assert_eq!(stats.compliance_rate_percent, 50.0);
        assert_eq!(stats.violation_rate_percent, 50.0);
    }

    #[test]
    fn test_empty_set() {
        let stats = AggregateStats::from_records(&[]);
        assert_eq!(stats, AggregateStats::default());
        assert_eq!(stats.compliance_rate_percent, 0.0);
        assert_eq!(stats.violation_rate_percent, 0.0);
        assert!(!stats.has_processed());
    }

    #[test]
    fn test_unprocessed_and_unknown_labels() {
        let records = vec![
            DetectionRecord::builder("a").compliance_status("helmet").build(),
            DetectionRecord::builder("b").processed(true).build(),
            processed("weird"),
            processed("helmet"),
        ];

        let stats = AggregateStats::from_records(&records);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.processed, 3);
        assert_eq!(stats.compliant_count, 1);
        assert_eq!(stats.violation_count, 0);
        assert!((stats.compliance_rate_percent - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_processed_rates_are_zero() {
        let stats = AggregateStats::from_counts(10, 0, 0, 0);
        assert_eq!(stats.compliance_rate_percent, 0.0);
        assert_eq!(stats.violation_rate_percent, 0.0);
    }

    #[test]
    fn test_levels() {
        let thresholds = ComplianceThresholds::default();
        assert_eq!(thresholds.level_for(80.0), ComplianceLevel::Excellent);
        assert_eq!(thresholds.level_for(79.9), ComplianceLevel::Fair);
        assert_eq!(thresholds.level_for(60.0), ComplianceLevel::Fair);
        assert_eq!(thresholds.level_for(12.5), ComplianceLevel::NeedsAttention);

        let stats = AggregateStats::from_counts(5, 4, 4, 0);
        assert_eq!(stats.level(&thresholds), ComplianceLevel::Excellent);
    }

    #[test]
    fn test_threshold_validation() {
        assert!(ComplianceThresholds::new(90.0, 70.0).is_ok());
        assert!(ComplianceThresholds::new(60.0, 80.0).is_err());
        assert!(ComplianceThresholds::new(120.0, 10.0).is_err());
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
        assert_eq!(format_percent(50.0), "50.0%");
        assert_eq!(format_percent(33.333), "33.3%");
    }
}
