//! Violation trends over detection time
//!
//! Daily and hourly violation counts for the analytics page. Only records
//! with a recognized violation label and a `processed_at` timestamp are
//! bucketed; undated violations are counted separately.

use crate::{record::ComplianceStatus, time::to_local, DetectionRecord};
use chrono::{FixedOffset, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyCount {
    pub hour: u32,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViolationTrend {
    /// One entry per local date that has violations, ascending
    pub daily: Vec<DailyCount>,
    /// Always 24 entries, hour 0 through 23
    pub hourly: Vec<HourlyCount>,
    /// Violations that carry no `processed_at`
    pub undated: u64,
}

impl ViolationTrend {
    pub fn from_records(records: &[DetectionRecord], offset: FixedOffset) -> Self {
        let mut daily: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        let mut hourly = [0u64; 24];
        let mut undated = 0;

        let violations = records
            .iter()
            .filter(|r| r.recognized_status() == Some(ComplianceStatus::Violation));

        for record in violations {
            match record.processed_at {
                Some(at) => {
                    let local = to_local(at, offset);
                    *daily.entry(local.date_naive()).or_default() += 1;
                    hourly[local.hour() as usize] += 1;
                }
                None => undated += 1,
            }
        }

        Self {
            daily: daily
                .into_iter()
                .map(|(date, count)| DailyCount { date, count })
                .collect(),
            hourly: hourly
                .iter()
                .enumerate()
                .map(|(hour, &count)| HourlyCount {
                    hour: hour as u32,
                    count,
                })
                .collect(),
            undated,
        }
    }

    /// Whether any violation could be placed in time
    pub fn has_timestamps(&self) -> bool {
        !self.daily.is_empty()
    }

    pub fn dated_total(&self) -> u64 {
        self.daily.iter().map(|d| d.count).sum()
    }

    pub fn peak_daily(&self) -> u64 {
        self.daily.iter().map(|d| d.count).max().unwrap_or(0)
    }

    pub fn peak_hourly(&self) -> u64 {
        self.hourly.iter().map(|h| h.count).max().unwrap_or(0)
    }
}
