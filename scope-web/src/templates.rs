//! Askama templates for the web interface
//!
//! View models carry preformatted strings so the templates stay free of
//! arithmetic. Each page section is an `Option` plus a notice; a failed
//! section renders its notice while the rest of the page renders normally.

use askama::Template;
use scope_core::{
    stats::{format_count, format_percent},
    trend::ViolationTrend,
    AggregateStats, ComplianceStatus, ComplianceThresholds, DisplayRecord, RecordDetail,
    StatusFilter, ViolationRow,
};

/// Page frame shared by every authenticated page
#[derive(Debug, Clone)]
pub struct Chrome {
    pub product_name: String,
    pub username: String,
    pub current_page: String,
}

impl Chrome {
    pub fn new(product_name: &str, username: &str, current_page: &str) -> Self {
        Self {
            product_name: product_name.to_string(),
            username: username.to_string(),
            current_page: current_page.to_string(),
        }
    }
}

/// Metric tiles, distribution and gauge
#[derive(Debug, Clone)]
pub struct StatsView {
    pub total: String,
    pub processed: String,
    pub compliant: String,
    pub violation: String,
    pub compliance_rate: String,
    pub violation_rate: String,
    /// Bar widths in percent, one decimal
    pub compliance_width: String,
    pub violation_width: String,
    pub target: String,
    pub target_position: String,
    pub level_label: String,
    pub level_class: String,
    pub has_processed: bool,
}

impl StatsView {
    pub fn new(stats: &AggregateStats, thresholds: &ComplianceThresholds) -> Self {
        let level = stats.level(thresholds);
        Self {
            total: format_count(stats.total),
            processed: format_count(stats.processed),
            compliant: format_count(stats.compliant_count),
            violation: format_count(stats.violation_count),
            compliance_rate: format_percent(stats.compliance_rate_percent),
            violation_rate: format_percent(stats.violation_rate_percent),
            compliance_width: width(stats.compliance_rate_percent),
            violation_width: width(stats.violation_rate_percent),
            target: format!("{:.0}%", thresholds.target_percent),
            target_position: width(thresholds.target_percent),
            level_label: level.label().to_string(),
            level_class: level.css_class().to_string(),
            has_processed: stats.has_processed(),
        }
    }
}

fn width(percent: f64) -> String {
    format!("{:.1}", percent.clamp(0.0, 100.0))
}

/// One labelled bar of a chart
#[derive(Debug, Clone)]
pub struct BarView {
    pub label: String,
    pub count: u64,
    pub width: String,
}

/// Daily and hourly violation charts
#[derive(Debug, Clone)]
pub struct TrendView {
    pub daily: Vec<BarView>,
    pub hourly: Vec<BarView>,
    pub undated: u64,
    pub has_timestamps: bool,
}

impl TrendView {
    pub fn new(trend: &ViolationTrend) -> Self {
        let scale = |count: u64, peak: u64| {
            if peak == 0 {
                "0.0".to_string()
            } else {
                width(count as f64 / peak as f64 * 100.0)
            }
        };
        let peak_daily = trend.peak_daily();
        let peak_hourly = trend.peak_hourly();

        Self {
            daily: trend
                .daily
                .iter()
                .map(|d| BarView {
                    label: d.date.format("%Y-%m-%d").to_string(),
                    count: d.count,
                    width: scale(d.count, peak_daily),
                })
                .collect(),
            hourly: trend
                .hourly
                .iter()
                .map(|h| BarView {
                    label: format!("{:02}:00", h.hour),
                    count: h.count,
                    width: scale(h.count, peak_hourly),
                })
                .collect(),
            undated: trend.undated,
            has_timestamps: trend.has_timestamps(),
        }
    }
}

/// Recent violations table
#[derive(Debug, Clone)]
pub struct ViolationsView {
    pub rows: Vec<ViolationRow>,
    pub total: String,
}

/// Option of the status filter select
#[derive(Debug, Clone)]
pub struct StatusOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

impl StatusOption {
    pub fn all(current: StatusFilter) -> Vec<Self> {
        StatusFilter::all_variants()
            .into_iter()
            .map(|f| Self {
                value: f.as_str(),
                label: f.label(),
                selected: f == current,
            })
            .collect()
    }
}

/// Detail panel of the selected record
#[derive(Debug, Clone)]
pub struct DetailView {
    pub detail: RecordDetail,
    pub image_src: Option<String>,
}

impl DetailView {
    pub fn new(detail: RecordDetail) -> Self {
        let image_src = detail
            .image_url
            .as_ref()
            .map(|_| format!("/records/{}/image", detail.record_id));
        Self { detail, image_src }
    }

    pub fn status_label(&self) -> &'static str {
        self.detail.status.display_label()
    }

    pub fn status_class(&self) -> &'static str {
        self.detail.status.css_class()
    }

    pub fn is_compliant(&self) -> bool {
        self.detail.status == ComplianceStatus::Compliant
    }
}

/// Login page
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub product_name: String,
    pub error: Option<String>,
    pub warning: Option<String>,
}

/// Home page
#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub chrome: Chrome,
    pub stats: Option<StatsView>,
    pub stats_notice: Option<String>,
    pub recent: Option<Vec<DisplayRecord>>,
    pub recent_notice: Option<String>,
    pub recent_limit: usize,
}

/// Analytics dashboard
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub chrome: Chrome,
    pub stats: Option<StatsView>,
    pub stats_notice: Option<String>,
    pub trend: Option<TrendView>,
    pub trend_notice: Option<String>,
    pub violations: Option<ViolationsView>,
    pub violations_notice: Option<String>,
    pub last_updated: String,
    pub data_source: String,
}

/// Record browser with filters and detail panel
#[derive(Template)]
#[template(path = "records.html")]
pub struct RecordsTemplate {
    pub chrome: Chrome,
    pub status_options: Vec<StatusOption>,
    pub date_value: String,
    pub filter_notice: Option<String>,
    pub records: Option<Vec<DisplayRecord>>,
    pub records_notice: Option<String>,
    pub selected: String,
    pub detail: Option<DetailView>,
    pub detail_notice: Option<String>,
    /// `status=...&date=...` of the active filter
    pub filter_query: String,
    pub status_value: String,
}
