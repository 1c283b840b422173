//! Read-side summaries computed from durable metric rows.
//!
//! Everything here is derived per query and never cached.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Closed time interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The trailing window of `duration` ending at `now`.
    #[must_use]
    pub fn trailing(now: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            start: now - duration,
            end: now,
        }
    }

    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Statistical summary of one named metric over a window.
///
/// An empty window has `count == 0` and no statistics; it is not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateWindow {
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub count: u64,
    pub average: Option<f64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    /// Sample standard deviation; absent for fewer than two values.
    pub stddev: Option<f64>,
}

impl AggregateWindow {
    #[must_use]
    pub fn empty(name: impl Into<String>, range: TimeRange) -> Self {
        Self {
            name: name.into(),
            start: range.start,
            end: range.end,
            count: 0,
            average: None,
            minimum: None,
            maximum: None,
            stddev: None,
        }
    }

    /// Compute count, mean, extremes and sample deviation in one pass.
    #[must_use]
    pub fn from_values(name: impl Into<String>, range: TimeRange, values: &[f64]) -> Self {
        let mut window = Self::empty(name, range);
        if values.is_empty() {
            return window;
        }

        // Welford's online update keeps the variance numerically stable.
        let mut count = 0u64;
        let mut mean = 0.0f64;
        let mut m2 = 0.0f64;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &value in values {
            count += 1;
            let delta = value - mean;
            mean += delta / count as f64;
            m2 += delta * (value - mean);
            min = min.min(value);
            max = max.max(value);
        }

        window.count = count;
        window.average = Some(mean);
        window.minimum = Some(min);
        window.maximum = Some(max);
        window.stddev = (count > 1).then(|| (m2 / (count - 1) as f64).sqrt());
        window
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Per-metric health numbers over the trailing day, rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthStat {
    pub avg: f64,
    pub max: f64,
    pub min: f64,
}

impl HealthStat {
    #[must_use]
    pub fn rounded(avg: f64, max: f64, min: f64) -> Self {
        Self {
            avg: round2(avg),
            max: round2(max),
            min: round2(min),
        }
    }
}

/// 24h health snapshot keyed by metric name.
pub type HealthSnapshot = BTreeMap<String, HealthStat>;

/// Round half away from zero to two decimals.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Monitoring-domain summary composed from collaborator sub-counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringSummary {
    pub endpoints_total: u64,
    pub endpoints_active: u64,
    pub checks_in_window: u64,
    pub successful_checks: u64,
    pub failed_checks: u64,
    /// Mean response time of checks with a positive response time.
    pub avg_response_time: Option<f64>,
    pub alerts_configured: u64,
    pub alerts_triggered_in_window: u64,
}

impl MonitoringSummary {
    /// Share of checks in the window that succeeded, as a percentage.
    #[must_use]
    pub fn uptime_percent(&self) -> Option<f64> {
        (self.checks_in_window > 0)
            .then(|| self.successful_checks as f64 * 100.0 / self.checks_in_window as f64)
    }
}

/// Tag values that count as a successful payment outcome.
pub const SUCCESS_OUTCOMES: &[&str] = &["authorized", "settled"];

/// Row counts per value of one tag, for a named metric in a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    pub name: String,
    pub tag: String,
    pub total: u64,
    pub by_value: BTreeMap<String, u64>,
}

impl OutcomeSummary {
    #[must_use]
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
            total: 0,
            by_value: BTreeMap::new(),
        }
    }

    /// Count one row. Rows without the tag count toward the total only.
    pub fn record(&mut self, value: Option<&str>) {
        self.total += 1;
        if let Some(value) = value {
            *self.by_value.entry(value.to_string()).or_default() += 1;
        }
    }

    #[must_use]
    pub fn count(&self, value: &str) -> u64 {
        self.by_value.get(value).copied().unwrap_or(0)
    }

    /// Percentage of rows whose tag is one of [`SUCCESS_OUTCOMES`].
    #[must_use]
    pub fn success_ratio(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        let successes: u64 = SUCCESS_OUTCOMES.iter().map(|v| self.count(v)).sum();
        Some(successes as f64 * 100.0 / self.total as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn range() -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn empty_window_has_zero_count_and_no_statistics() {
        let window = AggregateWindow::from_values("latency", range(), &[]);
        assert!(window.is_empty());
        assert_eq!(window.average, None);
        assert_eq!(window.stddev, None);
    }

    #[test]
    fn single_value_has_no_sample_deviation() {
        let window = AggregateWindow::from_values("latency", range(), &[42.0]);
        assert_eq!(window.count, 1);
        assert_eq!(window.average, Some(42.0));
        assert_eq!(window.minimum, Some(42.0));
        assert_eq!(window.maximum, Some(42.0));
        assert_eq!(window.stddev, None);
    }

    #[test]
    fn statistics_match_textbook_values() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let window = AggregateWindow::from_values("latency", range(), &values);
        assert_eq!(window.count, 8);
        assert_eq!(window.average, Some(5.0));
        assert_eq!(window.minimum, Some(2.0));
        assert_eq!(window.maximum, Some(9.0));
        // Sample variance is 32 / 7.
        let expected = (32.0f64 / 7.0).sqrt();
        assert!((window.stddev.unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn round2_rounds_to_cents() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(1.235_000_1), 1.24);
        assert_eq!(round2(-2.5), -2.5);
    }

    #[test]
    fn trailing_range_contains_its_bounds() {
        let now = Utc::now();
        let window = TimeRange::trailing(now, Duration::hours(24));
        assert!(window.contains(now));
        assert!(window.contains(now - Duration::hours(24)));
        assert!(!window.contains(now - Duration::hours(25)));
    }

    #[test]
    fn outcome_success_ratio() {
        let mut summary = OutcomeSummary::new("payment_attempt", "status");
        for _ in 0..10 {
            summary.record(Some("authorized"));
        }
        for _ in 0..5 {
            summary.record(Some("declined"));
        }
        assert_eq!(summary.total, 15);
        let ratio = summary.success_ratio().unwrap();
        assert!((ratio - 66.666).abs() < 0.01, "ratio was {ratio}");
    }

    #[test]
    fn outcome_ratio_absent_without_rows() {
        assert_eq!(OutcomeSummary::new("x", "status").success_ratio(), None);
    }

    #[test]
    fn uptime_percent_handles_empty_window() {
        let summary = MonitoringSummary {
            endpoints_total: 3,
            endpoints_active: 2,
            checks_in_window: 0,
            successful_checks: 0,
            failed_checks: 0,
            avg_response_time: None,
            alerts_configured: 1,
            alerts_triggered_in_window: 0,
        };
        assert_eq!(summary.uptime_percent(), None);
    }
}
