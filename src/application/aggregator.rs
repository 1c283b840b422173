//! Read-side queries for the dashboard.
//!
//! Everything here fails fast: a failed query surfaces as
//! [`Error::Aggregate`] naming the query, and composed results are never
//! returned partially filled. The one exception is [`Aggregator::recent`],
//! which feeds a best-effort realtime panel.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::domain::aggregate::{
    AggregateWindow, HealthSnapshot, MonitoringSummary, OutcomeSummary, TimeRange,
};
use crate::domain::metric::{MetricEntry, MetricRow};
use crate::error::{Error, Result};
use crate::port::outbound::monitoring::MonitoringSource;
use crate::port::outbound::store::MetricStore;
use crate::port::outbound::stream::MetricStream;

/// Health snapshots cover this trailing window.
pub const HEALTH_WINDOW_HOURS: i64 = 24;

/// Name prefix of billing-provider metrics.
pub const REVENUE_PREFIX: &str = "stripe_";

/// Default page size for the realtime panel.
pub const DEFAULT_RECENT_LIMIT: usize = 100;

pub struct Aggregator {
    store: Arc<dyn MetricStore>,
    stream: Arc<dyn MetricStream>,
    monitoring: Arc<dyn MonitoringSource>,
}

impl Aggregator {
    #[must_use]
    pub fn new(
        store: Arc<dyn MetricStore>,
        stream: Arc<dyn MetricStream>,
        monitoring: Arc<dyn MonitoringSource>,
    ) -> Self {
        Self {
            store,
            stream,
            monitoring,
        }
    }

    /// Rows in `[start, end]`, optionally one metric only, newest first.
    ///
    /// # Errors
    /// Returns [`Error::Aggregate`] if the store query fails.
    pub fn list_metrics(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        name: Option<&str>,
    ) -> Result<Vec<MetricRow>> {
        self.store
            .list(TimeRange::new(start, end), name)
            .map_err(|e| Error::aggregate("list_metrics", e))
    }

    /// Statistics for `name` over `[start, end]`. No rows is not an error.
    ///
    /// # Errors
    /// Returns [`Error::Aggregate`] if the store query fails.
    pub fn aggregates(
        &self,
        name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<AggregateWindow> {
        self.store
            .aggregate(name, TimeRange::new(start, end))
            .map_err(|e| Error::aggregate("aggregates", e))
    }

    /// Average, max and min per metric over the trailing 24 hours.
    ///
    /// # Errors
    /// Returns [`Error::Aggregate`] if the store query fails.
    pub fn system_health(&self) -> Result<HealthSnapshot> {
        self.system_health_at(Utc::now())
    }

    /// [`system_health`](Self::system_health) as seen at `now`.
    ///
    /// # Errors
    /// Returns [`Error::Aggregate`] if the store query fails.
    pub fn system_health_at(&self, now: DateTime<Utc>) -> Result<HealthSnapshot> {
        let since = now - Duration::hours(HEALTH_WINDOW_HOURS);
        let snapshot = self
            .store
            .health_since(since)
            .map_err(|e| Error::aggregate("system_health", e))?;
        debug!(metrics = snapshot.len(), "Computed health snapshot");
        Ok(snapshot)
    }

    /// Endpoint, check and alert counts for `[start, end]`.
    ///
    /// # Errors
    /// Returns [`Error::Aggregate`] naming the first sub-count that failed.
    pub fn monitoring_summary(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<MonitoringSummary> {
        let range = TimeRange::new(start, end);
        let source = &self.monitoring;
        let wrap = |query: &'static str| move |e: Error| Error::aggregate(query, e);

        let summary = MonitoringSummary {
            endpoints_total: source.count_endpoints().map_err(wrap("endpoints_total"))?,
            endpoints_active: source
                .count_active_endpoints()
                .map_err(wrap("endpoints_active"))?,
            checks_in_window: source.count_checks(range).map_err(wrap("checks_in_window"))?,
            successful_checks: source
                .count_successful_checks(range)
                .map_err(wrap("successful_checks"))?,
            failed_checks: source
                .count_failed_checks(range)
                .map_err(wrap("failed_checks"))?,
            avg_response_time: source
                .average_response_time(range)
                .map_err(wrap("avg_response_time"))?,
            alerts_configured: source.count_alerts().map_err(wrap("alerts_configured"))?,
            alerts_triggered_in_window: source
                .count_triggered_alerts(range)
                .map_err(wrap("alerts_triggered_in_window"))?,
        };
        debug!(
            endpoints = summary.endpoints_total,
            checks = summary.checks_in_window,
            "Computed monitoring summary"
        );
        Ok(summary)
    }

    /// Counts of `name` rows per value of `tag` in `[start, end]`.
    ///
    /// # Errors
    /// Returns [`Error::Aggregate`] if the store query fails.
    pub fn outcome_summary(
        &self,
        name: &str,
        tag: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<OutcomeSummary> {
        let rows = self
            .store
            .list(TimeRange::new(start, end), Some(name))
            .map_err(|e| Error::aggregate("outcome_summary", e))?;

        let mut summary = OutcomeSummary::new(name, tag);
        for row in &rows {
            summary.record(row.tags.get(tag).map(String::as_str));
        }
        Ok(summary)
    }

    /// Billing-provider metrics in `[start, end]`, newest first.
    ///
    /// # Errors
    /// Returns [`Error::Aggregate`] if the store query fails.
    pub fn revenue_metrics(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<MetricRow>> {
        self.store
            .list_prefixed(TimeRange::new(start, end), REVENUE_PREFIX)
            .map_err(|e| Error::aggregate("revenue_metrics", e))
    }

    /// Newest stream entries. A stream failure yields an empty list.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<MetricEntry> {
        match self.stream.read_recent(limit) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Failed to read realtime metrics");
                Vec::new()
            }
        }
    }
}
