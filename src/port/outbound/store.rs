//! Durable metric store port.

use chrono::{DateTime, Utc};

use crate::domain::aggregate::{AggregateWindow, HealthSnapshot, TimeRange};
use crate::domain::metric::{MetricRow, NewMetric};
use crate::error::Result;

/// Relational metric table used for range queries, aggregation and
/// retention.
pub trait MetricStore: Send + Sync {
    /// Insert one row. Returns the row id.
    fn insert(&self, metric: &NewMetric) -> Result<i64>;

    /// Rows with `timestamp` in `range`, optionally filtered by exact name,
    /// newest first.
    fn list(&self, range: TimeRange, name: Option<&str>) -> Result<Vec<MetricRow>>;

    /// Rows whose name starts with `prefix`, newest first.
    fn list_prefixed(&self, range: TimeRange, prefix: &str) -> Result<Vec<MetricRow>>;

    /// Statistics for one named metric. An empty window is not an error.
    fn aggregate(&self, name: &str, range: TimeRange) -> Result<AggregateWindow>;

    /// Average, max and min per metric name for rows with `timestamp > since`.
    fn health_since(&self, since: DateTime<Utc>) -> Result<HealthSnapshot>;

    /// Delete every row created before `cutoff`. Returns the count deleted.
    fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}
