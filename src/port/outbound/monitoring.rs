//! Read-only counts from the endpoint, check and alert collaborators.
//!
//! Each method is one independent query; the aggregator composes them and
//! fails the whole summary if any one fails.

use crate::domain::aggregate::TimeRange;
use crate::error::Result;

pub trait MonitoringSource: Send + Sync {
    /// Endpoints that are not soft-deleted.
    fn count_endpoints(&self) -> Result<u64>;

    /// Non-deleted endpoints with monitoring enabled.
    fn count_active_endpoints(&self) -> Result<u64>;

    /// Checks recorded in the window.
    fn count_checks(&self, range: TimeRange) -> Result<u64>;

    /// Checks in the window with a 2xx status.
    fn count_successful_checks(&self, range: TimeRange) -> Result<u64>;

    /// Checks in the window with a status >= 400 or no response (status 0).
    fn count_failed_checks(&self, range: TimeRange) -> Result<u64>;

    /// Mean response time in milliseconds of checks with a positive time.
    fn average_response_time(&self, range: TimeRange) -> Result<Option<f64>>;

    /// Alerts that are not soft-deleted.
    fn count_alerts(&self) -> Result<u64>;

    /// Alerts whose last trigger falls in the window.
    fn count_triggered_alerts(&self, range: TimeRange) -> Result<u64>;
}
