//! Monitoring collaborator counts backed by the endpoint, result and alert
//! tables.

use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::{Double, Nullable};

use super::database::connection::{DbConnection, DbPool};
use super::database::model::encode_time;
use super::database::schema::{alerts, endpoints, monitoring_results};
use crate::domain::aggregate::TimeRange;
use crate::error::Result;
use crate::port::outbound::monitoring::MonitoringSource;

/// Read-only sub-count queries for the monitoring summary.
pub struct SqliteMonitoringSource {
    pool: DbPool,
}

impl SqliteMonitoringSource {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }
}

/// Encoded `(start, end)` bounds for a `BETWEEN` filter.
fn bounds(range: TimeRange) -> (String, String) {
    (encode_time(range.start), encode_time(range.end))
}

fn count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

impl MonitoringSource for SqliteMonitoringSource {
    fn count_endpoints(&self) -> Result<u64> {
        let n: i64 = endpoints::table
            .filter(endpoints::deleted_at.is_null())
            .count()
            .get_result(&mut self.conn()?)?;
        Ok(count(n))
    }

    fn count_active_endpoints(&self) -> Result<u64> {
        let n: i64 = endpoints::table
            .filter(endpoints::deleted_at.is_null())
            .filter(endpoints::is_active.eq(true))
            .count()
            .get_result(&mut self.conn()?)?;
        Ok(count(n))
    }

    fn count_checks(&self, range: TimeRange) -> Result<u64> {
        let (start, end) = bounds(range);
        let n: i64 = monitoring_results::table
            .filter(monitoring_results::created_at.between(start, end))
            .count()
            .get_result(&mut self.conn()?)?;
        Ok(count(n))
    }

    fn count_successful_checks(&self, range: TimeRange) -> Result<u64> {
        let (start, end) = bounds(range);
        let n: i64 = monitoring_results::table
            .filter(monitoring_results::created_at.between(start, end))
            .filter(monitoring_results::status_code.between(200, 299))
            .count()
            .get_result(&mut self.conn()?)?;
        Ok(count(n))
    }

    fn count_failed_checks(&self, range: TimeRange) -> Result<u64> {
        let (start, end) = bounds(range);
        let n: i64 = monitoring_results::table
            .filter(monitoring_results::created_at.between(start, end))
            .filter(
                monitoring_results::status_code
                    .ge(400)
                    .or(monitoring_results::status_code.eq(0)),
            )
            .count()
            .get_result(&mut self.conn()?)?;
        Ok(count(n))
    }

    fn average_response_time(&self, range: TimeRange) -> Result<Option<f64>> {
        let (start, end) = bounds(range);
        let average: Option<f64> = monitoring_results::table
            .filter(monitoring_results::created_at.between(start, end))
            .filter(monitoring_results::response_time_ms.gt(0))
            .select(sql::<Nullable<Double>>("AVG(response_time_ms)"))
            .get_result(&mut self.conn()?)?;
        Ok(average)
    }

    fn count_alerts(&self) -> Result<u64> {
        let n: i64 = alerts::table
            .filter(alerts::deleted_at.is_null())
            .count()
            .get_result(&mut self.conn()?)?;
        Ok(count(n))
    }

    fn count_triggered_alerts(&self, range: TimeRange) -> Result<u64> {
        let (start, end) = bounds(range);
        let n: i64 = alerts::table
            .filter(alerts::deleted_at.is_null())
            .filter(alerts::triggered_at.between(start, end))
            .count()
            .get_result(&mut self.conn()?)?;
        Ok(count(n))
    }
}
