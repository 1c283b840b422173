//! SQLite-backed durable metric store.
//!
//! Implements [`MetricStore`](crate::port::outbound::store::MetricStore)
//! over the `system_metrics` table.

use chrono::{DateTime, Utc};
use diesel::dsl::{avg, max, min};
use diesel::prelude::*;
use tracing::debug;

use super::database::connection::{write_connection, DbPool};
use super::database::model::{encode_time, MetricRecord, NewMetricRow};
use super::database::schema::system_metrics;
use crate::domain::aggregate::{AggregateWindow, HealthSnapshot, HealthStat, TimeRange};
use crate::domain::metric::{MetricRow, NewMetric};
use crate::error::Result;
use crate::port::outbound::store::MetricStore;

#[derive(QueryableByName)]
struct LastInsertRowId {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    #[diesel(column_name = "id")]
    id: i64,
}

/// Escape `%`, `_` and the escape character itself for a LIKE pattern.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Durable metric rows in SQLite.
pub struct SqliteMetricStore {
    pool: DbPool,
}

impl SqliteMetricStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a row with an explicit `created_at`, for backfills and imports.
    ///
    /// # Errors
    /// Returns an error if the pool or the insert fails.
    pub fn insert_created_at(&self, metric: &NewMetric, created_at: DateTime<Utc>) -> Result<i64> {
        let row = NewMetricRow::from_metric(metric, created_at)?;
        let mut conn = write_connection(&self.pool)?;

        let id = conn.transaction(|conn| {
            diesel::insert_into(system_metrics::table)
                .values(&row)
                .execute(conn)?;
            diesel::sql_query("SELECT last_insert_rowid() AS id")
                .get_result::<LastInsertRowId>(conn)
                .map(|row| row.id)
        })?;

        debug!(id, name = %metric.name, "Stored metric row");
        Ok(id)
    }

    fn load(&self, range: TimeRange, filter: NameFilter<'_>) -> Result<Vec<MetricRow>> {
        let mut conn = self.pool.get()?;
        let mut query = system_metrics::table
            .filter(system_metrics::timestamp.ge(encode_time(range.start)))
            .filter(system_metrics::timestamp.le(encode_time(range.end)))
            .into_boxed();

        query = match filter {
            NameFilter::Any => query,
            NameFilter::Exact(name) => query.filter(system_metrics::name.eq(name.to_string())),
            NameFilter::Prefix(prefix) => query
                .filter(system_metrics::name.like(like_prefix(prefix)).escape('\\')),
        };

        query
            .order((system_metrics::timestamp.desc(), system_metrics::id.desc()))
            .select(MetricRecord::as_select())
            .load::<MetricRecord>(&mut conn)?
            .into_iter()
            .map(MetricRow::try_from)
            .collect()
    }
}

enum NameFilter<'a> {
    Any,
    Exact(&'a str),
    Prefix(&'a str),
}

impl MetricStore for SqliteMetricStore {
    fn insert(&self, metric: &NewMetric) -> Result<i64> {
        self.insert_created_at(metric, Utc::now())
    }

    fn list(&self, range: TimeRange, name: Option<&str>) -> Result<Vec<MetricRow>> {
        let filter = name.map_or(NameFilter::Any, NameFilter::Exact);
        self.load(range, filter)
    }

    fn list_prefixed(&self, range: TimeRange, prefix: &str) -> Result<Vec<MetricRow>> {
        self.load(range, NameFilter::Prefix(prefix))
    }

    fn aggregate(&self, name: &str, range: TimeRange) -> Result<AggregateWindow> {
        // SQLite has no STDDEV; the values are folded in one pass instead.
        let mut conn = self.pool.get()?;
        let values: Vec<f64> = system_metrics::table
            .filter(system_metrics::name.eq(name))
            .filter(system_metrics::timestamp.ge(encode_time(range.start)))
            .filter(system_metrics::timestamp.le(encode_time(range.end)))
            .select(system_metrics::value)
            .load(&mut conn)?;
        Ok(AggregateWindow::from_values(name, range, &values))
    }

    fn health_since(&self, since: DateTime<Utc>) -> Result<HealthSnapshot> {
        let mut conn = self.pool.get()?;
        let rows: Vec<(String, Option<f64>, Option<f64>, Option<f64>)> = system_metrics::table
            .filter(system_metrics::timestamp.gt(encode_time(since)))
            .group_by(system_metrics::name)
            .select((
                system_metrics::name,
                avg(system_metrics::value),
                max(system_metrics::value),
                min(system_metrics::value),
            ))
            .load(&mut conn)?;

        Ok(rows
            .into_iter()
            .filter_map(|(name, avg, max, min)| {
                Some((name, HealthStat::rounded(avg?, max?, min?)))
            })
            .collect())
    }

    fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut conn = write_connection(&self.pool)?;
        let deleted = diesel::delete(
            system_metrics::table.filter(system_metrics::created_at.lt(encode_time(cutoff))),
        )
        .execute(&mut conn)?;
        Ok(deleted as u64)
    }
}
