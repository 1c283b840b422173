//! In-memory and failing doubles for the storage ports.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::domain::aggregate::{AggregateWindow, HealthSnapshot, HealthStat, TimeRange};
use crate::domain::metric::{MetricEntry, MetricRow, NewMetric, StreamId};
use crate::error::{Error, Result};
use crate::port::outbound::monitoring::MonitoringSource;
use crate::port::outbound::results::ResultsStore;
use crate::port::outbound::store::MetricStore;
use crate::port::outbound::stream::MetricStream;

/// [`MetricStore`] kept in a vector, with `created_at` set to insert time.
#[derive(Default)]
pub struct RecordingStore {
    rows: Mutex<Vec<MetricRow>>,
}

impl RecordingStore {
    /// Insert, ignoring the (infallible) result.
    pub fn push(&self, metric: NewMetric) {
        let _ = self.insert(&metric);
    }

    /// Insert with an explicit `created_at`.
    pub fn push_created_at(&self, metric: &NewMetric, created_at: DateTime<Utc>) -> i64 {
        let mut rows = self.rows.lock();
        let id = rows.len() as i64 + 1;
        rows.push(MetricRow {
            id,
            name: metric.name.clone(),
            kind: metric.kind,
            value: metric.value,
            timestamp: metric.timestamp,
            tags: metric.tags.clone(),
            description: metric.description.clone(),
            created_at,
        });
        id
    }

    #[must_use]
    pub fn rows(&self) -> Vec<MetricRow> {
        self.rows.lock().clone()
    }

    fn matching(&self, range: TimeRange, keep: impl Fn(&MetricRow) -> bool) -> Vec<MetricRow> {
        let mut rows: Vec<MetricRow> = self
            .rows
            .lock()
            .iter()
            .filter(|row| range.contains(row.timestamp) && keep(row))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        rows
    }
}

impl MetricStore for RecordingStore {
    fn insert(&self, metric: &NewMetric) -> Result<i64> {
        Ok(self.push_created_at(metric, Utc::now()))
    }

    fn list(&self, range: TimeRange, name: Option<&str>) -> Result<Vec<MetricRow>> {
        Ok(self.matching(range, |row| name.map_or(true, |n| row.name == n)))
    }

    fn list_prefixed(&self, range: TimeRange, prefix: &str) -> Result<Vec<MetricRow>> {
        Ok(self.matching(range, |row| row.name.starts_with(prefix)))
    }

    fn aggregate(&self, name: &str, range: TimeRange) -> Result<AggregateWindow> {
        let values: Vec<f64> = self
            .matching(range, |row| row.name == name)
            .iter()
            .map(|row| row.value)
            .collect();
        Ok(AggregateWindow::from_values(name, range, &values))
    }

    fn health_since(&self, since: DateTime<Utc>) -> Result<HealthSnapshot> {
        let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for row in self.rows.lock().iter().filter(|row| row.timestamp > since) {
            grouped.entry(row.name.clone()).or_default().push(row.value);
        }
        Ok(grouped
            .into_iter()
            .map(|(name, values)| {
                let avg = values.iter().sum::<f64>() / values.len() as f64;
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                (name, HealthStat::rounded(avg, max, min))
            })
            .collect())
    }

    fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut rows = self.rows.lock();
        let before = rows.len();
        rows.retain(|row| row.created_at >= cutoff);
        Ok((before - rows.len()) as u64)
    }
}

/// [`MetricStore`] whose every call fails.
pub struct FailingStore;

fn store_down<T>() -> Result<T> {
    Err(Error::Database("database is locked".into()))
}

impl MetricStore for FailingStore {
    fn insert(&self, _: &NewMetric) -> Result<i64> {
        store_down()
    }

    fn list(&self, _: TimeRange, _: Option<&str>) -> Result<Vec<MetricRow>> {
        store_down()
    }

    fn list_prefixed(&self, _: TimeRange, _: &str) -> Result<Vec<MetricRow>> {
        store_down()
    }

    fn aggregate(&self, _: &str, _: TimeRange) -> Result<AggregateWindow> {
        store_down()
    }

    fn health_since(&self, _: DateTime<Utc>) -> Result<HealthSnapshot> {
        store_down()
    }

    fn delete_created_before(&self, _: DateTime<Utc>) -> Result<u64> {
        store_down()
    }
}

/// [`MetricStream`] whose every call fails.
pub struct FailingStream;

impl MetricStream for FailingStream {
    fn append(&self, _: &NewMetric) -> Result<StreamId> {
        Err(Error::Stream("stream unavailable".into()))
    }

    fn read_recent(&self, _: usize) -> Result<Vec<MetricEntry>> {
        Err(Error::Stream("stream unavailable".into()))
    }
}

/// [`MonitoringSource`] with fixed answers; one query may be set to fail.
#[derive(Debug, Clone, Default)]
pub struct StaticMonitoring {
    pub endpoints: u64,
    pub active_endpoints: u64,
    pub checks: u64,
    pub successful: u64,
    pub failed: u64,
    pub average_response_time: Option<f64>,
    pub alerts: u64,
    pub triggered: u64,
    /// Name of the port method that should fail.
    pub failing: Option<&'static str>,
}

impl StaticMonitoring {
    #[must_use]
    pub fn failing(mut self, method: &'static str) -> Self {
        self.failing = Some(method);
        self
    }

    fn answer<T>(&self, method: &'static str, value: T) -> Result<T> {
        if self.failing == Some(method) {
            return Err(Error::Database(format!("{method} unavailable")));
        }
        Ok(value)
    }
}

impl MonitoringSource for StaticMonitoring {
    fn count_endpoints(&self) -> Result<u64> {
        self.answer("count_endpoints", self.endpoints)
    }

    fn count_active_endpoints(&self) -> Result<u64> {
        self.answer("count_active_endpoints", self.active_endpoints)
    }

    fn count_checks(&self, _: TimeRange) -> Result<u64> {
        self.answer("count_checks", self.checks)
    }

    fn count_successful_checks(&self, _: TimeRange) -> Result<u64> {
        self.answer("count_successful_checks", self.successful)
    }

    fn count_failed_checks(&self, _: TimeRange) -> Result<u64> {
        self.answer("count_failed_checks", self.failed)
    }

    fn average_response_time(&self, _: TimeRange) -> Result<Option<f64>> {
        self.answer("average_response_time", self.average_response_time)
    }

    fn count_alerts(&self) -> Result<u64> {
        self.answer("count_alerts", self.alerts)
    }

    fn count_triggered_alerts(&self, _: TimeRange) -> Result<u64> {
        self.answer("count_triggered_alerts", self.triggered)
    }
}

#[derive(Default)]
struct ResultsState {
    rows: BTreeMap<i64, DateTime<Utc>>,
    next_id: i64,
    batches: usize,
    fail_after: Option<usize>,
}

/// [`ResultsStore`] over an id-ordered map, with optional batch failure.
#[derive(Default)]
pub struct MemoryResults {
    state: Mutex<ResultsState>,
}

impl MemoryResults {
    /// Add `count` rows created at `created_at`.
    pub fn seed(&self, count: usize, created_at: DateTime<Utc>) {
        let mut state = self.state.lock();
        for _ in 0..count {
            state.next_id += 1;
            let id = state.next_id;
            state.rows.insert(id, created_at);
        }
    }

    /// Fail every batch after the first `batches` succeed.
    pub fn fail_after_batches(&self, batches: usize) {
        self.state.lock().fail_after = Some(batches);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultsStore for MemoryResults {
    fn count_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        Ok(self
            .state
            .lock()
            .rows
            .values()
            .filter(|created| **created < cutoff)
            .count() as u64)
    }

    fn delete_batch_created_before(&self, cutoff: DateTime<Utc>, limit: usize) -> Result<u64> {
        let mut state = self.state.lock();
        if state.fail_after.is_some_and(|n| state.batches >= n) {
            return Err(Error::Database("disk I/O error".into()));
        }
        let ids: Vec<i64> = state
            .rows
            .iter()
            .filter(|(_, created)| **created < cutoff)
            .map(|(id, _)| *id)
            .take(limit)
            .collect();
        for id in &ids {
            state.rows.remove(id);
        }
        state.batches += 1;
        Ok(ids.len() as u64)
    }
}
