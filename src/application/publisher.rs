//! Best-effort metric capture.
//!
//! Every write goes to the stream and the durable store independently.
//! Failures are logged and swallowed: metric capture never changes the
//! outcome of the request that produced the measurement. The two writes
//! share no identifier, so a reader of both may count an event twice.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

use crate::domain::metric::{endpoint_id, MetricKind, NewMetric, StreamId, Tags};
use crate::port::outbound::store::MetricStore;
use crate::port::outbound::stream::MetricStream;

/// Name of the per-request latency timer.
pub const REQUEST_DURATION_METRIC: &str = "http_request_duration_ms";

/// What each half of a publish produced. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    pub stream_id: Option<StreamId>,
    pub row_id: Option<i64>,
}

impl PublishOutcome {
    /// Both writes landed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.stream_id.is_some() && self.row_id.is_some()
    }
}

#[derive(Clone)]
pub struct MetricPublisher {
    stream: Arc<dyn MetricStream>,
    store: Arc<dyn MetricStore>,
}

impl MetricPublisher {
    #[must_use]
    pub fn new(stream: Arc<dyn MetricStream>, store: Arc<dyn MetricStore>) -> Self {
        Self { stream, store }
    }

    /// Write `metric` to both stores. Never fails.
    pub fn publish(&self, metric: &NewMetric) -> PublishOutcome {
        let stream_id = match self.stream.append(metric) {
            Ok(id) => Some(id),
            Err(e) => {
                error!(error = %e, metric = %metric.name, "Failed to append metric to stream");
                None
            }
        };

        let row_id = match self.store.insert(metric) {
            Ok(id) => Some(id),
            Err(e) => {
                error!(error = %e, metric = %metric.name, "Failed to store metric row");
                None
            }
        };

        trace!(metric = %metric.name, value = metric.value, ?stream_id, ?row_id, "Published metric");
        PublishOutcome { stream_id, row_id }
    }

    /// Build and publish a metric from its parts.
    pub fn publish_value(
        &self,
        name: &str,
        kind: MetricKind,
        value: f64,
        timestamp: DateTime<Utc>,
        tags: Tags,
    ) -> PublishOutcome {
        let mut metric = NewMetric::new(name, kind, value).at(timestamp);
        metric.tags = tags;
        self.publish(&metric)
    }

    /// Publish each metric independently. Returns how many landed in both
    /// stores.
    pub fn publish_batch(&self, metrics: &[NewMetric]) -> usize {
        let complete = metrics
            .iter()
            .filter(|metric| self.publish(metric).is_complete())
            .count();
        debug!(total = metrics.len(), complete, "Published metric batch");
        complete
    }

    /// Record a finished HTTP request as a latency timer.
    ///
    /// The path is normalized so `/api/users/42` and `/api/users/7` share
    /// one endpoint tag.
    pub fn record_request(
        &self,
        method: &str,
        path: &str,
        status: u16,
        started: Instant,
    ) -> PublishOutcome {
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let metric = NewMetric::new(REQUEST_DURATION_METRIC, MetricKind::Timer, elapsed_ms)
            .with_tag("endpoint", endpoint_id(method, path))
            .with_tag("method", method.to_ascii_uppercase())
            .with_tag("status", status.to_string());
        self.publish(&metric)
    }

    /// Publish on the blocking pool so async callers never wait on storage.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn spawn_publish(&self, metric: NewMetric) -> JoinHandle<PublishOutcome> {
        let publisher = self.clone();
        tokio::task::spawn_blocking(move || publisher.publish(&metric))
    }
}
