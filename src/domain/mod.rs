//! Transport- and storage-agnostic types.
//!
//! - [`metric`] - Metric data points, stream ids, durable rows
//! - [`aggregate`] - Derived read-side summaries
//! - [`connection`] - Connection states and subscriber events
//! - [`frame`] - Wire frame decoding

pub mod aggregate;
pub mod connection;
pub mod frame;
pub mod metric;

pub use aggregate::{
    AggregateWindow, HealthSnapshot, HealthStat, MonitoringSummary, OutcomeSummary, TimeRange,
};
pub use connection::{ConnectionEvent, ConnectionState, ConnectionStatus, EventKind};
pub use metric::{MetricEntry, MetricKind, MetricRow, NewMetric, StreamId, Tags};
