//! Metric data points as they flow through the publish path.
//!
//! A [`NewMetric`] is what a producer hands to the publisher. The stream
//! turns it into an immutable [`MetricEntry`] with a store-assigned
//! [`StreamId`]; the durable store turns it into a [`MetricRow`] with a
//! row id and `created_at`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// String-keyed tag map. Ordered so serialized tags are stable.
pub type Tags = BTreeMap<String, String>;

/// Kind of measurement, persisted as the `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    #[default]
    Gauge,
    Counter,
    Timer,
    Histogram,
}

impl MetricKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gauge => "gauge",
            Self::Counter => "counter",
            Self::Timer => "timer",
            Self::Histogram => "histogram",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gauge" => Ok(Self::Gauge),
            "counter" => Ok(Self::Counter),
            "timer" => Ok(Self::Timer),
            "histogram" => Ok(Self::Histogram),
            other => Err(format!("unknown metric kind '{other}'")),
        }
    }
}

/// A measurement ready to be published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMetric {
    pub name: String,
    pub kind: MetricKind,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewMetric {
    /// A gauge reading taken now, with no tags.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: MetricKind, value: f64) -> Self {
        Self {
            name: name.into(),
            kind,
            value,
            timestamp: Utc::now(),
            tags: Tags::new(),
            description: None,
        }
    }

    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Stream entry id: `<unix-millis>-<sequence>`.
///
/// Ordering is lexicographic on `(millis, seq)`, which is the append order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StreamId {
    pub millis: i64,
    pub seq: u64,
}

impl StreamId {
    /// The id that must follow `self` when the clock reads `now_millis`.
    ///
    /// A stalled or backwards clock keeps the previous millisecond and bumps
    /// the sequence so ids stay strictly increasing.
    #[must_use]
    pub fn successor(self, now_millis: i64) -> Self {
        if now_millis > self.millis {
            Self {
                millis: now_millis,
                seq: 0,
            }
        } else {
            Self {
                millis: self.millis,
                seq: self.seq + 1,
            }
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.millis, self.seq)
    }
}

impl FromStr for StreamId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (millis, seq) = s
            .split_once('-')
            .ok_or_else(|| format!("stream id '{s}' is missing '-'"))?;
        Ok(Self {
            millis: millis
                .parse()
                .map_err(|_| format!("invalid millis in stream id '{s}'"))?,
            seq: seq
                .parse()
                .map_err(|_| format!("invalid sequence in stream id '{s}'"))?,
        })
    }
}

/// An entry in the append-only stream. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    pub id: StreamId,
    pub name: String,
    pub kind: MetricKind,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub tags: Tags,
}

impl MetricEntry {
    #[must_use]
    pub fn from_metric(id: StreamId, metric: &NewMetric) -> Self {
        Self {
            id,
            name: metric.name.clone(),
            kind: metric.kind,
            value: metric.value,
            timestamp: metric.timestamp,
            tags: metric.tags.clone(),
        }
    }
}

/// A persisted metric row in the durable store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub id: i64,
    pub name: String,
    pub kind: MetricKind,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub tags: Tags,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Normalize a request path into an endpoint identifier.
///
/// Numeric path segments collapse to `{id}` and the result is lowercased,
/// so `GET /api/users/123` becomes `get:/api/users/{id}`.
#[must_use]
pub fn endpoint_id(method: &str, path: &str) -> String {
    let normalized = path
        .split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/");
    format!("{method}:{normalized}").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successor_advances_millis_when_clock_moves() {
        let id = StreamId { millis: 10, seq: 4 };
        assert_eq!(id.successor(11), StreamId { millis: 11, seq: 0 });
    }

    #[test]
    fn successor_bumps_sequence_when_clock_stalls_or_regresses() {
        let id = StreamId { millis: 10, seq: 4 };
        assert_eq!(id.successor(10), StreamId { millis: 10, seq: 5 });
        assert_eq!(id.successor(3), StreamId { millis: 10, seq: 5 });
    }

    #[test]
    fn stream_id_display_parses_back() {
        let id = StreamId {
            millis: 1_700_000_000_000,
            seq: 7,
        };
        assert_eq!(id.to_string(), "1700000000000-7");
        assert_eq!("1700000000000-7".parse::<StreamId>().unwrap(), id);
        assert!("garbage".parse::<StreamId>().is_err());
    }

    #[test]
    fn metric_kind_parses_case_insensitively() {
        assert_eq!("Timer".parse::<MetricKind>().unwrap(), MetricKind::Timer);
        assert!("summary".parse::<MetricKind>().is_err());
    }

    #[test]
    fn endpoint_id_replaces_numeric_segments() {
        assert_eq!(endpoint_id("GET", "/api/users/123"), "get:/api/users/{id}");
        assert_eq!(
            endpoint_id("POST", "/api/endpoints/42/checks/7"),
            "post:/api/endpoints/{id}/checks/{id}"
        );
        assert_eq!(endpoint_id("GET", "/api/v2/health"), "get:/api/v2/health");
    }
}
