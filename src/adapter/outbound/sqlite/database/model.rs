//! Database model types for Diesel ORM.
//!
//! Timestamps are stored as fixed-width RFC 3339 text in UTC with
//! microsecond precision, so string comparison in SQL orders them
//! chronologically.

use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;

use super::schema::{alerts, endpoints, monitoring_results, system_metrics};
use crate::domain::metric::{MetricRow, NewMetric, Tags};
use crate::error::{Error, Result};

/// Encode a timestamp for storage.
#[must_use]
pub fn encode_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decode a stored timestamp.
///
/// # Errors
/// Returns [`Error::Parse`] if the text is not RFC 3339.
pub fn decode_time(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| Error::Parse(format!("invalid timestamp '{text}': {e}")))
}

/// Database row for a metric (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = system_metrics)]
pub struct NewMetricRow {
    pub name: String,
    pub kind: String,
    pub value: f64,
    pub timestamp: String,
    pub tags: String,
    pub description: Option<String>,
    pub created_at: String,
}

impl NewMetricRow {
    /// Build a row for `metric`, stamped as created at `created_at`.
    ///
    /// # Errors
    /// Returns [`Error::Json`] if the tags cannot be encoded.
    pub fn from_metric(metric: &NewMetric, created_at: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            name: metric.name.clone(),
            kind: metric.kind.as_str().to_string(),
            value: metric.value,
            timestamp: encode_time(metric.timestamp),
            tags: serde_json::to_string(&metric.tags)?,
            description: metric.description.clone(),
            created_at: encode_time(created_at),
        })
    }
}

/// Database row for a metric (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = system_metrics)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MetricRecord {
    pub id: i64,
    pub name: String,
    pub kind: String,
    pub value: f64,
    pub timestamp: String,
    pub tags: String,
    pub description: Option<String>,
    pub created_at: String,
}

impl TryFrom<MetricRecord> for MetricRow {
    type Error = Error;

    fn try_from(record: MetricRecord) -> Result<Self> {
        let tags: Tags = if record.tags.is_empty() {
            Tags::new()
        } else {
            serde_json::from_str(&record.tags)?
        };
        Ok(Self {
            id: record.id,
            kind: record.kind.parse().map_err(Error::Parse)?,
            name: record.name,
            value: record.value,
            timestamp: decode_time(&record.timestamp)?,
            tags,
            description: record.description,
            created_at: decode_time(&record.created_at)?,
        })
    }
}

/// Database row for a monitored endpoint (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = endpoints)]
pub struct NewEndpointRow {
    pub url: String,
    pub is_active: bool,
    pub created_at: String,
    pub deleted_at: Option<String>,
}

/// Database row for one check outcome (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = monitoring_results)]
pub struct NewResultRow {
    pub endpoint_id: i64,
    pub status_code: i32,
    pub response_time_ms: i32,
    pub created_at: String,
}

/// Database row for an alert rule (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = alerts)]
pub struct NewAlertRow {
    pub endpoint_id: i64,
    pub triggered_at: Option<String>,
    pub deleted_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn encoded_times_sort_chronologically() {
        let base = Utc.with_ymd_and_hms(2026, 3, 9, 23, 59, 59).unwrap();
        let later = base + Duration::microseconds(1);
        let much_later = base + Duration::days(400);
        assert!(encode_time(base) < encode_time(later));
        assert!(encode_time(later) < encode_time(much_later));
        assert_eq!(encode_time(base).len(), encode_time(much_later).len());
    }

    #[test]
    fn encoded_time_decodes_back() {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap() + Duration::microseconds(42);
        assert_eq!(decode_time(&encode_time(at)).unwrap(), at);
        assert!(decode_time("yesterday").is_err());
    }

    #[test]
    fn metric_record_converts_to_domain_row() {
        let record = MetricRecord {
            id: 3,
            name: "payment_attempt".into(),
            kind: "counter".into(),
            value: 1.0,
            timestamp: "2026-03-09T12:00:00.000000Z".into(),
            tags: r#"{"status":"settled"}"#.into(),
            description: None,
            created_at: "2026-03-09T12:00:01.000000Z".into(),
        };
        let row = MetricRow::try_from(record).unwrap();
        assert_eq!(row.tags["status"], "settled");
        assert_eq!(row.kind, crate::domain::metric::MetricKind::Counter);
    }
}
