//! Publish and read paths against a real SQLite database.

mod harness;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use harness::noon;
use harness::temp_db::TempDb;
use pulsewire::adapter::outbound::memory::MemoryStream;
use pulsewire::adapter::outbound::sqlite::{SqliteMetricStore, SqliteMonitoringSource};
use pulsewire::application::{Aggregator, MetricPublisher};
use pulsewire::domain::metric::{MetricKind, NewMetric};
use pulsewire::error::Error;
use pulsewire::infrastructure::bootstrap::build_services;
use pulsewire::infrastructure::config::settings::Config;
use pulsewire::port::outbound::store::MetricStore;
use pulsewire::port::outbound::stream::MetricStream;

struct Pipeline {
    db: TempDb,
    stream: Arc<MemoryStream>,
    publisher: MetricPublisher,
    aggregator: Aggregator,
}

fn pipeline(name: &str) -> Pipeline {
    let db = TempDb::create(name);
    let stream = Arc::new(MemoryStream::default());
    let store: Arc<dyn MetricStore> = Arc::new(SqliteMetricStore::new(db.pool().clone()));
    let stream_port: Arc<dyn MetricStream> = stream.clone();
    let publisher = MetricPublisher::new(Arc::clone(&stream_port), Arc::clone(&store));
    let aggregator = Aggregator::new(
        store,
        stream_port,
        Arc::new(SqliteMonitoringSource::new(db.pool().clone())),
    );
    Pipeline {
        db,
        stream,
        publisher,
        aggregator,
    }
}

fn gauge(name: &str, value: f64, at: DateTime<Utc>) -> NewMetric {
    NewMetric::new(name, MetricKind::Gauge, value).at(at)
}

#[test]
fn payment_outcomes_report_success_ratio() {
    let p = pipeline("outcomes");
    let start = noon() - Duration::hours(1);
    for i in 0..15 {
        let status = if i < 10 { "authorized" } else { "declined" };
        let metric = NewMetric::new("payment_attempt", MetricKind::Counter, 1.0)
            .at(start + Duration::minutes(i))
            .with_tag("status", status);
        assert!(p.publisher.publish(&metric).is_complete());
    }
    // Outside the window.
    p.publisher.publish(
        &NewMetric::new("payment_attempt", MetricKind::Counter, 1.0)
            .at(start - Duration::hours(2))
            .with_tag("status", "declined"),
    );

    let summary = p
        .aggregator
        .outcome_summary("payment_attempt", "status", start, noon())
        .unwrap();

    assert_eq!(summary.total, 15);
    assert_eq!(summary.count("authorized"), 10);
    assert_eq!(summary.count("declined"), 5);
    let ratio = summary.success_ratio().unwrap();
    assert!((ratio - 66.7).abs() < 0.05, "ratio was {ratio}");
}

#[test]
fn publish_lands_in_stream_and_table() {
    let p = pipeline("publish");
    let metric = gauge("cpu_usage", 41.5, noon())
        .with_tag("host", "api-1")
        .with_description("load average proxy");

    let outcome = p.publisher.publish(&metric);

    assert!(outcome.is_complete());
    assert_eq!(p.stream.len(), 1);
    let rows = p
        .aggregator
        .list_metrics(noon() - Duration::minutes(1), noon(), None)
        .unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(Some(row.id), outcome.row_id);
    assert_eq!(row.kind, MetricKind::Gauge);
    assert_eq!(row.value, 41.5);
    assert_eq!(row.timestamp, noon());
    assert_eq!(row.tags.get("host").map(String::as_str), Some("api-1"));
    assert_eq!(row.description.as_deref(), Some("load average proxy"));
}

#[test]
fn list_is_newest_first_and_filters_by_name() {
    let p = pipeline("list");
    for minutes in [30, 10, 20] {
        p.publisher
            .publish(&gauge("memory_usage", f64::from(minutes), noon() - Duration::minutes(minutes.into())));
    }
    p.publisher
        .publish(&gauge("cpu_usage", 5.0, noon() - Duration::minutes(15)));

    let all = p
        .aggregator
        .list_metrics(noon() - Duration::hours(1), noon(), None)
        .unwrap();
    assert_eq!(all.len(), 4);
    assert!(all.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));

    let memory = p
        .aggregator
        .list_metrics(noon() - Duration::hours(1), noon(), Some("memory_usage"))
        .unwrap();
    let values: Vec<f64> = memory.iter().map(|r| r.value).collect();
    assert_eq!(values, vec![10.0, 20.0, 30.0]);
}

#[test]
fn window_bounds_are_inclusive_and_inverted_windows_are_empty() {
    let p = pipeline("bounds");
    let start = noon() - Duration::hours(1);
    p.publisher.publish(&gauge("latency", 1.0, start));
    p.publisher.publish(&gauge("latency", 2.0, noon()));

    let rows = p.aggregator.list_metrics(start, noon(), Some("latency")).unwrap();
    assert_eq!(rows.len(), 2);

    let inverted = p.aggregator.list_metrics(noon(), start, Some("latency")).unwrap();
    assert!(inverted.is_empty());
}

#[test]
fn aggregates_over_empty_window_are_zero() {
    let p = pipeline("empty-aggregate");
    p.publisher
        .publish(&gauge("latency", 100.0, noon() - Duration::days(3)));

    let window = p
        .aggregator
        .aggregates("latency", noon() - Duration::hours(1), noon())
        .unwrap();

    assert_eq!(window.count, 0);
    assert_eq!(window.average, None);
    assert_eq!(window.stddev, None);
    assert_eq!(window.name, "latency");
}

#[test]
fn aggregates_compute_sample_statistics() {
    let p = pipeline("aggregate");
    for (i, value) in [100.0, 200.0, 300.0].into_iter().enumerate() {
        p.publisher.publish(&gauge(
            "response_time",
            value,
            noon() - Duration::minutes(i as i64 + 1),
        ));
    }
    p.publisher
        .publish(&gauge("other", 9000.0, noon() - Duration::minutes(1)));

    let window = p
        .aggregator
        .aggregates("response_time", noon() - Duration::hours(1), noon())
        .unwrap();

    assert_eq!(window.count, 3);
    assert_eq!(window.average, Some(200.0));
    assert_eq!(window.minimum, Some(100.0));
    assert_eq!(window.maximum, Some(300.0));
    assert!((window.stddev.unwrap() - 100.0).abs() < 1e-9);
}

#[test]
fn health_covers_trailing_day_grouped_by_name() {
    let p = pipeline("health");
    p.publisher
        .publish(&gauge("cpu_usage", 10.0, noon() - Duration::hours(1)));
    p.publisher
        .publish(&gauge("cpu_usage", 20.333, noon() - Duration::hours(23)));
    p.publisher
        .publish(&gauge("cpu_usage", 99.0, noon() - Duration::hours(25)));
    p.publisher
        .publish(&gauge("memory_usage", 512.0, noon() - Duration::hours(2)));
    p.publisher
        .publish(&gauge("disk_usage", 80.0, noon() - Duration::days(2)));

    let health = p.aggregator.system_health_at(noon()).unwrap();

    assert_eq!(health.len(), 2);
    let cpu = health["cpu_usage"];
    assert_eq!(cpu.avg, 15.17);
    assert_eq!(cpu.max, 20.33);
    assert_eq!(cpu.min, 10.0);
    assert_eq!(health["memory_usage"].avg, 512.0);
    assert!(!health.contains_key("disk_usage"));
}

#[test]
fn revenue_metrics_match_literal_prefix() {
    let p = pipeline("revenue");
    let at = noon() - Duration::minutes(5);
    p.publisher.publish(&gauge("stripe_charge_amount", 49.0, at));
    p.publisher.publish(&gauge("stripe_refund_amount", 10.0, at));
    p.publisher.publish(&gauge("stripeXcharge", 1.0, at));
    p.publisher.publish(&gauge("paypal_charge_amount", 30.0, at));

    let rows = p
        .aggregator
        .revenue_metrics(noon() - Duration::hours(1), noon())
        .unwrap();
    let mut names: Vec<_> = rows.into_iter().map(|r| r.name).collect();
    names.sort();
    assert_eq!(names, vec!["stripe_charge_amount", "stripe_refund_amount"]);
}

#[test]
fn recent_reads_the_stream_newest_first() {
    let p = pipeline("recent");
    for i in 0..5 {
        p.publisher
            .publish(&gauge("queue_depth", f64::from(i), noon()));
    }

    let recent = p.aggregator.recent(3);
    let values: Vec<f64> = recent.iter().map(|e| e.value).collect();
    assert_eq!(values, vec![4.0, 3.0, 2.0]);
    assert!(recent[0].id > recent[1].id);
}

#[test]
fn monitoring_summary_counts_collaborator_tables() {
    let p = pipeline("summary");
    let db = &p.db;
    let api = db.endpoint("https://api.example.com/health", true, false);
    let web = db.endpoint("https://www.example.com", false, false);
    db.endpoint("https://old.example.com", true, true);

    let in_window = noon() - Duration::minutes(30);
    db.result(api, 200, 120, in_window);
    db.result(api, 204, 80, in_window);
    db.result(api, 503, 900, in_window);
    db.result(web, 0, 0, in_window);
    db.result(web, 301, 40, in_window);
    db.result(api, 200, 5000, noon() - Duration::days(2));

    db.alert(api, Some(in_window), false);
    db.alert(web, None, false);
    db.alert(web, Some(in_window), true);

    let summary = p
        .aggregator
        .monitoring_summary(noon() - Duration::hours(1), noon())
        .unwrap();

    assert_eq!(summary.endpoints_total, 2);
    assert_eq!(summary.endpoints_active, 1);
    assert_eq!(summary.checks_in_window, 5);
    assert_eq!(summary.successful_checks, 2);
    assert_eq!(summary.failed_checks, 2);
    // Zero response times are excluded from the mean.
    assert_eq!(summary.avg_response_time, Some(285.0));
    assert_eq!(summary.alerts_configured, 2);
    assert_eq!(summary.alerts_triggered_in_window, 1);
    assert_eq!(summary.uptime_percent(), Some(40.0));
}

#[test]
fn monitoring_summary_fails_fast_naming_the_query() {
    let p = pipeline("summary-failure");
    {
        let mut conn = p.db.pool().get().unwrap();
        diesel::sql_query("DROP TABLE alerts").execute(&mut conn).unwrap();
    }

    let err = p
        .aggregator
        .monitoring_summary(noon() - Duration::hours(1), noon())
        .unwrap_err();

    match err {
        Error::Aggregate { query, .. } => assert_eq!(query, "alerts_configured"),
        other => panic!("expected aggregate error, got {other:?}"),
    }
}

#[test]
fn publisher_swallows_durable_store_failure() {
    let p = pipeline("publish-failure");
    {
        let mut conn = p.db.pool().get().unwrap();
        diesel::sql_query("DROP TABLE system_metrics")
            .execute(&mut conn)
            .unwrap();
    }

    let outcome = p.publisher.publish(&gauge("cpu_usage", 1.0, noon()));

    assert!(outcome.stream_id.is_some());
    assert!(outcome.row_id.is_none());
    assert_eq!(p.stream.len(), 1);

    // The read path does not swallow the same failure.
    assert!(p
        .aggregator
        .list_metrics(noon() - Duration::hours(1), noon(), None)
        .is_err());
}

#[test]
fn request_timings_are_tagged_by_normalized_endpoint() {
    let p = pipeline("request");
    let started = std::time::Instant::now();

    p.publisher
        .record_request("get", "/api/endpoints/42/results", 200, started);

    let rows = p
        .aggregator
        .list_metrics(
            Utc::now() - Duration::minutes(1),
            Utc::now() + Duration::minutes(1),
            Some("http_request_duration_ms"),
        )
        .unwrap();
    assert_eq!(rows.len(), 1);
    let tags = &rows[0].tags;
    assert_eq!(tags["endpoint"], "get:/api/endpoints/{id}/results");
    assert_eq!(tags["method"], "GET");
    assert_eq!(tags["status"], "200");
    assert_eq!(rows[0].kind, MetricKind::Timer);
}

#[tokio::test]
async fn spawned_publish_completes_off_the_async_task() {
    let p = pipeline("spawn");
    let outcome = p
        .publisher
        .spawn_publish(gauge("cpu_usage", 3.0, noon()))
        .await
        .unwrap();
    assert!(outcome.is_complete());
}

#[test]
fn bootstrap_wires_services_from_config() {
    let db = TempDb::create("bootstrap");
    let mut config = Config::default();
    config.database.url = db.url().to_string();

    let services = build_services(&config).unwrap();
    services
        .publisher
        .publish(&gauge("uptime_percent", 99.9, noon()));

    assert_eq!(services.stream.len(), 1);
    let health = services.aggregator.system_health_at(noon()).unwrap();
    assert_eq!(health["uptime_percent"].avg, 99.9);
}
