//! Retention sweeps against a real SQLite database.

mod harness;

use std::sync::Arc;

use chrono::Duration;
use harness::noon;
use harness::temp_db::TempDb;
use pulsewire::adapter::outbound::sqlite::{SqliteMetricStore, SqliteResultsStore};
use pulsewire::application::retention::{BatchProgress, CleanupRequest, RetentionSweeper};
use pulsewire::domain::aggregate::TimeRange;
use pulsewire::domain::metric::{MetricKind, NewMetric};
use pulsewire::port::outbound::store::MetricStore;

fn sweeper(db: &TempDb) -> (RetentionSweeper, Arc<SqliteMetricStore>) {
    let metrics = Arc::new(SqliteMetricStore::new(db.pool().clone()));
    let sweeper = RetentionSweeper::new(
        metrics.clone(),
        Arc::new(SqliteResultsStore::new(db.pool().clone())),
    );
    (sweeper, metrics)
}

fn request(dry_run: bool) -> CleanupRequest {
    CleanupRequest {
        retention_days: 90,
        batch_size: 1000,
        dry_run,
    }
}

#[test]
fn cleanup_deletes_eligible_rows_in_bounded_batches() {
    let db = TempDb::create("cleanup-batches");
    let endpoint = db.endpoint("https://api.example.com", true, false);
    db.results(endpoint, 2500, noon() - Duration::days(120));
    db.results(endpoint, 40, noon() - Duration::days(10));
    let (sweeper, _) = sweeper(&db);

    let mut seen: Vec<BatchProgress> = Vec::new();
    let report = sweeper
        .cleanup_results_at(noon(), request(false), |p| seen.push(*p))
        .unwrap();

    assert_eq!(report.eligible, 2500);
    assert_eq!(report.deleted, 2500);
    assert_eq!(report.batches, vec![1000, 1000, 500]);
    assert_eq!(
        seen.iter().map(|p| p.total_deleted).collect::<Vec<_>>(),
        vec![1000, 2000, 2500]
    );
    assert_eq!(seen.last().map(|p| p.batch), Some(3));
    assert_eq!(db.result_count(), 40, "recent rows survive");
}

#[test]
fn dry_run_reports_what_a_real_run_deletes() {
    let db = TempDb::create("cleanup-dry-run");
    let endpoint = db.endpoint("https://api.example.com", true, false);
    db.results(endpoint, 1234, noon() - Duration::days(91));
    db.results(endpoint, 10, noon() - Duration::days(89));
    let (sweeper, _) = sweeper(&db);

    let mut batches = 0;
    let dry = sweeper
        .cleanup_results_at(noon(), request(true), |_| batches += 1)
        .unwrap();
    assert!(dry.dry_run);
    assert_eq!(dry.eligible, 1234);
    assert_eq!(dry.deleted, 0);
    assert_eq!(dry.affected(), 1234);
    assert_eq!(batches, 0);
    assert_eq!(db.result_count(), 1244);

    let real = sweeper
        .cleanup_results_at(noon(), request(false), |_| {})
        .unwrap();
    assert_eq!(real.deleted, dry.eligible);
    assert_eq!(db.result_count(), 10);
}

#[test]
fn cleanup_with_nothing_eligible_is_a_no_op() {
    let db = TempDb::create("cleanup-empty");
    let endpoint = db.endpoint("https://api.example.com", true, false);
    db.results(endpoint, 5, noon() - Duration::days(1));
    let (sweeper, _) = sweeper(&db);

    let report = sweeper
        .cleanup_results_at(noon(), request(false), |_| panic!("no batches expected"))
        .unwrap();

    assert_eq!(report.eligible, 0);
    assert_eq!(report.deleted, 0);
    assert!(report.batches.is_empty());
    assert_eq!(db.result_count(), 5);
}

#[test]
fn rows_exactly_at_cutoff_are_kept() {
    let db = TempDb::create("cleanup-cutoff");
    let endpoint = db.endpoint("https://api.example.com", true, false);
    db.result(endpoint, 200, 50, noon() - Duration::days(90));
    db.result(endpoint, 200, 50, noon() - Duration::days(90) - Duration::seconds(1));
    let (sweeper, _) = sweeper(&db);

    let report = sweeper
        .cleanup_results_at(noon(), request(false), |_| {})
        .unwrap();

    assert_eq!(report.deleted, 1);
    assert_eq!(db.result_count(), 1);
}

#[test]
fn clear_old_metrics_uses_creation_time() {
    let db = TempDb::create("clear-metrics");
    let (sweeper, metrics) = sweeper(&db);
    let metric = NewMetric::new("cpu_usage", MetricKind::Gauge, 12.0).at(noon());

    metrics
        .insert_created_at(&metric, noon() - Duration::days(100))
        .unwrap();
    metrics
        .insert_created_at(&metric, noon() - Duration::days(91))
        .unwrap();
    metrics
        .insert_created_at(&metric, noon() - Duration::days(5))
        .unwrap();

    let deleted = sweeper.clear_old_metrics_at(noon(), 90).unwrap();

    assert_eq!(deleted, 2);
    let remaining = metrics
        .list(
            TimeRange::new(noon() - Duration::days(1), noon()),
            Some("cpu_usage"),
        )
        .unwrap();
    assert_eq!(remaining.len(), 1);
}
