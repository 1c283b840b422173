//! End-to-end runs of the `pulsewire` binary.

mod harness;

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use chrono::{Duration, Utc};
use harness::temp_db::TempDb;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let db = dir.path().join("pulsewire.db").display().to_string();
        Self::with_config(dir, &db, "")
    }

    /// Workspace whose config points at `db_url` and appends `extra`.
    fn with_config(dir: TempDir, db_url: &str, extra: &str) -> Self {
        let config = dir.path().join("pulsewire.toml");
        std::fs::write(
            &config,
            format!("[database]\nurl = \"{db_url}\"\n\n[logging]\nlevel = \"warn\"\n\n{extra}"),
        )
        .expect("write config");
        Self { dir, config }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("pulsewire");
        cmd.current_dir(self.path())
            .env_remove("PULSEWIRE_DATABASE_URL")
            .env_remove("PULSEWIRE_WS_URL")
            .arg("--config")
            .arg(&self.config);
        cmd
    }
}

fn json_lines(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect()
}

fn of_type<'a>(lines: &'a [Value], kind: &str) -> Vec<&'a Value> {
    lines.iter().filter(|line| line["type"] == kind).collect()
}

#[test]
fn help_lists_commands() {
    cargo_bin_cmd!("pulsewire")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("cleanup"))
        .stdout(predicate::str::contains("metrics"))
        .stdout(predicate::str::contains("watch"));
}

#[test]
fn version_flag_prints_version() {
    cargo_bin_cmd!("pulsewire")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn cleanup_dry_run_reports_json() {
    let ws = Workspace::new();

    let output = ws
        .cmd()
        .args(["cleanup", "--dry-run", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let lines = json_lines(&output);
    let reports = of_type(&lines, "cleanup");
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["payload"]["dry_run"], true);
    assert_eq!(reports[0]["payload"]["eligible"], 0);
    assert!(of_type(&lines, "batch").is_empty());
}

#[test]
fn cleanup_uses_configured_retention_window() {
    let db = TempDb::create("cli-retention");
    let endpoint = db.endpoint("https://api.example.com", true, false);
    db.results(endpoint, 12, Utc::now() - Duration::days(45));
    db.results(endpoint, 3, Utc::now() - Duration::days(5));
    let ws = Workspace::with_config(
        tempfile::tempdir().expect("temp dir"),
        db.url(),
        "[retention]\nresults_days = 30\nbatch_size = 5\n",
    );

    let output = ws
        .cmd()
        .args(["cleanup", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let lines = json_lines(&output);
    let report = of_type(&lines, "cleanup")[0]["payload"].clone();
    assert_eq!(report["deleted"], 12);
    assert_eq!(report["batches"], serde_json::json!([5, 5, 2]));
    assert_eq!(of_type(&lines, "batch").len(), 3);
    assert_eq!(db.result_count(), 3);
}

#[test]
fn cleanup_days_flag_overrides_config() {
    let db = TempDb::create("cli-retention-flag");
    let endpoint = db.endpoint("https://api.example.com", true, false);
    db.results(endpoint, 4, Utc::now() - Duration::days(45));
    let ws = Workspace::with_config(
        tempfile::tempdir().expect("temp dir"),
        db.url(),
        "[retention]\nresults_days = 30\n",
    );

    ws.cmd()
        .args(["cleanup", "--days", "60", "--json"])
        .assert()
        .success();

    assert_eq!(db.result_count(), 4);
}

#[test]
fn cleanup_rejects_zero_batch_size() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["cleanup", "--batch-size", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("batch_size"));
}

#[test]
fn published_metric_is_listed() {
    let ws = Workspace::new();

    let output = ws
        .cmd()
        .args([
            "publish",
            "--name",
            "cpu_usage",
            "--value",
            "42.5",
            "--tag",
            "host=web-1",
            "--json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let lines = json_lines(&output);
    let published = of_type(&lines, "published");
    assert_eq!(published.len(), 1);
    assert!(published[0]["payload"]["row_id"].is_i64());

    let output = ws
        .cmd()
        .args(["metrics", "list", "--name", "cpu_usage", "--from", "1h", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let lines = json_lines(&output);
    let metrics = of_type(&lines, "metric");
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0]["payload"]["value"], 42.5);
}

#[test]
fn health_on_empty_database_is_empty() {
    let ws = Workspace::new();

    let output = ws
        .cmd()
        .args(["metrics", "health", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let lines = json_lines(&output);
    let health = of_type(&lines, "health");
    assert_eq!(health.len(), 1);
    assert_eq!(health[0]["payload"], serde_json::json!({}));
}

#[test]
fn malformed_config_fails() {
    let ws = Workspace::new();
    std::fs::write(&ws.config, "[database\nurl = ").unwrap();

    ws.cmd()
        .args(["metrics", "health"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}

#[test]
fn watch_rejects_non_websocket_address() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["watch", "--url", "http://dashboard.example.com/feed"])
        .assert()
        .failure();
}
