//! Handlers for the `metrics` command group.

use chrono::Utc;
use serde_json::json;
use tabled::{Table, Tabled};

use super::command::{AggregateArgs, ListArgs, MetricsCommand, OutcomesArgs, WindowArgs};
use super::output;
use crate::application::Aggregator;
use crate::domain::aggregate::{HealthSnapshot, MonitoringSummary};
use crate::domain::metric::MetricRow;
use crate::error::Result;

#[derive(Tabled)]
struct MetricLine {
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Tags")]
    tags: String,
}

impl From<&MetricRow> for MetricLine {
    fn from(row: &MetricRow) -> Self {
        let tags = row
            .tags
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        Self {
            timestamp: row.timestamp.to_rfc3339(),
            name: row.name.clone(),
            kind: row.kind.to_string(),
            value: format!("{:.2}", row.value),
            tags,
        }
    }
}

#[derive(Tabled)]
struct HealthLine {
    #[tabled(rename = "Metric")]
    name: String,
    #[tabled(rename = "Avg")]
    avg: f64,
    #[tabled(rename = "Max")]
    max: f64,
    #[tabled(rename = "Min")]
    min: f64,
}

#[derive(Tabled)]
struct OutcomeLine {
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Count")]
    count: u64,
}

/// Dispatch a `metrics` subcommand.
///
/// # Errors
///
/// Returns the aggregator error; nothing is printed for a failed query.
pub fn execute(aggregator: &Aggregator, command: &MetricsCommand) -> Result<()> {
    match command {
        MetricsCommand::List(args) => list(aggregator, args),
        MetricsCommand::Aggregate(args) => aggregate(aggregator, args),
        MetricsCommand::Health => health(aggregator),
        MetricsCommand::Summary(window) => summary(aggregator, window),
        MetricsCommand::Outcomes(args) => outcomes(aggregator, args),
    }
}

fn list(aggregator: &Aggregator, args: &ListArgs) -> Result<()> {
    let (start, end) = args.window.resolve(Utc::now());
    let rows = aggregator.list_metrics(start, end, args.name.as_deref())?;

    if output::is_json() {
        for row in &rows {
            output::emit_json_line("metric", json!(row));
        }
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::section(&format!("Metrics {} to {}", start.to_rfc3339(), end.to_rfc3339()));
    if rows.is_empty() {
        output::note("No metrics in this window");
        return Ok(());
    }
    let table = Table::new(rows.iter().map(MetricLine::from)).to_string();
    output::lines(&table);
    output::note(&format!("{} rows", rows.len()));
    Ok(())
}

fn aggregate(aggregator: &Aggregator, args: &AggregateArgs) -> Result<()> {
    let (start, end) = args.window.resolve(Utc::now());
    let window = aggregator.aggregates(&args.name, start, end)?;

    if output::is_json() {
        output::emit_json_line("aggregate", json!(window));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::section(&format!("Aggregates for {}", output::highlight(&window.name)));
    output::field("Count", window.count);
    output::field("Average", output::number(window.average));
    output::field("Minimum", output::number(window.minimum));
    output::field("Maximum", output::number(window.maximum));
    output::field("Std dev", output::number(window.stddev));
    if window.is_empty() {
        output::hint("no rows matched; check the metric name and window");
    }
    Ok(())
}

fn health(aggregator: &Aggregator) -> Result<()> {
    let snapshot = aggregator.system_health()?;

    if output::is_json() {
        output::emit_json_line("health", json!(snapshot));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::section("System health (last 24h)");
    render_health(&snapshot);
    Ok(())
}

fn render_health(snapshot: &HealthSnapshot) {
    if snapshot.is_empty() {
        output::note("No metrics recorded in the last 24 hours");
        return;
    }
    let rows = snapshot.iter().map(|(name, stat)| HealthLine {
        name: name.clone(),
        avg: stat.avg,
        max: stat.max,
        min: stat.min,
    });
    output::lines(&Table::new(rows).to_string());
}

fn summary(aggregator: &Aggregator, window: &WindowArgs) -> Result<()> {
    let (start, end) = window.resolve(Utc::now());
    let summary = aggregator.monitoring_summary(start, end)?;

    if output::is_json() {
        let mut payload = json!(summary);
        payload["uptime_percent"] = json!(summary.uptime_percent());
        output::emit_json_line("summary", payload);
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::section("Monitoring summary");
    render_summary(&summary);
    Ok(())
}

fn render_summary(summary: &MonitoringSummary) {
    output::field(
        "Endpoints",
        format!("{} ({} active)", summary.endpoints_total, summary.endpoints_active),
    );
    output::field("Checks", summary.checks_in_window);
    output::field("Successful", summary.successful_checks);
    output::field("Failed", summary.failed_checks);
    output::field(
        "Uptime",
        summary
            .uptime_percent()
            .map_or_else(|| "-".to_string(), |p| format!("{p:.1}%")),
    );
    output::field(
        "Avg response",
        summary
            .avg_response_time
            .map_or_else(|| "-".to_string(), |ms| format!("{ms:.1} ms")),
    );
    output::field(
        "Alerts",
        format!(
            "{} configured, {} triggered",
            summary.alerts_configured, summary.alerts_triggered_in_window
        ),
    );
}

fn outcomes(aggregator: &Aggregator, args: &OutcomesArgs) -> Result<()> {
    let (start, end) = args.window.resolve(Utc::now());
    let summary = aggregator.outcome_summary(&args.name, &args.tag, start, end)?;

    if output::is_json() {
        let mut payload = json!(summary);
        payload["success_ratio"] = json!(summary.success_ratio());
        output::emit_json_line("outcomes", payload);
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::section(&format!(
        "{} by {}",
        output::highlight(&summary.name),
        summary.tag
    ));
    let rows = summary.by_value.iter().map(|(value, count)| OutcomeLine {
        value: value.clone(),
        count: *count,
    });
    output::lines(&Table::new(rows).to_string());
    output::field("Total", summary.total);
    output::field(
        "Success",
        summary
            .success_ratio()
            .map_or_else(|| "-".to_string(), |p| format!("{p:.1}%")),
    );
    Ok(())
}
