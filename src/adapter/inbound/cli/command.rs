//! Command-line interface definitions.
//!
//! Defines the CLI structure for the pulsewire binary using `clap`. The
//! subcommands cover the operator surface around the metrics pipeline:
//! retention cleanup, read-side queries, test publishing, and a live view
//! of the dashboard feed.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};

use crate::application::retention::CleanupRequest;
use crate::domain::metric::MetricKind;
use crate::infrastructure::config::retention::RetentionConfig;
use crate::infrastructure::config::settings::DEFAULT_CONFIG_PATH;

/// Real-time metrics pipeline and dashboard feed for uptime monitoring
#[derive(Parser, Debug)]
#[command(name = "pulsewire")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the pulsewire CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Delete monitoring results older than the retention window
    Cleanup(CleanupArgs),

    /// Delete durable metric rows older than the retention window
    PruneMetrics(PruneMetricsArgs),

    /// Query stored metrics
    #[command(subcommand)]
    Metrics(MetricsCommand),

    /// Publish a single metric through the pipeline
    Publish(PublishArgs),

    /// Print live dashboard events until interrupted
    Watch(WatchArgs),
}

/// Subcommands for `pulsewire metrics`.
#[derive(Subcommand, Debug)]
pub enum MetricsCommand {
    /// List metric rows in a window, newest first
    List(ListArgs),
    /// Count, average, extremes and deviation of one metric
    Aggregate(AggregateArgs),
    /// Per-metric average, max and min over the last 24 hours
    Health,
    /// Endpoint, check and alert counts for a window
    Summary(WindowArgs),
    /// Row counts per tag value for one metric
    Outcomes(OutcomesArgs),
}

/// Arguments for `pulsewire cleanup`.
#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// Retention window in days [default: `[retention] results_days`]
    #[arg(long)]
    pub days: Option<u32>,

    /// Rows deleted per transaction [default: `[retention] batch_size`]
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Report how many rows would be deleted without deleting them
    #[arg(long)]
    pub dry_run: bool,
}

impl CleanupArgs {
    /// Flags win over the `[retention]` section.
    #[must_use]
    pub fn request(&self, retention: &RetentionConfig) -> CleanupRequest {
        CleanupRequest {
            retention_days: self.days.unwrap_or(retention.results_days),
            batch_size: self.batch_size.unwrap_or(retention.batch_size),
            dry_run: self.dry_run,
        }
    }
}

/// Arguments for `pulsewire prune-metrics`.
#[derive(Args, Debug)]
pub struct PruneMetricsArgs {
    /// Retention window in days [default: `[retention] metrics_days`]
    #[arg(long)]
    pub days: Option<u32>,
}

impl PruneMetricsArgs {
    #[must_use]
    pub fn days(&self, retention: &RetentionConfig) -> u32 {
        self.days.unwrap_or(retention.metrics_days)
    }
}

/// Time window shared by the read commands.
///
/// Bounds accept RFC 3339 instants or a relative age such as `30m`, `24h`
/// or `7d` measured back from now.
#[derive(Args, Debug, Clone)]
pub struct WindowArgs {
    /// Window start [default: 24h ago]
    #[arg(long, value_parser = parse_instant)]
    pub from: Option<DateTime<Utc>>,

    /// Window end [default: now]
    #[arg(long, value_parser = parse_instant)]
    pub to: Option<DateTime<Utc>>,
}

impl WindowArgs {
    /// Resolve the window against `now`.
    #[must_use]
    pub fn resolve(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let end = self.to.unwrap_or(now);
        let start = self.from.unwrap_or(end - Duration::hours(24));
        (start, end)
    }
}

/// Arguments for `pulsewire metrics list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Only rows with this metric name
    #[arg(long)]
    pub name: Option<String>,
}

/// Arguments for `pulsewire metrics aggregate`.
#[derive(Args, Debug)]
pub struct AggregateArgs {
    /// Metric name
    #[arg(long)]
    pub name: String,

    #[command(flatten)]
    pub window: WindowArgs,
}

/// Arguments for `pulsewire metrics outcomes`.
#[derive(Args, Debug)]
pub struct OutcomesArgs {
    /// Metric name
    #[arg(long)]
    pub name: String,

    /// Tag whose values are counted
    #[arg(long, default_value = "status")]
    pub tag: String,

    #[command(flatten)]
    pub window: WindowArgs,
}

/// Arguments for `pulsewire publish`.
#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Metric name
    #[arg(long)]
    pub name: String,

    /// Measured value
    #[arg(long, allow_negative_numbers = true)]
    pub value: f64,

    /// Metric kind [gauge, counter, timer, histogram]
    #[arg(long, default_value = "gauge")]
    pub kind: MetricKind,

    /// Tag as key=value (repeatable)
    #[arg(long = "tag", value_parser = parse_tag)]
    pub tags: Vec<(String, String)>,

    /// Free-form description stored with the row
    #[arg(long)]
    pub description: Option<String>,
}

/// Arguments for `pulsewire watch`.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Feed address, overriding `[connection] url`
    #[arg(long)]
    pub url: Option<String>,
}

/// Parse an RFC 3339 instant or a relative age (`90s`, `30m`, `24h`, `7d`).
///
/// # Errors
///
/// Returns a message clap shows next to the offending argument.
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>, String> {
    parse_instant_at(value, Utc::now())
}

pub(crate) fn parse_instant_at(value: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, String> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }

    let split = value.char_indices().last().map_or(0, |(at, _)| at);
    let (amount, unit) = value.split_at(split);
    let amount: i64 = amount
        .parse()
        .map_err(|_| format!("expected RFC 3339 time or age like 24h, got '{value}'"))?;
    let age = match unit {
        "s" => Duration::try_seconds(amount),
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        _ => return Err(format!("unknown age unit in '{value}' (use s, m, h or d)")),
    };
    age.and_then(|age| now.checked_sub_signed(age))
        .ok_or_else(|| format!("age '{value}' is out of range"))
}

/// Parse a `key=value` tag.
///
/// # Errors
///
/// Returns a message when `=` is missing or the key is empty.
pub fn parse_tag(value: &str) -> Result<(String, String), String> {
    let (key, tag) = value
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{value}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("tag key is empty in '{value}'"));
    }
    Ok((key.to_string(), tag.trim().to_string()))
}
