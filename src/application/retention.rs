//! Retention sweeps over the durable metric table and raw check results.
//!
//! Raw results are deleted in ascending-id batches, each committed on its
//! own, so a failure part-way leaves earlier batches deleted and readers
//! only ever observe the table shrinking.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, Error, Result};
use crate::port::outbound::results::ResultsStore;
use crate::port::outbound::store::MetricStore;

pub const DEFAULT_RETENTION_DAYS: u32 = 90;
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Parameters of one results cleanup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupRequest {
    pub retention_days: u32,
    pub batch_size: usize,
    pub dry_run: bool,
}

impl Default for CleanupRequest {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_RETENTION_DAYS,
            batch_size: DEFAULT_BATCH_SIZE,
            dry_run: false,
        }
    }
}

/// Progress after one committed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    /// 1-based batch number.
    pub batch: usize,
    pub deleted: u64,
    pub total_deleted: u64,
    /// Rows eligible when the run started.
    pub eligible: u64,
}

/// Outcome of a cleanup run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub cutoff: DateTime<Utc>,
    pub eligible: u64,
    /// Rows deleted; zero for a dry run.
    pub deleted: u64,
    pub dry_run: bool,
    /// Size of each committed batch, in order.
    pub batches: Vec<u64>,
}

impl CleanupReport {
    /// Rows removed, or rows that would be removed for a dry run.
    #[must_use]
    pub const fn affected(&self) -> u64 {
        if self.dry_run {
            self.eligible
        } else {
            self.deleted
        }
    }
}

/// The instant `days` before `now`, clamped to the earliest representable
/// time so an oversized window keeps every row.
#[must_use]
pub fn cutoff(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    Duration::try_days(i64::from(days))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub struct RetentionSweeper {
    metrics: Arc<dyn MetricStore>,
    results: Arc<dyn ResultsStore>,
}

impl RetentionSweeper {
    #[must_use]
    pub fn new(metrics: Arc<dyn MetricStore>, results: Arc<dyn ResultsStore>) -> Self {
        Self { metrics, results }
    }

    /// Delete metric rows created more than `retention_days` ago in one
    /// statement.
    ///
    /// # Errors
    /// Returns the store error; nothing is retried.
    pub fn clear_old_metrics(&self, retention_days: u32) -> Result<u64> {
        self.clear_old_metrics_at(Utc::now(), retention_days)
    }

    /// [`clear_old_metrics`](Self::clear_old_metrics) relative to `now`.
    ///
    /// # Errors
    /// Returns the store error; nothing is retried.
    pub fn clear_old_metrics_at(&self, now: DateTime<Utc>, retention_days: u32) -> Result<u64> {
        let cutoff = cutoff(now, retention_days);
        let deleted = self.metrics.delete_created_before(cutoff)?;
        info!(deleted, retention_days, cutoff = %cutoff, "Cleared old metrics");
        Ok(deleted)
    }

    /// Delete raw check results older than the retention window in batches.
    ///
    /// `progress` is called after each committed batch. A dry run only
    /// counts.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] for a zero batch size, the
    /// count error if counting fails, and [`Error::Cleanup`] carrying the
    /// rows already deleted if a batch fails.
    pub fn cleanup_results<F>(&self, request: CleanupRequest, progress: F) -> Result<CleanupReport>
    where
        F: FnMut(&BatchProgress),
    {
        self.cleanup_results_at(Utc::now(), request, progress)
    }

    /// [`cleanup_results`](Self::cleanup_results) relative to `now`.
    ///
    /// # Errors
    /// See [`cleanup_results`](Self::cleanup_results).
    pub fn cleanup_results_at<F>(
        &self,
        now: DateTime<Utc>,
        request: CleanupRequest,
        mut progress: F,
    ) -> Result<CleanupReport>
    where
        F: FnMut(&BatchProgress),
    {
        if request.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "batch_size",
                reason: "must be greater than 0".into(),
            }
            .into());
        }

        let cutoff = cutoff(now, request.retention_days);
        let eligible = self.results.count_created_before(cutoff)?;
        let mut report = CleanupReport {
            cutoff,
            eligible,
            deleted: 0,
            dry_run: request.dry_run,
            batches: Vec::new(),
        };

        if eligible == 0 {
            info!(cutoff = %cutoff, "No monitoring results to clean up");
            return Ok(report);
        }

        if request.dry_run {
            info!(eligible, cutoff = %cutoff, "Dry run, nothing deleted");
            return Ok(report);
        }

        info!(eligible, batch_size = request.batch_size, cutoff = %cutoff, "Cleaning up monitoring results");
        loop {
            let deleted = match self
                .results
                .delete_batch_created_before(cutoff, request.batch_size)
            {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    warn!(error = %e, deleted = report.deleted, "Cleanup batch failed");
                    return Err(Error::Cleanup {
                        deleted: report.deleted,
                        source: Box::new(e),
                    });
                }
            };

            report.deleted += deleted;
            report.batches.push(deleted);
            let update = BatchProgress {
                batch: report.batches.len(),
                deleted,
                total_deleted: report.deleted,
                eligible,
            };
            debug!(batch = update.batch, deleted, total = report.deleted, "Deleted batch");
            progress(&update);
        }

        info!(deleted = report.deleted, batches = report.batches.len(), "Cleanup complete");
        Ok(report)
    }
}
