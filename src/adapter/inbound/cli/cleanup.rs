//! Handlers for `cleanup` and `prune-metrics`.

use serde_json::json;

use super::command::{CleanupArgs, PruneMetricsArgs};
use super::output;
use crate::application::retention::BatchProgress;
use crate::error::Result;
use crate::infrastructure::bootstrap::Services;
use crate::infrastructure::config::retention::RetentionConfig;

/// Delete old monitoring results in batches, reporting each batch.
///
/// Flags left unset come from the `[retention]` section.
///
/// # Errors
///
/// Returns the sweeper error; batches committed before it stay deleted.
pub fn execute_cleanup(
    services: &Services,
    retention: &RetentionConfig,
    args: &CleanupArgs,
) -> Result<()> {
    let request = args.request(retention);

    output::header(env!("CARGO_PKG_VERSION"));
    output::section("Cleaning monitoring results");
    output::field("Retention", format!("{} days", request.retention_days));
    output::field("Batch size", request.batch_size);

    let mut bar = None;
    let on_batch = |progress: &BatchProgress| {
        if output::is_json() {
            output::emit_json_line("batch", json!(progress));
            return;
        }
        let pb = bar.get_or_insert_with(|| output::progress(progress.eligible, "Deleting"));
        pb.set_position(progress.total_deleted);
        if output::verbosity() > 0 {
            pb.println(format!(
                "  batch {}: deleted {} ({} total)",
                progress.batch, progress.deleted, progress.total_deleted
            ));
        }
    };

    let result = services.sweeper.cleanup_results(request, on_batch);
    if let Some(pb) = bar.take() {
        pb.finish_and_clear();
    }
    let report = result?;

    if output::is_json() {
        output::emit_json_line("cleanup", json!(report));
        return Ok(());
    }

    output::field("Cutoff", report.cutoff.to_rfc3339());
    if report.eligible == 0 {
        output::success("No monitoring results to clean up");
    } else if report.dry_run {
        output::success(&format!(
            "Dry run: {} results would be deleted",
            output::highlight(report.eligible)
        ));
    } else {
        output::success(&format!(
            "Deleted {} results in {} batches",
            output::highlight(report.deleted),
            report.batches.len()
        ));
    }
    Ok(())
}

/// Delete durable metric rows past the retention window.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn execute_prune(
    services: &Services,
    retention: &RetentionConfig,
    args: &PruneMetricsArgs,
) -> Result<()> {
    let days = args.days(retention);
    let deleted = services.sweeper.clear_old_metrics(days)?;

    if output::is_json() {
        output::emit_json_line(
            "prune_metrics",
            json!({ "retention_days": days, "deleted": deleted }),
        );
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::success(&format!(
        "Deleted {} metric rows older than {} days",
        output::highlight(deleted),
        days
    ));
    Ok(())
}
