//! Handler for `publish`.

use serde_json::json;

use super::command::PublishArgs;
use super::output;
use crate::domain::metric::NewMetric;
use crate::error::{Error, Result};
use crate::infrastructure::bootstrap::Services;

/// Build the metric described by the arguments, stamped now.
#[must_use]
pub fn metric_from_args(args: &PublishArgs) -> NewMetric {
    let mut metric = NewMetric::new(&args.name, args.kind, args.value);
    for (key, value) in &args.tags {
        metric = metric.with_tag(key, value);
    }
    if let Some(description) = &args.description {
        metric = metric.with_description(description);
    }
    metric
}

/// Publish one metric through both stores.
///
/// The publisher never fails; a partial write is reported as a warning and
/// a miss on both stores as an error.
///
/// # Errors
///
/// Returns [`Error::Stream`] when neither store accepted the metric.
pub fn execute(services: &Services, args: &PublishArgs) -> Result<()> {
    let metric = metric_from_args(args);
    let outcome = services.publisher.publish(&metric);

    if output::is_json() {
        output::emit_json_line(
            "published",
            json!({
                "metric": metric,
                "stream_id": outcome.stream_id.map(|id| id.to_string()),
                "row_id": outcome.row_id,
            }),
        );
    } else {
        output::header(env!("CARGO_PKG_VERSION"));
        output::field("Metric", output::highlight(&metric.name));
        output::field("Value", metric.value);
        output::field(
            "Stream id",
            outcome
                .stream_id
                .map_or_else(|| "-".to_string(), |id| id.to_string()),
        );
        output::field(
            "Row id",
            outcome
                .row_id
                .map_or_else(|| "-".to_string(), |id| id.to_string()),
        );
    }

    match (outcome.stream_id, outcome.row_id) {
        (Some(_), Some(_)) => {
            output::success("Published");
            Ok(())
        }
        (None, None) => Err(Error::Stream(format!(
            "metric '{}' was not stored",
            metric.name
        ))),
        _ => {
            output::warning("Published to one store only; see the log for the failure");
            Ok(())
        }
    }
}
