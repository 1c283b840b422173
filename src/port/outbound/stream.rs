//! Append-only metric stream port.

use crate::domain::metric::{MetricEntry, NewMetric, StreamId};
use crate::error::Result;

/// Append-only, id-ordered log of metric entries.
///
/// Implementations trim themselves to an approximate maximum length; there
/// is no delete-by-id and callers must not rely on exact trim boundaries.
pub trait MetricStream: Send + Sync {
    /// Append an entry and return its store-assigned, strictly increasing id.
    fn append(&self, metric: &NewMetric) -> Result<StreamId>;

    /// Up to `limit` entries, newest first.
    fn read_recent(&self, limit: usize) -> Result<Vec<MetricEntry>>;
}
