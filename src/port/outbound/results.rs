//! Raw monitoring-results table, as seen by the retention sweeper.

use chrono::{DateTime, Utc};

use crate::error::Result;

pub trait ResultsStore: Send + Sync {
    /// Rows created before `cutoff`.
    fn count_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Delete up to `limit` of the lowest-id rows created before `cutoff`
    /// in one transaction. Returns the count deleted; zero means done.
    fn delete_batch_created_before(&self, cutoff: DateTime<Utc>, limit: usize) -> Result<u64>;
}
