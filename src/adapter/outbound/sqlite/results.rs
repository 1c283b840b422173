//! Batched access to the raw `monitoring_results` table.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use tracing::trace;

use super::database::connection::{write_connection, DbPool};
use super::database::model::encode_time;
use super::database::schema::monitoring_results;
use crate::error::Result;
use crate::port::outbound::results::ResultsStore;

/// Raw check results in SQLite.
pub struct SqliteResultsStore {
    pool: DbPool,
}

impl SqliteResultsStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ResultsStore for SqliteResultsStore {
    fn count_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut conn = self.pool.get()?;
        let n: i64 = monitoring_results::table
            .filter(monitoring_results::created_at.lt(encode_time(cutoff)))
            .count()
            .get_result(&mut conn)?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    fn delete_batch_created_before(&self, cutoff: DateTime<Utc>, limit: usize) -> Result<u64> {
        let cutoff = encode_time(cutoff);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut conn = write_connection(&self.pool)?;

        let deleted = conn.transaction(|conn| {
            let ids: Vec<i64> = monitoring_results::table
                .filter(monitoring_results::created_at.lt(&cutoff))
                .order(monitoring_results::id.asc())
                .limit(limit)
                .select(monitoring_results::id)
                .load(conn)?;

            if ids.is_empty() {
                return Ok(0);
            }

            diesel::delete(monitoring_results::table.filter(monitoring_results::id.eq_any(ids)))
                .execute(conn)
        })?;

        trace!(deleted, "Deleted monitoring results batch");
        Ok(deleted as u64)
    }
}
