//! In-memory metric stream with approximate length trimming.
//!
//! Entries live in a ring buffer guarded by a single lock. Trimming is
//! lazy: the buffer may grow to `max_len + trim_slack` before the oldest
//! entries are dropped in one sweep, so readers never see an exact
//! boundary.

use std::collections::VecDeque;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::trace;

use crate::domain::metric::{MetricEntry, NewMetric, StreamId};
use crate::error::Result;
use crate::port::outbound::stream::MetricStream;

/// Default approximate maximum length.
pub const DEFAULT_MAX_LEN: usize = 1_000_000;

/// Default number of entries allowed past `max_len` before a trim.
pub const DEFAULT_TRIM_SLACK: usize = 1024;

#[derive(Default)]
struct Inner {
    entries: VecDeque<MetricEntry>,
    last_id: Option<StreamId>,
}

/// Bounded append-only stream held in memory.
pub struct MemoryStream {
    inner: Mutex<Inner>,
    max_len: usize,
    trim_slack: usize,
}

impl MemoryStream {
    #[must_use]
    pub fn new(max_len: usize, trim_slack: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_len: max_len.max(1),
            trim_slack,
        }
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Id of the most recently appended entry, even if it was trimmed.
    #[must_use]
    pub fn last_id(&self) -> Option<StreamId> {
        self.inner.lock().last_id
    }

    fn next_id(last: Option<StreamId>) -> StreamId {
        let now = Utc::now().timestamp_millis();
        match last {
            Some(last) => last.successor(now),
            None => StreamId { millis: now, seq: 0 },
        }
    }
}

impl Default for MemoryStream {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LEN, DEFAULT_TRIM_SLACK)
    }
}

impl MetricStream for MemoryStream {
    fn append(&self, metric: &NewMetric) -> Result<StreamId> {
        let mut inner = self.inner.lock();
        let id = Self::next_id(inner.last_id);
        inner.last_id = Some(id);
        inner.entries.push_back(MetricEntry::from_metric(id, metric));

        if inner.entries.len() > self.max_len + self.trim_slack {
            let excess = inner.entries.len() - self.max_len;
            inner.entries.drain(..excess);
            trace!(trimmed = excess, retained = self.max_len, "Trimmed metric stream");
        }

        Ok(id)
    }

    fn read_recent(&self, limit: usize) -> Result<Vec<MetricEntry>> {
        let inner = self.inner.lock();
        Ok(inner.entries.iter().rev().take(limit).cloned().collect())
    }
}
