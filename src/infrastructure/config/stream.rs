//! Metric stream configuration.

use serde::Deserialize;

use crate::adapter::outbound::memory::stream::{DEFAULT_MAX_LEN, DEFAULT_TRIM_SLACK};

#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Approximate number of entries retained.
    #[serde(default = "default_max_len")]
    pub max_len: usize,
    /// Entries tolerated past `max_len` before a trim.
    #[serde(default = "default_trim_slack")]
    pub trim_slack: usize,
}

fn default_max_len() -> usize {
    DEFAULT_MAX_LEN
}

fn default_trim_slack() -> usize {
    DEFAULT_TRIM_SLACK
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_len: default_max_len(),
            trim_slack: default_trim_slack(),
        }
    }
}
