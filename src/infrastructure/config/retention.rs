//! Retention defaults for the cleanup commands.

use serde::Deserialize;

use crate::application::retention::{DEFAULT_BATCH_SIZE, DEFAULT_RETENTION_DAYS};

#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    /// Age in days after which metric rows are pruned.
    #[serde(default = "default_days")]
    pub metrics_days: u32,
    /// Age in days after which raw check results are pruned.
    #[serde(default = "default_days")]
    pub results_days: u32,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            metrics_days: default_days(),
            results_days: default_days(),
            batch_size: default_batch_size(),
        }
    }
}
