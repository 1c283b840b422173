//! SQLite persistence adapters.
//!
//! Provides SQLite-backed implementations for the durable metric store,
//! the monitoring summary sub-counts, and the raw results table using
//! Diesel ORM.

pub mod database;
pub mod metric_store;
pub mod monitoring;
pub mod results;

pub use database::connection::{create_pool, run_migrations, DbPool};
pub use metric_store::SqliteMetricStore;
pub use monitoring::SqliteMonitoringSource;
pub use results::SqliteResultsStore;
