//! Application services (use cases).
//!
//! These services orchestrate domain logic and coordinate adapters
//! to implement the application's use cases.
//!
//! - [`connection`] - Resilient dashboard connection
//! - [`publisher`] - Best-effort metric capture
//! - [`aggregator`] - Dashboard read queries
//! - [`retention`] - Batched cleanup of aged rows

pub mod aggregator;
pub mod connection;
pub mod publisher;
pub mod retention;

pub use aggregator::Aggregator;
pub use connection::{ConnectionManager, ConnectionOptions, Subscription};
pub use publisher::MetricPublisher;
pub use retention::{CleanupReport, CleanupRequest, RetentionSweeper};
