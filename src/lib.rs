//! Pulsewire - real-time event delivery for endpoint uptime monitoring.
//!
//! The crate captures operational metrics into two stores and keeps a
//! resilient live channel open to the dashboard feed.
//!
//! # Architecture
//!
//! - **Publish path** - [`application::MetricPublisher`] writes every metric
//!   to an append-only stream (realtime panels) and a durable SQL table
//!   (history). Storage failures are logged and never reach the caller.
//! - **Read path** - [`application::Aggregator`] answers list, statistics,
//!   24h health and monitoring summary queries from the durable table.
//! - **Retention** - [`application::RetentionSweeper`] deletes aged rows,
//!   monitoring results in bounded batches with per-batch progress.
//! - **Live channel** - [`application::ConnectionManager`] owns one
//!   WebSocket connection with exponential backoff, heartbeat, an outbound
//!   queue and typed subscriber callbacks.
//!
//! # Modules
//!
//! - [`domain`] - Metric, aggregate and connection vocabulary
//! - [`port`] - Storage and transport seams
//! - [`adapter`] - SQLite, in-memory stream, WebSocket, CLI
//! - [`application`] - The services above
//! - [`infrastructure`] - Configuration and wiring
//! - [`error`] - Error types for the crate
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pulsewire::adapter::outbound::websocket::WsConnector;
//! use pulsewire::application::{ConnectionManager, ConnectionOptions};
//! use pulsewire::domain::EventKind;
//!
//! # async fn demo() -> Result<(), pulsewire::error::ConnectionError> {
//! let manager = ConnectionManager::new(Arc::new(WsConnector::new()), ConnectionOptions::default());
//! let _alerts = manager.subscribe(EventKind::AlertTriggered, |event| {
//!     println!("{}", event.to_json());
//! });
//! manager.connect("wss://dashboard.example.com/ws").await?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
