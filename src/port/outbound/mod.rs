//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the metric stream, the durable metric store,
//! the monitoring collaborators, the raw results table, and the transport
//! under the connection manager.

pub mod monitoring;
pub mod results;
pub mod store;
pub mod stream;
pub mod transport;
