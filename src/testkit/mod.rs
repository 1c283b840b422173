//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`transport`] - `ScriptedConnector`, a [`Connector`](crate::port::Connector)
//!   whose handshakes follow a script and whose links are driven from the test.
//! - [`store`] - In-memory and failing doubles for the storage ports.
//! - [`events`] - Event capture for connection subscribers.

pub mod events;
pub mod store;
pub mod transport;
