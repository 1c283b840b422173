//! Implementations of ports (hexagonal adapters).
//!
//! - [`inbound`] - Driving adapters (the `pulsewire` CLI)
//! - [`outbound`] - Driven adapters (SQLite, in-memory stream, WebSocket)

pub mod inbound;
pub mod outbound;
