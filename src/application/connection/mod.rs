//! Resilient dashboard connection.
//!
//! - [`ConnectionManager`] - Cloneable handle; owns nothing but channels
//! - [`driver`] - The single task that owns transport, queue and timers
//! - [`registry`] - Subscriber callbacks keyed by event kind
//! - [`backoff`] - Reconnect delay schedule

pub mod backoff;
mod driver;
mod manager;
pub mod registry;

use std::time::Duration;

pub use manager::ConnectionManager;
pub use registry::Subscription;

/// Timing and retry policy for a [`ConnectionManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Deadline for one handshake; the attempt is abandoned after it.
    pub connect_timeout: Duration,
    /// How long an intentional close waits for the peer's acknowledgment.
    pub close_grace: Duration,
    /// Keep-alive period while open.
    pub heartbeat_interval: Duration,
    /// Delay before the first reconnect attempt; doubles per attempt.
    pub backoff_base: Duration,
    /// Reconnect attempts before giving up until a manual connect.
    pub max_reconnect_attempts: u32,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            close_grace: Duration::from_secs(2),
            heartbeat_interval: Duration::from_secs(30),
            backoff_base: Duration::from_secs(1),
            max_reconnect_attempts: 5,
        }
    }
}
