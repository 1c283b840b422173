//! Dashboard connection configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::application::connection::ConnectionOptions;

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Dashboard feed address (`ws://` or `wss://`).
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Wait for a close acknowledgment before tearing down (milliseconds).
    #[serde(default = "default_close_grace_ms")]
    pub close_grace_ms: u64,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Delay before the first reconnect; doubles per attempt (milliseconds).
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

fn default_url() -> String {
    "ws://127.0.0.1:8080/ws".into()
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_close_grace_ms() -> u64 {
    2000
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            close_grace_ms: default_close_grace_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            backoff_base_ms: default_backoff_base_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

impl From<&ConnectionConfig> for ConnectionOptions {
    fn from(config: &ConnectionConfig) -> Self {
        Self {
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            close_grace: Duration::from_millis(config.close_grace_ms),
            heartbeat_interval: Duration::from_millis(config.heartbeat_interval_ms),
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            max_reconnect_attempts: config.max_reconnect_attempts,
        }
    }
}
