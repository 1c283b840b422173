//! Connection state machine vocabulary and the events it emits.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::ConnectionError;

/// Lifecycle state of the dashboard connection.
///
/// ```text
/// Closed ──connect──▶ Connecting ──handshake ok──▶ Open
///   ▲  ▲                   │                        │ │
///   │  └──reconnect timer──┘◀─────abrupt close──────┘ │
///   │                                                 │ disconnect
///   └──────────ack or grace timeout◀───── Closing ◀───┘
///
/// Closed ──retry ceiling──▶ RetriesExhausted ──manual connect──▶ Connecting
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Closed,
    Connecting,
    Open,
    Closing,
    RetriesExhausted,
}

impl ConnectionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::RetriesExhausted => "retries_exhausted",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable snapshot of the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub address: Option<String>,
    pub reconnect_attempts: u32,
    pub queued: usize,
}

/// Event kinds subscribers can register for.
///
/// The first three are produced locally by the connection manager; the rest
/// arrive from the server as frames tagged with the kind's wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Connected,
    Disconnected,
    Error,
    MonitoringResult,
    Metric,
    AlertTriggered,
}

impl EventKind {
    pub const ALL: [Self; 6] = [
        Self::Connected,
        Self::Disconnected,
        Self::Error,
        Self::MonitoringResult,
        Self::Metric,
        Self::AlertTriggered,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
            Self::MonitoringResult => "monitoring_result",
            Self::Metric => "metric",
            Self::AlertTriggered => "alert_triggered",
        }
    }

    /// Kinds the server may push over the wire.
    #[must_use]
    pub const fn is_domain(self) -> bool {
        matches!(
            self,
            Self::MonitoringResult | Self::Metric | Self::AlertTriggered
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown event kind '{s}'"))
    }
}

/// Event delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Connected {
        address: String,
        at: DateTime<Utc>,
    },
    Disconnected {
        at: DateTime<Utc>,
    },
    Error(ConnectionError),
    Message {
        kind: EventKind,
        payload: Value,
    },
}

impl ConnectionEvent {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Connected { .. } => EventKind::Connected,
            Self::Disconnected { .. } => EventKind::Disconnected,
            Self::Error(_) => EventKind::Error,
            Self::Message { kind, .. } => *kind,
        }
    }

    /// JSON view used by the CLI `watch` command.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Connected { address, at } => serde_json::json!({
                "type": "connected",
                "address": address,
                "timestamp": at.to_rfc3339(),
            }),
            Self::Disconnected { at } => serde_json::json!({
                "type": "disconnected",
                "timestamp": at.to_rfc3339(),
            }),
            Self::Error(err) => serde_json::json!({
                "type": "error",
                "message": err.to_string(),
            }),
            Self::Message { payload, .. } => payload.clone(),
        }
    }
}
