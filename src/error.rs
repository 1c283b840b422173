use std::time::Duration;

use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

/// Failures on the connection-liveness path.
///
/// Cloned freely: one handshake outcome resolves every pending `connect()`
/// caller and is also delivered to `error` subscribers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Handshake failure, abrupt close, or a wire-level protocol error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Connect or close exceeded its deadline.
    #[error("{operation} timed out after {}ms", after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The reconnect ceiling was reached; only a manual `connect()` resumes.
    #[error("failed to reconnect after {attempts} attempts")]
    ExhaustedRetries { attempts: u32 },

    /// An inbound frame could not be interpreted. The connection stays open.
    #[error("invalid message format: {0}")]
    Parse(String),

    /// A pending handshake was abandoned by an intentional disconnect.
    #[error("connection attempt cancelled by disconnect")]
    Cancelled,

    /// The connection driver has stopped.
    #[error("connection manager is shut down")]
    Shutdown,
}

impl ConnectionError {
    /// True for errors that feed the reconnect policy.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout { .. } | Self::Parse(_))
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("parse error: {0}")]
    Parse(String),

    /// A read-side query failed; composed results are never partial.
    #[error("{query} query failed: {source}")]
    Aggregate {
        query: &'static str,
        #[source]
        source: Box<Error>,
    },

    /// A retention batch failed; batches committed before it stay deleted.
    #[error("cleanup aborted after deleting {deleted} rows: {source}")]
    Cleanup {
        deleted: u64,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap a failed sub-query of a composed read.
    #[must_use]
    pub fn aggregate(query: &'static str, source: Self) -> Self {
        Self::Aggregate {
            query,
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<tokio_tungstenite::tungstenite::Error> for ConnectionError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ConnectionError::Transport(err.to_string())
    }
}

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        Error::Database(err.to_string())
    }
}

impl From<diesel::r2d2::PoolError> for Error {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        Error::Pool(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_includes_operation_and_millis() {
        let err = ConnectionError::Timeout {
            operation: "connect",
            after: Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "connect timed out after 5000ms");
    }

    #[test]
    fn exhausted_retries_is_not_recoverable() {
        assert!(!ConnectionError::ExhaustedRetries { attempts: 5 }.is_recoverable());
        assert!(ConnectionError::Transport("reset".into()).is_recoverable());
        assert!(ConnectionError::Parse("bad".into()).is_recoverable());
    }

    #[test]
    fn aggregate_error_wraps_source() {
        let err = Error::aggregate("endpoints_total", Error::Database("locked".into()));
        assert_eq!(
            err.to_string(),
            "endpoints_total query failed: database error: locked"
        );
    }

    #[test]
    fn cleanup_error_reports_partial_progress() {
        let err = Error::Cleanup {
            deleted: 2000,
            source: Box::new(Error::Database("disk full".into())),
        };
        assert!(err.to_string().contains("2000"));
    }
}
