//! Wire frames exchanged with the dashboard feed.
//!
//! Every frame is a JSON object with a `type` field: `"ping"` for heartbeat
//! traffic, or the wire name of a domain [`EventKind`]. Anything else is a
//! parse error; the connection stays up either way.

use serde_json::{json, Value};

use super::connection::EventKind;
use crate::error::ConnectionError;

/// Wire name of the heartbeat frame.
pub const PING: &str = "ping";

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Heartbeat acknowledgment. Inert.
    Ping,
    /// Domain event to dispatch to subscribers of `kind`.
    Event { kind: EventKind, payload: Value },
}

/// Decode a text frame.
///
/// # Errors
///
/// Returns [`ConnectionError::Parse`] for invalid JSON, non-object payloads,
/// a missing or non-string `type`, and unknown or locally reserved kinds.
pub fn parse_frame(text: &str) -> Result<InboundFrame, ConnectionError> {
    let payload: Value =
        serde_json::from_str(text).map_err(|e| ConnectionError::Parse(e.to_string()))?;

    let kind = payload
        .as_object()
        .ok_or_else(|| ConnectionError::Parse("frame is not a JSON object".into()))?
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ConnectionError::Parse("frame has no string 'type' field".into()))?;

    if kind == PING {
        return Ok(InboundFrame::Ping);
    }

    match kind.parse::<EventKind>() {
        Ok(kind) if kind.is_domain() => Ok(InboundFrame::Event { kind, payload }),
        Ok(kind) => Err(ConnectionError::Parse(format!(
            "'{kind}' is reserved for local events"
        ))),
        Err(reason) => Err(ConnectionError::Parse(reason)),
    }
}

/// The keep-alive frame sent while the connection is open.
#[must_use]
pub fn heartbeat_frame() -> String {
    json!({ "type": PING }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_frames_are_inert() {
        assert_eq!(parse_frame(r#"{"type":"ping"}"#).unwrap(), InboundFrame::Ping);
    }

    #[test]
    fn domain_frames_keep_their_payload() {
        let frame = parse_frame(r#"{"type":"monitoring_result","endpoint_id":7,"status_code":200}"#)
            .unwrap();
        match frame {
            InboundFrame::Event { kind, payload } => {
                assert_eq!(kind, EventKind::MonitoringResult);
                assert_eq!(payload["endpoint_id"], 7);
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            parse_frame("{not json"),
            Err(ConnectionError::Parse(_))
        ));
    }

    #[test]
    fn frames_without_type_are_rejected() {
        assert!(matches!(
            parse_frame(r#"{"endpoint_id":7}"#),
            Err(ConnectionError::Parse(_))
        ));
        assert!(matches!(parse_frame("[1,2]"), Err(ConnectionError::Parse(_))));
    }

    #[test]
    fn unknown_and_reserved_kinds_are_rejected() {
        assert!(parse_frame(r#"{"type":"surprise"}"#).is_err());
        assert!(parse_frame(r#"{"type":"connected"}"#).is_err());
    }

    #[test]
    fn heartbeat_frame_parses_as_ping() {
        assert_eq!(parse_frame(&heartbeat_frame()).unwrap(), InboundFrame::Ping);
    }
}
