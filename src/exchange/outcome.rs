//! Result of one heartbeat exchange.

use std::fmt;

use crate::heartbeat::HeartbeatResponse;
use crate::transport::ResponseCode;

/// What happened to a single heartbeat attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    /// The server answered 2.05 Content and the body decoded.
    Success(HeartbeatResponse),

    /// The server answered with any other status.
    ProtocolError {
        code: ResponseCode,
        /// Body text, present only when the body was non-empty. Invalid UTF-8
        /// is replaced, never rejected.
        body: Option<String>,
    },

    /// No usable reply: resolution, socket, timeout, reset, codec or
    /// context lifecycle failure.
    TransportError(String),
}

impl ExchangeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExchangeOutcome::Success(_))
    }

    /// Stable label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ExchangeOutcome::Success(_) => "success",
            ExchangeOutcome::ProtocolError { .. } => "protocol_error",
            ExchangeOutcome::TransportError(_) => "transport_error",
        }
    }

    /// Build a protocol error from a raw reply body.
    pub fn protocol_error(code: ResponseCode, body: &[u8]) -> Self {
        let body = if body.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(body).into_owned())
        };
        ExchangeOutcome::ProtocolError { code, body }
    }
}

impl fmt::Display for ExchangeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeOutcome::Success(resp) => write!(
                f,
                "success (desired_firmware={:?}, checkin_interval={:?})",
                resp.desired_firmware_int(),
                resp.checkin_interval_int()
            ),
            ExchangeOutcome::ProtocolError { code, body: Some(body) } => {
                write!(f, "protocol error {}: {}", code, body)
            }
            ExchangeOutcome::ProtocolError { code, body: None } => {
                write!(f, "protocol error {}", code)
            }
            ExchangeOutcome::TransportError(description) => {
                write!(f, "transport error: {}", description)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_empty_body_is_none() {
        let outcome = ExchangeOutcome::protocol_error(ResponseCode::from_parts(4, 4), &[]);
        assert_eq!(
            outcome,
            ExchangeOutcome::ProtocolError {
                code: ResponseCode::from_parts(4, 4),
                body: None
            }
        );
        assert_eq!(outcome.to_string(), "protocol error 4.04 Not Found");
    }

    #[test]
    fn test_protocol_error_replaces_invalid_utf8() {
        let outcome =
            ExchangeOutcome::protocol_error(ResponseCode::from_parts(5, 0), b"bad \xff body");
        match outcome {
            ExchangeOutcome::ProtocolError { body: Some(body), .. } => {
                assert_eq!(body, "bad \u{fffd} body");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(
            ExchangeOutcome::Success(HeartbeatResponse::default()).kind(),
            "success"
        );
        assert_eq!(
            ExchangeOutcome::TransportError("refused".into()).kind(),
            "transport_error"
        );
        assert!(!ExchangeOutcome::TransportError("refused".into()).is_success());
    }
}
