//! Transport-level request, response and error types.

use std::fmt;
use std::net::IpAddr;

use coap_lite::{MessageClass, ResponseType};
use thiserror::Error;

/// CoAP request method (GET, POST, ...).
pub use coap_lite::RequestType as Method;

// ============================================================================
// Errors
// ============================================================================

/// Failure to complete a request at the transport level.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Host name could not be resolved to a socket address.
    #[error("failed to resolve {host}: {reason}")]
    Resolve { host: String, reason: String },

    /// The CoAP client failed to set up, send or receive (includes ICMP port
    /// unreachable surfacing as connection refused).
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    /// No response arrived in time.
    #[error("timed out: {0}")]
    Timeout(String),

    /// A reply could not be interpreted.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// The context was used after it had been released.
    #[error("transport context already released")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;

// ============================================================================
// Response codes
// ============================================================================

/// A CoAP response code (`c.dd`), stored as the raw code byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResponseCode(u8);

impl ResponseCode {
    /// 2.05 Content: the one status that carries a heartbeat response body.
    pub const CONTENT: ResponseCode = ResponseCode::from_parts(2, 5);

    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    /// Build from class and detail, e.g. `(4, 4)` for 4.04.
    pub const fn from_parts(class: u8, detail: u8) -> Self {
        Self(((class & 0x07) << 5) | (detail & 0x1f))
    }

    pub fn raw(&self) -> u8 {
        self.0
    }

    pub fn class(&self) -> u8 {
        self.0 >> 5
    }

    pub fn detail(&self) -> u8 {
        self.0 & 0x1f
    }

    pub fn is_content(&self) -> bool {
        *self == Self::CONTENT
    }

    /// Whether this byte is a response code at all (classes 2 to 5).
    pub fn is_response(&self) -> bool {
        (2..=5).contains(&self.class())
    }

    /// Registered name of the code, e.g. `Not Found` for 4.04.
    pub fn name(&self) -> Option<String> {
        match MessageClass::from(self.0) {
            MessageClass::Response(ResponseType::UnKnown) => None,
            MessageClass::Response(kind) => Some(spaced(&format!("{:?}", kind))),
            _ => None,
        }
    }
}

/// `NotFound` -> `Not Found`.
fn spaced(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    for (i, c) in ident.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

impl From<ResponseType> for ResponseCode {
    fn from(response_type: ResponseType) -> Self {
        Self(u8::from(MessageClass::Response(response_type)))
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.class(), self.detail())?;
        if let Some(name) = self.name() {
            write!(f, " {}", name)?;
        }
        Ok(())
    }
}

// ============================================================================
// Endpoint / Request / Response
// ============================================================================

/// Target resource of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    /// Resource path without the leading slash, e.g. `hb`.
    pub path: String,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            path: path.into().trim_start_matches('/').to_string(),
        }
    }

    /// `coap://host:port/path`, bracketing IPv6 literals.
    pub fn uri(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("coap://[{}]:{}/{}", self.host, self.port, self.path)
        } else {
            format!("coap://{}:{}/{}", self.host, self.port, self.path)
        }
    }

    /// Whether the host is an IP literal (no Uri-Host option needed).
    pub fn host_is_ip_literal(&self) -> bool {
        self.host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .is_ok()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// An outbound request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub endpoint: Endpoint,
    pub payload: Vec<u8>,
}

impl Request {
    pub fn post(endpoint: Endpoint, payload: Vec<u8>) -> Self {
        Self {
            method: Method::Post,
            endpoint,
            payload,
        }
    }
}

/// A reply delivered by the transport, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub code: ResponseCode,
    pub payload: Vec<u8>,
}

impl Response {
    pub fn new(code: impl Into<ResponseCode>, payload: Vec<u8>) -> Self {
        Self {
            code: code.into(),
            payload,
        }
    }
}
