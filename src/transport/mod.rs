//! CoAP request/response transport.
//!
//! The exchange coordinator talks to the network only through the
//! [`Transport`] / [`TransportContext`] traits:
//! - [`UdpTransport`]: CoAP over UDP using `coap-lite` packets
//! - test doubles in unit and integration tests

mod context;
mod types;
mod udp;

pub use context::{ContextGuard, Transport, TransportContext};
#[cfg(test)]
pub use context::MockTransport;
pub use types::{Endpoint, Method, Request, Response, ResponseCode, Result, TransportError};
pub use udp::{UdpContext, UdpTransport};
