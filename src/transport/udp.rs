//! CoAP over UDP client transport.
//!
//! Each [`UdpContext`] owns one [`UdpCoAPClient`] aimed at the resolved peer.
//! Confirmable delivery, retransmission, separate responses and block-wise
//! transfer are handled by the client. This module builds the request, bounds
//! the wait and hands back the reply code and body.

use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use coap::UdpCoAPClient;
use coap_lite::{CoapOption, CoapRequest, ContentFormat, MessageType};
use tracing::{debug, info};

use crate::config::TransportConfig;

use super::context::{Transport, TransportContext};
use super::types::{Endpoint, Request, Response, ResponseCode, Result, TransportError};

/// Creates one CoAP client per exchange.
#[derive(Debug, Clone, Default)]
pub struct UdpTransport {
    config: TransportConfig,
}

impl UdpTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn TransportContext>> {
        let peer = resolve(endpoint).await?;
        let client = UdpCoAPClient::new_udp(peer).await?;
        debug!(peer = %peer, "Opened CoAP transport context");

        Ok(Box::new(UdpContext {
            client: Some(client),
            peer,
            config: self.config.clone(),
        }))
    }
}

async fn resolve(endpoint: &Endpoint) -> Result<SocketAddr> {
    let host = endpoint.host.trim_start_matches('[').trim_end_matches(']');
    let mut addrs = tokio::net::lookup_host((host, endpoint.port))
        .await
        .map_err(|e| TransportError::Resolve {
            host: endpoint.host.clone(),
            reason: e.to_string(),
        })?;
    addrs.next().ok_or_else(|| TransportError::Resolve {
        host: endpoint.host.clone(),
        reason: "no addresses found".into(),
    })
}

/// An open CoAP client session.
pub struct UdpContext {
    client: Option<UdpCoAPClient>,
    peer: SocketAddr,
    config: TransportConfig,
}

#[async_trait]
impl TransportContext for UdpContext {
    async fn request(&mut self, request: &Request) -> Result<Response> {
        let client = self.client.as_ref().ok_or(TransportError::Closed)?;

        info!(
            method = ?request.method,
            uri = %request.endpoint.uri(),
            peer = %self.peer,
            bytes = request.payload.len(),
            "Sending CoAP request"
        );

        let limit = self.config.response_timeout();
        let reply = match tokio::time::timeout(limit, client.send(build_request(request))).await
        {
            Ok(reply) => reply.map_err(from_client_error)?,
            Err(_) => {
                return Err(TransportError::Timeout(format!(
                    "no response within {}s",
                    limit.as_secs_f32()
                )))
            }
        };

        let code = ResponseCode::from_raw(u8::from(reply.message.header.code));
        if !code.is_response() {
            return Err(TransportError::Malformed(format!(
                "reply carries non-response code {}",
                code
            )));
        }
        debug!(code = %code, bytes = reply.message.payload.len(), "Received CoAP response");
        Ok(Response::new(code, reply.message.payload))
    }

    fn release(&mut self) -> Result<()> {
        match self.client.take() {
            Some(client) => {
                drop(client);
                debug!(peer = %self.peer, "Closed CoAP transport context");
                Ok(())
            }
            None => Err(TransportError::Closed),
        }
    }
}

/// Confirmable request for `request.endpoint`, CBOR-tagged when it has a body.
fn build_request(request: &Request) -> CoapRequest<SocketAddr> {
    let mut coap_request: CoapRequest<SocketAddr> = CoapRequest::new();
    coap_request.message.header.set_type(MessageType::Confirmable);
    coap_request.set_method(request.method);

    let endpoint = &request.endpoint;
    if !endpoint.host_is_ip_literal() {
        coap_request
            .message
            .add_option(CoapOption::UriHost, endpoint.host.as_bytes().to_vec());
    }
    coap_request.set_path(&endpoint.path);

    if !request.payload.is_empty() {
        coap_request
            .message
            .set_content_format(ContentFormat::ApplicationCBOR);
    }
    coap_request.message.payload = request.payload.clone();
    coap_request
}

fn from_client_error(e: io::Error) -> TransportError {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
            TransportError::Timeout(e.to_string())
        }
        _ => TransportError::Io(e),
    }
}
