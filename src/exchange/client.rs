//! Heartbeat exchange coordinator.
//!
//! Runs exactly one request/response exchange: build, encode, open a context,
//! POST to `/hb`, wait for the reply, classify it, release the context. Every
//! failure is folded into an [`ExchangeOutcome`]; nothing is retried.

use tracing::{debug, error, info, warn};

use crate::config::TransportConfig;
use crate::heartbeat::{build_request, decode_response, encode_request};
use crate::transport::{
    ContextGuard, Endpoint, Request, Response, Transport, TransportError, UdpTransport,
};

use super::outcome::ExchangeOutcome;

/// Resource path of the heartbeat endpoint.
pub const HEARTBEAT_PATH: &str = "hb";

/// Issues heartbeats over a [`Transport`], one context per exchange.
pub struct HeartbeatClient<T> {
    transport: T,
}

impl<T: Transport> HeartbeatClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Run one heartbeat exchange against `coap://{host}:{port}/hb`.
    ///
    /// The only suspension points are opening the context and waiting for the
    /// reply. No timeout is applied here; callers wanting a deadline wrap this
    /// future, and the context is still released if it is dropped mid-wait.
    pub async fn run_heartbeat(
        &self,
        host: &str,
        port: u16,
        device_id: i64,
        current_firmware: i64,
    ) -> ExchangeOutcome {
        let request = build_request(device_id, current_firmware);
        let payload = match encode_request(&request) {
            Ok(payload) => payload,
            Err(e) => {
                error!(device_id, "Failed to encode heartbeat: {}", e);
                return ExchangeOutcome::TransportError(e.to_string());
            }
        };

        let endpoint = Endpoint::new(host, port, HEARTBEAT_PATH);
        info!(
            device_id,
            current_firmware,
            uri = %endpoint,
            "Sending heartbeat"
        );
        debug!(bytes = payload.len(), "Encoded heartbeat request");

        let context = match self.transport.open(&endpoint).await {
            Ok(context) => context,
            Err(e) => {
                error!(uri = %endpoint, "Failed to create transport context: {}", e);
                return ExchangeOutcome::TransportError(format!(
                    "failed to create transport context: {}",
                    e
                ));
            }
        };
        let mut guard = ContextGuard::new(context);

        let outcome = match guard.request(&Request::post(endpoint, payload)).await {
            Ok(response) => classify_response(response),
            Err(e) => {
                error!("Heartbeat request failed: {}", e);
                ExchangeOutcome::TransportError(e.to_string())
            }
        };

        let outcome = match guard.close() {
            Ok(()) => outcome,
            Err(e) => release_failed(outcome, e),
        };

        info!(outcome = outcome.kind(), "Heartbeat exchange finished");
        outcome
    }
}

/// Turn a delivered reply into an outcome.
///
/// Only 2.05 Content counts as success. A Content body that does not decode
/// is reported as a transport error, the same as a failed exchange.
pub fn classify_response(response: Response) -> ExchangeOutcome {
    if !response.code.is_content() {
        warn!(code = %response.code, bytes = response.payload.len(), "Heartbeat rejected");
        return ExchangeOutcome::protocol_error(response.code, &response.payload);
    }

    match decode_response(&response.payload) {
        Ok(resp) => {
            if resp.ignored_keys() > 0 {
                debug!(ignored = resp.ignored_keys(), "Ignored unknown response keys");
            }
            ExchangeOutcome::Success(resp)
        }
        Err(e) => {
            error!("Failed to decode heartbeat response: {}", e);
            ExchangeOutcome::TransportError(e.to_string())
        }
    }
}

fn release_failed(outcome: ExchangeOutcome, e: TransportError) -> ExchangeOutcome {
    error!("Failed to release transport context: {}", e);
    match outcome {
        ExchangeOutcome::TransportError(_) => outcome,
        _ => ExchangeOutcome::TransportError(format!(
            "failed to release transport context: {}",
            e
        )),
    }
}

/// Run one heartbeat over CoAP/UDP with the given transport settings.
pub async fn run_heartbeat(
    config: &TransportConfig,
    host: &str,
    port: u16,
    device_id: i64,
    current_firmware: i64,
) -> ExchangeOutcome {
    HeartbeatClient::new(UdpTransport::new(config.clone()))
        .run_heartbeat(host, port, device_id, current_firmware)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heartbeat::decode_value;
    use crate::transport::{Method, MockTransport, ResponseCode, TransportContext};
    use async_trait::async_trait;
    use ciborium::value::Value;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    // ---------------------------------------------------------------
    // Test doubles
    // ---------------------------------------------------------------

    #[derive(Clone)]
    enum Script {
        Reply(Response),
        ConnectionRefused,
        ReleaseFails(Response),
    }

    #[derive(Default)]
    struct Counters {
        opens: AtomicU32,
        releases: AtomicU32,
        sent: Mutex<Vec<Request>>,
    }

    struct ScriptedTransport {
        script: Script,
        counters: Arc<Counters>,
    }

    struct ScriptedContext {
        script: Script,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn open(
            &self,
            _endpoint: &Endpoint,
        ) -> crate::transport::Result<Box<dyn TransportContext>> {
            self.counters.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedContext {
                script: self.script.clone(),
                counters: Arc::clone(&self.counters),
            }))
        }
    }

    #[async_trait]
    impl TransportContext for ScriptedContext {
        async fn request(&mut self, request: &Request) -> crate::transport::Result<Response> {
            self.counters.sent.lock().unwrap().push(request.clone());
            match &self.script {
                Script::Reply(response) | Script::ReleaseFails(response) => Ok(response.clone()),
                Script::ConnectionRefused => Err(TransportError::Io(std::io::Error::from(
                    std::io::ErrorKind::ConnectionRefused,
                ))),
            }
        }

        fn release(&mut self) -> crate::transport::Result<()> {
            self.counters.releases.fetch_add(1, Ordering::SeqCst);
            match self.script {
                Script::ReleaseFails(_) => Err(TransportError::Malformed("shutdown".into())),
                _ => Ok(()),
            }
        }
    }

    fn client(script: Script) -> (HeartbeatClient<ScriptedTransport>, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let transport = ScriptedTransport {
            script,
            counters: Arc::clone(&counters),
        };
        (HeartbeatClient::new(transport), counters)
    }

    fn cbor(entries: Vec<(&str, Value)>) -> Vec<u8> {
        let map = Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (Value::Text(k.to_string()), v))
                .collect(),
        );
        let mut buf = Vec::new();
        ciborium::into_writer(&map, &mut buf).unwrap();
        buf
    }

    // ---------------------------------------------------------------
    // Tests
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn test_success_populates_both_fields() {
        let body = cbor(vec![
            ("desired_firmware", Value::Integer(101.into())),
            ("checkin_interval", Value::Integer(3600.into())),
        ]);
        let (client, counters) = client(Script::Reply(Response::new(ResponseCode::CONTENT, body)));

        let outcome = client.run_heartbeat("localhost", 5683, 1001, 100).await;

        match outcome {
            ExchangeOutcome::Success(resp) => {
                assert_eq!(resp.desired_firmware_int(), Some(101));
                assert_eq!(resp.checkin_interval_int(), Some(3600));
            }
            other => panic!("expected success, got {:?}", other),
        }
        assert_eq!(counters.opens.load(Ordering::SeqCst), 1);
        assert_eq!(counters.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_request_is_post_to_hb_with_cbor_body() {
        let (client, counters) = client(Script::Reply(Response::new(
            ResponseCode::CONTENT,
            cbor(vec![]),
        )));

        client.run_heartbeat("10.0.0.5", 5684, 7, 42).await;

        let sent = counters.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let request = &sent[0];
        assert!(matches!(request.method, Method::Post));
        assert_eq!(request.endpoint.uri(), "coap://10.0.0.5:5684/hb");

        let value = decode_value(&request.payload).unwrap();
        let entries = value.as_map().unwrap();
        let get = |key: &str| {
            entries
                .iter()
                .find(|(k, _)| k.as_text() == Some(key))
                .map(|(_, v)| v.clone())
        };
        assert_eq!(get("device_id"), Some(Value::Integer(7.into())));
        assert_eq!(get("current_firmware"), Some(Value::Integer(42.into())));
        assert_eq!(get("protocol_version"), Some(Value::Integer(1.into())));
    }

    #[tokio::test]
    async fn test_non_content_status_without_body() {
        let code = ResponseCode::from_parts(4, 4);
        let (client, counters) = client(Script::Reply(Response::new(code, vec![])));

        let outcome = client.run_heartbeat("localhost", 5683, 1001, 100).await;

        assert_eq!(outcome, ExchangeOutcome::ProtocolError { code, body: None });
        assert_eq!(counters.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_content_status_with_body_text() {
        let code = ResponseCode::from_parts(5, 0);
        let (client, _) = client(Script::Reply(Response::new(
            code,
            b"Internal server error".to_vec(),
        )));

        let outcome = client.run_heartbeat("localhost", 5683, 1001, 100).await;

        assert_eq!(
            outcome,
            ExchangeOutcome::ProtocolError {
                code,
                body: Some("Internal server error".into())
            }
        );
    }

    #[tokio::test]
    async fn test_changed_is_a_protocol_error() {
        let code = ResponseCode::from_parts(2, 4);
        let (client, _) = client(Script::Reply(Response::new(code, cbor(vec![]))));

        let outcome = client.run_heartbeat("localhost", 5683, 1001, 100).await;
        assert_eq!(outcome.kind(), "protocol_error");
    }

    #[tokio::test]
    async fn test_malformed_content_body_is_transport_error() {
        let (client, counters) = client(Script::Reply(Response::new(
            ResponseCode::CONTENT,
            vec![0xa2, 0x01],
        )));

        let outcome = client.run_heartbeat("localhost", 5683, 1001, 100).await;

        assert_eq!(outcome.kind(), "transport_error");
        assert_eq!(counters.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connection_failure_releases_exactly_once() {
        let (client, counters) = client(Script::ConnectionRefused);

        let outcome = client.run_heartbeat("localhost", 5683, 1001, 100).await;

        match outcome {
            ExchangeOutcome::TransportError(description) => {
                assert!(description.contains("refused"), "got: {}", description);
            }
            other => panic!("expected transport error, got {:?}", other),
        }
        assert_eq!(counters.opens.load(Ordering::SeqCst), 1);
        assert_eq!(counters.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_failure_turns_success_into_transport_error() {
        let (client, counters) = client(Script::ReleaseFails(Response::new(
            ResponseCode::CONTENT,
            cbor(vec![]),
        )));

        let outcome = client.run_heartbeat("localhost", 5683, 1001, 100).await;

        match outcome {
            ExchangeOutcome::TransportError(description) => {
                assert!(description.contains("release"));
            }
            other => panic!("expected transport error, got {:?}", other),
        }
        assert_eq!(counters.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_context_creation_failure() {
        let mut transport = MockTransport::new();
        transport.expect_open().times(1).returning(|endpoint| {
            Err(TransportError::Resolve {
                host: endpoint.host.clone(),
                reason: "no such host".into(),
            })
        });

        let outcome = HeartbeatClient::new(transport)
            .run_heartbeat("nowhere.invalid", 5683, 1001, 100)
            .await;

        match outcome {
            ExchangeOutcome::TransportError(description) => {
                assert!(description.contains("transport context"));
                assert!(description.contains("nowhere.invalid"));
            }
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_deadline_around_exchange_still_releases() {
        struct StalledTransport {
            counters: Arc<Counters>,
        }
        struct StalledContext {
            counters: Arc<Counters>,
        }

        #[async_trait]
        impl Transport for StalledTransport {
            async fn open(
                &self,
                _endpoint: &Endpoint,
            ) -> crate::transport::Result<Box<dyn TransportContext>> {
                Ok(Box::new(StalledContext {
                    counters: Arc::clone(&self.counters),
                }))
            }
        }

        #[async_trait]
        impl TransportContext for StalledContext {
            async fn request(
                &mut self,
                _request: &Request,
            ) -> crate::transport::Result<Response> {
                std::future::pending::<crate::transport::Result<Response>>().await
            }

            fn release(&mut self) -> crate::transport::Result<()> {
                self.counters.releases.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let counters = Arc::new(Counters::default());
        let client = HeartbeatClient::new(StalledTransport {
            counters: Arc::clone(&counters),
        });

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            client.run_heartbeat("localhost", 5683, 1001, 100),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(counters.releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_classify_content_with_extra_keys() {
        let body = cbor(vec![
            ("desired_firmware", Value::Integer(105.into())),
            ("server_note", Value::Text("hi".into())),
        ]);
        match classify_response(Response::new(ResponseCode::CONTENT, body)) {
            ExchangeOutcome::Success(resp) => {
                assert_eq!(resp.desired_firmware_int(), Some(105));
                assert!(resp.checkin_interval().is_none());
            }
            other => panic!("expected success, got {:?}", other),
        }
    }
}
