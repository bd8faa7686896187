//! Human-readable rendering of a heartbeat exchange.

use std::fmt::Write;

use ciborium::value::Value;

use coap_heartbeat::exchange::ExchangeOutcome;
use coap_heartbeat::heartbeat::{
    HeartbeatRequest, HeartbeatResponse, KEY_CHECKIN_INTERVAL, KEY_DESIRED_FIRMWARE,
};
use coap_heartbeat::transport::Endpoint;

const RULE_WIDTH: usize = 50;

pub(crate) fn banner(endpoint: &Endpoint, device_id: i64, current_firmware: i64) -> String {
    format!(
        "CoAP Device Simulator\nTarget: {}\nDevice ID: {}\nCurrent Firmware: {}\n{}\n",
        endpoint.uri(),
        device_id,
        current_firmware,
        "=".repeat(RULE_WIDTH)
    )
}

pub(crate) fn sending(request: &HeartbeatRequest) -> String {
    format!(
        "[{}] Sending heartbeat for device {} with firmware {}\n\
         Payload: {{device_id: {}, current_firmware: {}, protocol_version: {}}}\n",
        chrono::Local::now().format("%H:%M:%S"),
        request.device_id(),
        request.current_firmware(),
        request.device_id(),
        request.current_firmware(),
        request.protocol_version()
    )
}

pub(crate) fn outcome(outcome: &ExchangeOutcome) -> String {
    let mut out = String::new();
    match outcome {
        ExchangeOutcome::Success(resp) => {
            let desired = describe(resp.desired_firmware());
            let interval = describe(resp.checkin_interval());
            let _ = writeln!(out, "Response code: 2.05 Content");
            let _ = writeln!(out, "Response payload: {}", payload(resp));
            let _ = writeln!(out, "Server wants firmware version: {}", desired);
            let _ = writeln!(out, "Next checkin in: {} seconds", interval);
        }
        ExchangeOutcome::ProtocolError { code, body } => {
            let _ = writeln!(out, "Response code: {}", code);
            let _ = writeln!(out, "Error response: {}", code);
            if let Some(body) = body {
                let _ = writeln!(out, "Error payload: {}", body);
            }
        }
        ExchangeOutcome::TransportError(description) => {
            let _ = writeln!(out, "Error sending heartbeat: {}", description);
        }
    }
    out
}

/// Every entry the server sent: present modeled fields first, then the rest.
fn payload(resp: &HeartbeatResponse) -> String {
    let modeled = [
        (KEY_DESIRED_FIRMWARE, resp.desired_firmware()),
        (KEY_CHECKIN_INTERVAL, resp.checkin_interval()),
    ];
    let entries: Vec<String> = modeled
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| format!("{}: {}", key, describe(Some(v)))))
        .chain(resp.extra_fields().iter().map(|(key, value)| {
            let key = match key {
                Value::Text(name) => name.clone(),
                other => describe(Some(other)),
            };
            format!("{}: {}", key, describe(Some(value)))
        }))
        .collect();
    format!("{{{}}}", entries.join(", "))
}

/// Render a decoded field the way the server sent it; absent prints `none`.
fn describe(value: Option<&Value>) -> String {
    match value {
        None => "none".to_string(),
        Some(Value::Integer(i)) => i128::from(*i).to_string(),
        Some(Value::Text(s)) => format!("{:?}", s),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Float(f)) => f.to_string(),
        Some(other) => format!("{:?}", other),
    }
}
