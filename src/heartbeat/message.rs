//! Heartbeat request/response records.
//!
//! Pure data shaping: no I/O and no knowledge of the transport. The request
//! is built from caller-supplied integers as-is (zero and negative values
//! included); the response is read permissively from a decoded CBOR map.

use ciborium::value::{Integer, Value};
use serde::Serialize;

/// Wire-schema revision sent in every heartbeat.
pub const PROTOCOL_VERSION: u8 = 1;

/// Key names shared with the management server.
pub const KEY_DESIRED_FIRMWARE: &str = "desired_firmware";
pub const KEY_CHECKIN_INTERVAL: &str = "checkin_interval";

/// One device's check-in announcement.
///
/// Fields are private so the record cannot be altered after
/// [`build_request`] returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeartbeatRequest {
    device_id: i64,
    current_firmware: i64,
    protocol_version: u8,
}

impl HeartbeatRequest {
    pub fn device_id(&self) -> i64 {
        self.device_id
    }

    pub fn current_firmware(&self) -> i64 {
        self.current_firmware
    }

    pub fn protocol_version(&self) -> u8 {
        self.protocol_version
    }
}

/// Build the outbound heartbeat record.
pub fn build_request(device_id: i64, current_firmware: i64) -> HeartbeatRequest {
    HeartbeatRequest {
        device_id,
        current_firmware,
        protocol_version: PROTOCOL_VERSION,
    }
}

/// The server's reply to a successful heartbeat.
///
/// Both fields hold the raw decoded value when the key is present and not
/// `null`. No type coercion happens here: a text value where an integer was
/// expected is kept as text, and the `*_int` accessors return `None` for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeartbeatResponse {
    desired_firmware: Option<Value>,
    checkin_interval: Option<Value>,
    extra: Vec<(Value, Value)>,
}

impl HeartbeatResponse {
    /// Raw `desired_firmware` value, if the server sent one.
    pub fn desired_firmware(&self) -> Option<&Value> {
        self.desired_firmware.as_ref()
    }

    /// Raw `checkin_interval` value, if the server sent one.
    pub fn checkin_interval(&self) -> Option<&Value> {
        self.checkin_interval.as_ref()
    }

    /// `desired_firmware` as an integer; `None` when absent or not an integer.
    pub fn desired_firmware_int(&self) -> Option<i64> {
        self.desired_firmware.as_ref().and_then(value_as_i64)
    }

    /// `checkin_interval` in seconds; `None` when absent or not an integer.
    pub fn checkin_interval_int(&self) -> Option<i64> {
        self.checkin_interval.as_ref().and_then(value_as_i64)
    }

    /// Map entries that were not one of the modeled keys, in wire order.
    pub fn extra_fields(&self) -> &[(Value, Value)] {
        &self.extra
    }

    /// Number of map entries that were not one of the modeled keys.
    pub fn ignored_keys(&self) -> usize {
        self.extra.len()
    }
}

/// Read the heartbeat response fields out of a decoded CBOR map.
///
/// Missing keys and `null` values both yield an absent field. Unknown keys
/// (including non-text keys) are kept aside in [`HeartbeatResponse::extra_fields`]
/// and have no effect on the modeled fields. If a modeled key repeats, the
/// last occurrence wins.
pub fn interpret_response(entries: &[(Value, Value)]) -> HeartbeatResponse {
    let mut response = HeartbeatResponse::default();

    for (key, value) in entries {
        let slot = match key.as_text() {
            Some(KEY_DESIRED_FIRMWARE) => &mut response.desired_firmware,
            Some(KEY_CHECKIN_INTERVAL) => &mut response.checkin_interval,
            _ => {
                response.extra.push((key.clone(), value.clone()));
                continue;
            }
        };
        *slot = if value.is_null() {
            None
        } else {
            Some(value.clone())
        };
    }

    response
}

fn value_as_i64(value: &Value) -> Option<i64> {
    value
        .as_integer()
        .and_then(|i: Integer| i64::try_from(i).ok())
}
