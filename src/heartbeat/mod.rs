//! Heartbeat message builder - request construction and response interpretation.

mod codec;
mod message;

pub use codec::{decode_response, decode_value, encode_request, HeartbeatError};
pub use message::{
    build_request, interpret_response, HeartbeatRequest, HeartbeatResponse,
    KEY_CHECKIN_INTERVAL, KEY_DESIRED_FIRMWARE, PROTOCOL_VERSION,
};
