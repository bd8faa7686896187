//! Exchange coordinator - owns the lifecycle of one heartbeat exchange.

mod client;
mod outcome;

pub use client::{classify_response, run_heartbeat, HeartbeatClient, HEARTBEAT_PATH};
pub use outcome::ExchangeOutcome;
