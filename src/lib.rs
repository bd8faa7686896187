//! coap-heartbeat - single-shot CoAP heartbeat exerciser for IoT management servers

pub mod config;
pub mod error;
pub mod exchange;
pub mod heartbeat;
pub mod transport;

pub use config::Config;
pub use error::{HeartbeatSimError, Result};
pub use exchange::{run_heartbeat, ExchangeOutcome, HeartbeatClient};
