//! CLI command handlers.

mod heartbeat;
mod report;

pub(crate) use heartbeat::{cmd_heartbeat, HeartbeatArgs};
