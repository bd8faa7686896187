//! Heartbeat command - one exchange, reported on stdout.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

use coap_heartbeat::config::Config;
use coap_heartbeat::exchange::{ExchangeOutcome, HeartbeatClient, HEARTBEAT_PATH};
use coap_heartbeat::heartbeat::build_request;
use coap_heartbeat::transport::{Endpoint, UdpTransport};

use super::report;

/// Parsed invocation arguments.
#[derive(Debug, Clone)]
pub(crate) struct HeartbeatArgs {
    pub host: String,
    pub port: u16,
    pub device_id: Option<i64>,
    pub current_firmware: Option<i64>,
    pub timeout_secs: Option<u64>,
    pub config_path: Option<PathBuf>,
}

pub(crate) async fn cmd_heartbeat(args: HeartbeatArgs) -> Result<()> {
    let config = match args.config_path.as_deref() {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => Config::load().with_context(|| "Failed to load configuration")?,
    };

    let device_id = args.device_id.unwrap_or(config.defaults.device_id);
    let current_firmware = args
        .current_firmware
        .unwrap_or(config.defaults.current_firmware);
    let endpoint = Endpoint::new(args.host.as_str(), args.port, HEARTBEAT_PATH);

    print!("{}", report::banner(&endpoint, device_id, current_firmware));
    print!(
        "{}",
        report::sending(&build_request(device_id, current_firmware))
    );

    let client = HeartbeatClient::new(UdpTransport::new(config.transport.clone()));
    let exchange = client.run_heartbeat(&args.host, args.port, device_id, current_firmware);

    let outcome = match args.timeout_secs {
        Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), exchange).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(timeout_secs = secs, "Heartbeat deadline expired");
                ExchangeOutcome::TransportError(format!("no reply within {}s", secs))
            }
        },
        None => exchange.await,
    };

    print!("{}", report::outcome(&outcome));
    Ok(())
}
