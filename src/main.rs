use std::path::PathBuf;

use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "coap-heartbeat")]
#[command(
    about = "Send one CoAP heartbeat to an IoT management server",
    long_about = None,
    version
)]
#[command(allow_negative_numbers = true)]
struct Cli {
    /// Server host name or IP address
    host: String,

    /// Server UDP port (5683 is the CoAP default)
    port: u16,

    /// Device identifier [default: 1001]
    device_id: Option<i64>,

    /// Firmware version the device currently runs [default: 100]
    current_firmware: Option<i64>,

    /// Give up if no reply arrives within this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Config file (defaults to ~/.config/coap-heartbeat/config.json)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl From<Cli> for cli::HeartbeatArgs {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host,
            port: cli.port,
            device_id: cli.device_id,
            current_firmware: cli.current_firmware,
            timeout_secs: cli.timeout,
            config_path: cli.config,
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Logs go to stderr; stdout carries the report.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Usage errors exit here, before any config, logging or network work.
    let cli = Cli::parse();

    let _ = dotenvy::dotenv();
    init_logging(cli.verbose);

    cli::cmd_heartbeat(cli.into()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_is_usage_error() {
        assert!(Cli::try_parse_from(["coap-heartbeat"]).is_err());
    }

    #[test]
    fn test_missing_port_is_usage_error() {
        assert!(Cli::try_parse_from(["coap-heartbeat", "localhost"]).is_err());
    }

    #[test]
    fn test_invalid_port_is_usage_error() {
        assert!(Cli::try_parse_from(["coap-heartbeat", "localhost", "70000"]).is_err());
        assert!(Cli::try_parse_from(["coap-heartbeat", "localhost", "coap"]).is_err());
    }

    #[test]
    fn test_optional_identity_defaults_to_none() {
        let cli = Cli::try_parse_from(["coap-heartbeat", "localhost", "5683"]).unwrap();
        assert_eq!(cli.host, "localhost");
        assert_eq!(cli.port, 5683);
        assert_eq!(cli.device_id, None);
        assert_eq!(cli.current_firmware, None);
        assert_eq!(cli.timeout, None);
    }

    #[test]
    fn test_full_invocation() {
        let cli = Cli::try_parse_from([
            "coap-heartbeat",
            "127.0.0.1",
            "5683",
            "1001",
            "100",
            "--timeout",
            "5",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.device_id, Some(1001));
        assert_eq!(cli.current_firmware, Some(100));
        assert_eq!(cli.timeout, Some(5));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_negative_identity_is_accepted() {
        let cli = Cli::try_parse_from(["coap-heartbeat", "localhost", "5683", "-4", "-1"]).unwrap();
        assert_eq!(cli.device_id, Some(-4));
        assert_eq!(cli.current_firmware, Some(-1));
    }
}
