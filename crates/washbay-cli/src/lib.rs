//! Command-line front end of the wash-bay bridge.
//!
//! # Usage
//!
//! ```bash
//! # Run the bridge (default subcommand)
//! washbay-bridge --config /etc/washbay/bridge.toml
//!
//! # Bench test without GPIO
//! washbay-bridge --simulate-relays run
//!
//! # Diagnostics
//! washbay-bridge ports
//! washbay-bridge scan-rfid
//! washbay-bridge scan-qr
//! washbay-bridge config
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use washbay_core::BridgeConfig;
use washbay_core::config::RelayDriver;

pub mod commands;
pub mod logging;

/// Serial/HID bridge between a wash-bay controller and its card and ticket readers
#[derive(Parser, Debug)]
#[command(name = "washbay-bridge")]
#[command(author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level or filter directive, e.g. "debug" or "washbay_link=trace"
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Drive in-memory relays instead of GPIO
    #[arg(long, global = true)]
    pub simulate_relays: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Command {
    /// Discover devices and run the dispatcher
    #[default]
    Run,
    /// Show which device each peripheral class resolves to
    Ports,
    /// Print RFID identifiers as cards are presented
    ScanRfid,
    /// Print QR payloads as tickets are scanned
    ScanQr,
    /// Print the effective configuration as TOML
    Config,
}

impl Cli {
    /// Load the configuration file (if any) and apply flag overrides.
    pub fn load_config(&self) -> Result<BridgeConfig> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => BridgeConfig::default(),
        };

        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.simulate_relays {
            config.gpio.driver = RelayDriver::Simulated;
        }
        Ok(config)
    }

    pub fn subcommand(&self) -> Command {
        self.command.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_is_default() {
        let cli = Cli::parse_from(["washbay-bridge"]);
        assert_eq!(cli.subcommand(), Command::Run);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["washbay-bridge", "scan-qr", "--log-level", "debug"]);
        assert_eq!(cli.subcommand(), Command::ScanQr);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[logging]\nlevel = \"warn\"\n\n[gpio]\ndriver = \"sysfs\"\n"
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let cli = Cli::parse_from(["washbay-bridge", "--config", path]);
        let config = cli.load_config().unwrap();
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.gpio.driver, RelayDriver::Sysfs);

        let cli = Cli::parse_from([
            "washbay-bridge",
            "--config",
            path,
            "--log-level",
            "trace",
            "--simulate-relays",
        ]);
        let config = cli.load_config().unwrap();
        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.gpio.driver, RelayDriver::Simulated);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let cli = Cli::parse_from(["washbay-bridge", "-c", "/nonexistent/bridge.toml"]);
        let err = cli.load_config().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/bridge.toml"));
    }
}
