//! Subcommand implementations.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};
use washbay_bridge::Dispatcher;
use washbay_core::{BridgeConfig, DevicePath, Identifier};
use washbay_hardware::locator::serial_ports;
use washbay_hardware::{HidrawReader, IdentifierReader, PortClass, PortLocator, SerialQrReader};

/// Run the bridge until a privileged QR command or Ctrl-C stops it.
pub async fn run(config: BridgeConfig) -> Result<()> {
    let (mut dispatcher, relay_handle) = Dispatcher::from_config(config);
    if relay_handle.is_some() {
        warn!("Relays are simulated, GPIO untouched");
    }

    tokio::select! {
        action = dispatcher.run() => {
            info!(%action, "Host action started, exiting");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Interrupted");
        }
    }
    dispatcher.release_relays().await;
    info!(stats = ?dispatcher.stats(), "Bridge stopped");
    Ok(())
}

/// Print what each peripheral class resolves to, and the OS serial ports.
pub fn ports(config: &BridgeConfig) -> Result<()> {
    let locator = PortLocator::new(config.ports.clone());
    for class in PortClass::ALL {
        let pattern = locator.pattern(class);
        match locator.locate(class)? {
            Some(path) => println!("{:<12}{path}  ({pattern})", class.to_string()),
            None => println!("{:<12}not found  ({pattern})", class.to_string()),
        }
    }

    let names = serial_ports().context("Failed to enumerate serial ports")?;
    println!();
    if names.is_empty() {
        println!("No serial ports reported");
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

pub async fn scan_rfid(config: &BridgeConfig) -> Result<()> {
    let mut reader = HidrawReader::new(config.session.duplicate_window);
    scan(config, PortClass::Rfid, &mut reader, config.timing.rfid_read_timeout()).await
}

pub async fn scan_qr(config: &BridgeConfig) -> Result<()> {
    let mut reader = SerialQrReader::new(config.serial.scanner_baud);
    scan(config, PortClass::Scanner, &mut reader, config.timing.qr_read_timeout()).await
}

pub fn print_config(config: &BridgeConfig) -> Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}

async fn scan<R: IdentifierReader>(
    config: &BridgeConfig,
    class: PortClass,
    reader: &mut R,
    timeout: Duration,
) -> Result<()> {
    let locator = PortLocator::new(config.ports.clone());
    let path = locator.require(class)?;
    eprintln!("Reading {} identifiers from {path}, Ctrl-C to stop", reader.kind());

    tokio::select! {
        result = print_identifiers(reader, &path, timeout) => result,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")
        }
    }
}

async fn print_identifiers<R: IdentifierReader>(
    reader: &mut R,
    path: &DevicePath,
    timeout: Duration,
) -> Result<()> {
    loop {
        match reader.read_identifier(path, timeout).await {
            Ok(Some(identifier)) => println!("{}", scan_line(&identifier)),
            Ok(None) => {}
            Err(e) if e.is_device_loss() => {
                return Err(e).with_context(|| format!("Lost {path}"));
            }
            Err(e) => warn!(%path, "Read failed: {}", e),
        }
    }
}

/// One line of `scan-rfid` / `scan-qr` output: local read time, then the value.
pub fn scan_line(identifier: &Identifier) -> String {
    let read_at = identifier.read_at.with_timezone(&chrono::Local);
    format!("{}  {}", read_at.format("%H:%M:%S%.3f"), identifier.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_scan_line_prefixes_read_time() {
        let mut identifier = Identifier::qr("QR-8841");
        identifier.read_at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 5).unwrap();

        let line = scan_line(&identifier);
        let (time, value) = line.split_once("  ").unwrap();
        assert_eq!(value, "QR-8841");
        assert_eq!(time.len(), "12:30:05.000".len());
        assert!(time.ends_with(":05.000"));
    }
}
