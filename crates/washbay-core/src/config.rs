//! Bridge configuration.
//!
//! Loaded from a TOML file; every field has a default so the bridge also
//! runs without one. Durations are stored in milliseconds (or seconds where
//! the controller speaks seconds) and exposed as [`Duration`] accessors.
//!
//! ```
//! use washbay_core::BridgeConfig;
//! use std::time::Duration;
//!
//! let config = BridgeConfig::from_toml_str(r#"
//!     [timing]
//!     response_timeout_ms = 9000
//!
//!     [relays.yikama]
//!     pin = 17
//! "#).unwrap();
//!
//! assert_eq!(config.timing.response_timeout(), Duration::from_secs(9));
//! assert_eq!(config.timing.rfid_read_timeout(), Duration::from_secs(3));
//! assert!(config.relays.contains_key("yikama"));
//! ```

use crate::constants::*;
use crate::{Error, Result, ScanMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete bridge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub ports: PortsConfig,
    pub serial: SerialConfig,
    pub timing: TimingConfig,
    pub session: SessionConfig,
    pub wire: WireConfig,
    pub gpio: GpioConfig,
    pub relays: BTreeMap<String, RelayConfig>,
    pub system: SystemConfig,
    pub logging: LoggingConfig,
}

/// Glob patterns used to discover each peripheral class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortsConfig {
    pub controller_pattern: String,
    pub scanner_pattern: String,
    pub rfid_pattern: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub controller_baud: u32,
    pub scanner_baud: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub rfid_read_timeout_ms: u64,
    pub qr_read_timeout_ms: u64,
    pub response_timeout_ms: u64,
    pub discovery_backoff_ms: u64,
    pub tick_interval_ms: u64,
    pub write_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub default_activation_secs: u64,
    pub duplicate_window: usize,
    pub initial_mode: ScanMode,
}

/// How identifiers are encoded on the controller link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierFormat {
    /// `RFID:<id>` / `QR:<payload>` lines.
    #[default]
    Tagged,
    /// `{"kart_id":..,"status":true}` / `{"qr_id":..,"status":true}` records.
    Record,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WireConfig {
    pub identifier_format: IdentifierFormat,
}

/// Relay output driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayDriver {
    /// Sysfs GPIO lines under [`GpioConfig::root`].
    #[default]
    Sysfs,
    /// In-memory relays that only log and record transitions.
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    pub driver: RelayDriver,
    pub root: PathBuf,
}

/// One named relay output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    pub pin: u32,
    #[serde(default)]
    pub active_low: bool,
}

/// Host commands run for privileged QR codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub reboot_command: Vec<String>,
    pub shutdown_command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            ports: PortsConfig::default(),
            serial: SerialConfig::default(),
            timing: TimingConfig::default(),
            session: SessionConfig::default(),
            wire: WireConfig::default(),
            gpio: GpioConfig::default(),
            relays: default_relays(),
            system: SystemConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self {
            controller_pattern: DEFAULT_CONTROLLER_PATTERN.to_string(),
            scanner_pattern: DEFAULT_SCANNER_PATTERN.to_string(),
            rfid_pattern: DEFAULT_RFID_PATTERN.to_string(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            controller_baud: DEFAULT_CONTROLLER_BAUD,
            scanner_baud: DEFAULT_SCANNER_BAUD,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            rfid_read_timeout_ms: DEFAULT_RFID_READ_TIMEOUT_MS,
            qr_read_timeout_ms: DEFAULT_QR_READ_TIMEOUT_MS,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            discovery_backoff_ms: DEFAULT_DISCOVERY_BACKOFF_MS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_activation_secs: DEFAULT_ACTIVATION_SECS,
            duplicate_window: DEFAULT_DUPLICATE_WINDOW,
            initial_mode: ScanMode::default(),
        }
    }
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            driver: RelayDriver::default(),
            root: PathBuf::from(DEFAULT_GPIO_ROOT),
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            reboot_command: DEFAULT_REBOOT_COMMAND.iter().map(|s| s.to_string()).collect(),
            shutdown_command: DEFAULT_SHUTDOWN_COMMAND
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Relay table of a standard four-program bay.
fn default_relays() -> BTreeMap<String, RelayConfig> {
    [("yikama", 17), ("kopuk", 27), ("cila", 22), ("supurge", 23)]
        .into_iter()
        .map(|(name, pin)| {
            (
                name.to_string(),
                RelayConfig {
                    pin,
                    active_low: false,
                },
            )
        })
        .collect()
}

impl TimingConfig {
    pub fn rfid_read_timeout(&self) -> Duration {
        Duration::from_millis(self.rfid_read_timeout_ms)
    }

    pub fn qr_read_timeout(&self) -> Duration {
        Duration::from_millis(self.qr_read_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn discovery_backoff(&self) -> Duration {
        Duration::from_millis(self.discovery_backoff_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl SessionConfig {
    pub fn default_activation(&self) -> Duration {
        Duration::from_secs(self.default_activation_secs)
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file and validate it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// fails [`validate`](Self::validate).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse configuration from TOML text and validate it.
    ///
    /// # Errors
    /// Returns an error if the text is not valid TOML or fails validation.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: BridgeConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML.
    ///
    /// # Errors
    /// Returns `Error::Serialization` if a value cannot be represented.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `Error::Config` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        let timing = &self.timing;
        let timeouts = [
            ("rfid_read_timeout_ms", timing.rfid_read_timeout_ms),
            ("qr_read_timeout_ms", timing.qr_read_timeout_ms),
            ("response_timeout_ms", timing.response_timeout_ms),
            ("discovery_backoff_ms", timing.discovery_backoff_ms),
            ("tick_interval_ms", timing.tick_interval_ms),
            ("write_timeout_ms", timing.write_timeout_ms),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, value)| *value == 0) {
            return Err(Error::Config(format!("timing.{name} must be greater than 0")));
        }

        if timing.response_timeout_ms <= timing.rfid_read_timeout_ms
            || timing.response_timeout_ms <= timing.qr_read_timeout_ms
        {
            return Err(Error::Config(format!(
                "timing.response_timeout_ms ({}) must exceed both read timeouts",
                timing.response_timeout_ms
            )));
        }

        if self.session.duplicate_window == 0 {
            return Err(Error::Config(
                "session.duplicate_window must be greater than 0".to_string(),
            ));
        }

        for (name, pattern) in [
            ("controller_pattern", &self.ports.controller_pattern),
            ("scanner_pattern", &self.ports.scanner_pattern),
            ("rfid_pattern", &self.ports.rfid_pattern),
        ] {
            if pattern.trim().is_empty() {
                return Err(Error::Config(format!("ports.{name} must not be empty")));
            }
        }

        if self.serial.controller_baud == 0 || self.serial.scanner_baud == 0 {
            return Err(Error::Config("serial baud rates must be greater than 0".to_string()));
        }

        if self.relays.is_empty() {
            return Err(Error::Config("at least one relay must be configured".to_string()));
        }

        if self.system.reboot_command.is_empty() || self.system.shutdown_command.is_empty() {
            return Err(Error::Config(
                "system.reboot_command and system.shutdown_command must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
