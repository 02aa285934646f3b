//! Peripheral discovery by glob pattern.
//!
//! Serial adapters enumerate in arrival order, so the bridge never hard-codes
//! `/dev/ttyUSB0`. Each peripheral class has a glob pattern and the
//! lexicographically first match wins.

use crate::error::{HardwareError, Result};
use std::fmt;
use washbay_core::DevicePath;
use washbay_core::config::PortsConfig;

/// Resolve `pattern` to its lexicographically first match.
///
/// Entries that cannot be read while expanding are skipped.
///
/// # Errors
/// Returns `HardwareError::Pattern` if the pattern is not a valid glob.
///
/// # Examples
///
/// ```
/// use washbay_hardware::locator::find;
///
/// assert_eq!(find("/nonexistent/ttyUSB*").unwrap(), None);
/// assert!(find("/dev/[").is_err());
/// ```
pub fn find(pattern: &str) -> Result<Option<DevicePath>> {
    let entries = glob::glob(pattern).map_err(|e| HardwareError::pattern(pattern, e.to_string()))?;
    Ok(entries.filter_map(|entry| entry.ok()).min().map(DevicePath::new))
}

/// Peripheral classes the bridge discovers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortClass {
    Controller,
    Scanner,
    Rfid,
}

impl PortClass {
    pub const ALL: [PortClass; 3] = [PortClass::Controller, PortClass::Scanner, PortClass::Rfid];
}

impl fmt::Display for PortClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PortClass::Controller => write!(f, "controller"),
            PortClass::Scanner => write!(f, "scanner"),
            PortClass::Rfid => write!(f, "rfid"),
        }
    }
}

/// Pattern table for all peripheral classes.
#[derive(Debug, Clone)]
pub struct PortLocator {
    ports: PortsConfig,
}

impl PortLocator {
    pub fn new(ports: PortsConfig) -> Self {
        Self { ports }
    }

    #[must_use]
    pub fn pattern(&self, class: PortClass) -> &str {
        match class {
            PortClass::Controller => &self.ports.controller_pattern,
            PortClass::Scanner => &self.ports.scanner_pattern,
            PortClass::Rfid => &self.ports.rfid_pattern,
        }
    }

    /// Resolve one class.
    ///
    /// # Errors
    /// Returns `HardwareError::Pattern` if the configured pattern is invalid.
    pub fn locate(&self, class: PortClass) -> Result<Option<DevicePath>> {
        find(self.pattern(class))
    }

    /// Resolve one class, treating absence as an error.
    ///
    /// # Errors
    /// Returns `HardwareError::NotFound` when nothing matches.
    pub fn require(&self, class: PortClass) -> Result<DevicePath> {
        self.locate(class)?
            .ok_or_else(|| HardwareError::not_found(self.pattern(class)))
    }
}

impl Default for PortLocator {
    fn default() -> Self {
        Self::new(PortsConfig::default())
    }
}

/// Serial ports the OS reports, for diagnostics.
///
/// # Errors
/// Returns `HardwareError::Serial` if enumeration fails.
pub fn serial_ports() -> Result<Vec<String>> {
    let mut names: Vec<String> = serialport::available_ports()?
        .into_iter()
        .map(|port| port.port_name)
        .collect();
    names.sort();
    Ok(names)
}
