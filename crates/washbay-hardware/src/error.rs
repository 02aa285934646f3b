//! Error types for peripheral operations.
//!
//! Covers the failure classes the dispatcher distinguishes: a device that is
//! missing or went away, an unusable discovery pattern, a relay name the
//! bank does not know, a relay that failed to switch, and a host command
//! that could not be started.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during peripheral operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// No device matched the discovery pattern.
    #[error("No device matches {pattern}")]
    NotFound { pattern: String },

    /// Discovery pattern is not a valid glob.
    #[error("Invalid device pattern {pattern}: {message}")]
    Pattern { pattern: String, message: String },

    /// Relay name is not in the configured table.
    #[error("Unknown relay: {name}")]
    UnknownRelay { name: String },

    /// Relay output could not be switched.
    #[error("Relay {relay} fault: {message}")]
    RelayFault { relay: String, message: String },

    /// Host command could not be started.
    #[error("Command {command} failed: {message}")]
    Command { command: String, message: String },


    /// Serial port could not be opened or configured.
    #[error("Serial error: {0}")]
    Serial(#[from] serialport::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    pub fn not_found(pattern: impl Into<String>) -> Self {
        Self::NotFound {
            pattern: pattern.into(),
        }
    }

    pub fn pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    pub fn unknown_relay(name: impl Into<String>) -> Self {
        Self::UnknownRelay { name: name.into() }
    }

    pub fn relay_fault(relay: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RelayFault {
            relay: relay.into(),
            message: message.into(),
        }
    }

    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Whether the error means the device path should be re-resolved.
    #[must_use]
    pub fn is_device_loss(&self) -> bool {
        matches!(
            self,
            Self::Disconnected { .. } | Self::NotFound { .. } | Self::Serial(_) | Self::Io(_)
        )
    }
}
