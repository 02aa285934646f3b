//! Privileged QR payloads that act on the host instead of the controller.
//!
//! A QR code of the form `systemd:<action>` is never forwarded as an
//! identifier. The bridge acknowledges it on the link and, for a known
//! action, reboots or powers off the host.

use std::fmt;
use washbay_core::constants::SYSTEM_COMMAND_PREFIX;

/// Host command carried by a privileged QR payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemCommand {
    Reboot,
    Shutdown,
    /// A `systemd:` payload naming an action the bridge does not know.
    Unknown(String),
}

impl SystemCommand {
    /// Acknowledgement code sent back on the link as `QR:<code>`.
    #[must_use]
    pub fn ack_code(&self) -> &'static str {
        match self {
            SystemCommand::Reboot => "ACK_SYSTEMD_REBOOT",
            SystemCommand::Shutdown => "ACK_SYSTEMD_SHUTDOWN",
            SystemCommand::Unknown(_) => "ACK_SYSTEMD_UNKNOWN",
        }
    }
}

impl fmt::Display for SystemCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SystemCommand::Reboot => write!(f, "reboot"),
            SystemCommand::Shutdown => write!(f, "shutdown"),
            SystemCommand::Unknown(action) => write!(f, "unknown({action})"),
        }
    }
}

/// Recognize a privileged QR payload.
///
/// Matching ignores ASCII case on both the prefix and the action but is
/// otherwise exact: `systemd: reboot` is an unknown action. Returns
/// `None` for ordinary payloads.
///
/// # Examples
///
/// ```
/// use washbay_protocol::command::{parse_system_command, SystemCommand};
///
/// assert_eq!(parse_system_command("systemd:reboot"), Some(SystemCommand::Reboot));
/// assert_eq!(parse_system_command("SYSTEMD:Poweroff"), Some(SystemCommand::Shutdown));
/// assert_eq!(
///     parse_system_command("systemd:halt"),
///     Some(SystemCommand::Unknown("halt".into()))
/// );
/// assert_eq!(parse_system_command("ticket-42"), None);
/// ```
#[must_use]
pub fn parse_system_command(payload: &str) -> Option<SystemCommand> {
    let payload = payload.trim();
    let prefix = payload.get(..SYSTEM_COMMAND_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(SYSTEM_COMMAND_PREFIX) {
        return None;
    }

    let action = &payload[SYSTEM_COMMAND_PREFIX.len()..];
    let command = match action.to_ascii_lowercase().as_str() {
        "reboot" => SystemCommand::Reboot,
        "shutdown" | "shut" | "poweroff" => SystemCommand::Shutdown,
        _ => SystemCommand::Unknown(action.to_string()),
    };
    Some(command)
}
