//! Core constants for the wash-bay identification bridge.
//!
//! This module collects the fixed values shared by the readers, the
//! controller link and the dispatcher. Values that operators may need to
//! tune are only *defaults* here; [`BridgeConfig`](crate::BridgeConfig)
//! carries the effective settings.
//!
//! # Wire Structure
//!
//! Every message exchanged with the microcontroller is one line of text:
//!
//! ```text
//! RFID:<id>\n                      tagged identifier
//! QR:<payload>\n                   tagged identifier
//! {"kart_id":"..","status":true}\n structured identifier
//! MODE:QR\n                        inbound mode switch
//! {"status":true,"rele":"yikama","time":30}\n inbound authorization
//! ```
//!
//! # Usage
//!
//! ```
//! use washbay_core::constants::*;
//!
//! assert_eq!(HID_REPORT_LEN, 8);
//! assert_eq!(KEYCODE_ENTER, 40);
//! assert!(DEFAULT_RESPONSE_TIMEOUT_MS > DEFAULT_RFID_READ_TIMEOUT_MS);
//! ```

// ============================================================================
// HID Keyboard Reports
// ============================================================================

/// Size of one USB-HID boot keyboard report in bytes.
pub const HID_REPORT_LEN: usize = 8;

/// Offset of the first key usage code inside a report.
///
/// Byte 0 carries modifiers, byte 1 is reserved, bytes 2-7 hold up to six
/// pressed keys. Keyboard-emulating RFID readers only ever press one key at
/// a time, so byte 2 is the only one that matters.
pub const HID_KEYCODE_OFFSET: usize = 2;

/// Usage code reported when no key is pressed (key release report).
pub const KEYCODE_NONE: u8 = 0;

/// Usage code of the Enter key, used by readers as record terminator.
pub const KEYCODE_ENTER: u8 = 40;

/// Length of one identifier copy emitted by duplicating RFID tags.
///
/// Some tags emit their UUID twice back-to-back. A UUID in canonical
/// textual form is 36 characters long.
pub const DEFAULT_DUPLICATE_WINDOW: usize = 36;

// ============================================================================
// Wire Tags
// ============================================================================

/// Prefix of the inbound mode switch line.
pub const MODE_PREFIX: &str = "MODE:";

/// Tag for RFID identifiers on the plain-text wire format.
pub const RFID_TAG: &str = "RFID";

/// Tag for QR payloads on the plain-text wire format.
pub const QR_TAG: &str = "QR";

/// Reserved prefix for privileged QR commands (matched case-insensitively).
pub const SYSTEM_COMMAND_PREFIX: &str = "systemd:";

/// Maximum accepted line length before the buffer is discarded.
pub const MAX_LINE_LEN: usize = 4096;

// ============================================================================
// Serial Settings
// ============================================================================

/// Baud rate of the microcontroller USB-serial bridge.
pub const DEFAULT_CONTROLLER_BAUD: u32 = 115_200;

/// Factory baud rate of the QR scanner UART.
pub const DEFAULT_SCANNER_BAUD: u32 = 9_600;

// ============================================================================
// Device Discovery
// ============================================================================

/// Glob matching the microcontroller's bulk USB-serial device.
pub const DEFAULT_CONTROLLER_PATTERN: &str = "/dev/ttyUSB*";

/// Glob matching the QR scanner's CDC-ACM device.
pub const DEFAULT_SCANNER_PATTERN: &str = "/dev/ttyACM*";

/// Glob matching the RFID reader's hidraw node.
pub const DEFAULT_RFID_PATTERN: &str = "/dev/hidraw0";

// ============================================================================
// Timing (milliseconds)
// ============================================================================

/// Bound on one RFID read attempt.
pub const DEFAULT_RFID_READ_TIMEOUT_MS: u64 = 3_000;

/// Bound on one QR read attempt.
pub const DEFAULT_QR_READ_TIMEOUT_MS: u64 = 5_000;

/// How long a locked session waits for the controller's answer.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 7_000;

/// Delay between discovery attempts for a missing peripheral.
pub const DEFAULT_DISCOVERY_BACKOFF_MS: u64 = 2_000;

/// Cadence of the dispatch loop.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 50;

/// Bound on a single write to the controller.
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 1_000;

/// Activation duration used when the controller omits `time`.
pub const DEFAULT_ACTIVATION_SECS: u64 = 60;

// ============================================================================
// Host Integration
// ============================================================================

/// Sysfs GPIO class directory.
pub const DEFAULT_GPIO_ROOT: &str = "/sys/class/gpio";

/// Default argv used to restart the host.
pub const DEFAULT_REBOOT_COMMAND: &[&str] = &["sudo", "systemctl", "reboot"];

/// Default argv used to power the host off.
pub const DEFAULT_SHUTDOWN_COMMAND: &[&str] = &["sudo", "shutdown", "now"];
