use crate::{Result, constants::{QR_TAG, RFID_TAG}, error::Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Filesystem path of a discovered peripheral (e.g. `/dev/ttyUSB0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DevicePath(PathBuf);

impl DevicePath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DevicePath(path.into())
    }

    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Lossy string form, as expected by the serial port APIs.
    #[must_use]
    pub fn to_string_lossy(&self) -> String {
        self.0.to_string_lossy().into_owned()
    }
}

impl fmt::Display for DevicePath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for DevicePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Which identification channel the dispatcher polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    #[default]
    Rfid,
    Qr,
}

impl ScanMode {
    /// Kind of identifier produced while this mode is active.
    #[must_use]
    pub fn kind(&self) -> IdentifierKind {
        match self {
            ScanMode::Rfid => IdentifierKind::Rfid,
            ScanMode::Qr => IdentifierKind::Qr,
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind().tag())
    }
}

impl std::str::FromStr for ScanMode {
    type Err = Error;

    /// Parses `RFID` / `QR`, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim();
        if value.eq_ignore_ascii_case(RFID_TAG) {
            Ok(ScanMode::Rfid)
        } else if value.eq_ignore_ascii_case(QR_TAG) {
            Ok(ScanMode::Qr)
        } else {
            Err(Error::InvalidScanMode(value.to_string()))
        }
    }
}

/// Source of an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Rfid,
    Qr,
}

impl IdentifierKind {
    /// Tag used on the plain-text wire format (`RFID:` / `QR:`).
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            IdentifierKind::Rfid => RFID_TAG,
            IdentifierKind::Qr => QR_TAG,
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Normalized identifier produced by one of the readers.
///
/// Lives for a single dispatch cycle; nothing is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub kind: IdentifierKind,
    pub value: String,
    pub read_at: DateTime<Utc>,
}

impl Identifier {
    pub fn new(kind: IdentifierKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            read_at: Utc::now(),
        }
    }

    pub fn rfid(value: impl Into<String>) -> Self {
        Self::new(IdentifierKind::Rfid, value)
    }

    pub fn qr(value: impl Into<String>) -> Self {
        Self::new(IdentifierKind::Qr, value)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.kind.tag(), self.value)
    }
}

/// Authorized request to energize one relay for a duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationRequest {
    pub relay: String,
    pub duration: Duration,
}

impl ActivationRequest {
    pub fn new(relay: impl Into<String>, duration: Duration) -> Self {
        Self {
            relay: relay.into(),
            duration,
        }
    }

    /// Build a request from the controller-supplied seconds value.
    ///
    /// # Errors
    /// Returns `Error::InvalidDuration` for negative, NaN, infinite or
    /// out-of-range values.
    pub fn from_secs_f64(relay: impl Into<String>, secs: f64) -> Result<Self> {
        let duration = Duration::try_from_secs_f64(secs)
            .map_err(|e| Error::InvalidDuration(format!("{secs}: {e}")))?;
        Ok(Self::new(relay, duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("RFID", ScanMode::Rfid)]
    #[case("rfid", ScanMode::Rfid)]
    #[case(" QR ", ScanMode::Qr)]
    #[case("qr", ScanMode::Qr)]
    fn test_scan_mode_parse(#[case] input: &str, #[case] expected: ScanMode) {
        let mode: ScanMode = input.parse().unwrap();
        assert_eq!(mode, expected);
    }

    #[rstest]
    #[case("")]
    #[case("NFC")]
    #[case("RFID QR")]
    fn test_scan_mode_parse_invalid(#[case] input: &str) {
        let result: Result<ScanMode> = input.parse();
        assert!(matches!(result, Err(Error::InvalidScanMode(_))));
    }

    #[test]
    fn test_scan_mode_default_is_rfid() {
        assert_eq!(ScanMode::default(), ScanMode::Rfid);
        assert_eq!(ScanMode::Rfid.to_string(), "RFID");
        assert_eq!(ScanMode::Qr.to_string(), "QR");
    }

    #[test]
    fn test_identifier_kind_wire_names() {
        assert_eq!(IdentifierKind::Rfid.tag(), "RFID");
        assert_eq!(IdentifierKind::Qr.tag(), "QR");
        assert_eq!(ScanMode::Qr.kind(), IdentifierKind::Qr);
    }

    #[test]
    fn test_identifier_display() {
        assert_eq!(Identifier::rfid("abc").to_string(), "RFID:abc");
        assert_eq!(Identifier::qr("ticket-7").to_string(), "QR:ticket-7");
    }

    #[rstest]
    #[case(30.0, Duration::from_secs(30))]
    #[case(0.0, Duration::ZERO)]
    #[case(1.5, Duration::from_millis(1500))]
    fn test_activation_from_secs(#[case] secs: f64, #[case] expected: Duration) {
        let request = ActivationRequest::from_secs_f64("yikama", secs).unwrap();
        assert_eq!(request.relay, "yikama");
        assert_eq!(request.duration, expected);
    }

    #[rstest]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    #[case(1e30)]
    #[case(f64::MAX)]
    fn test_activation_from_secs_invalid(#[case] secs: f64) {
        assert!(ActivationRequest::from_secs_f64("yikama", secs).is_err());
    }

    #[test]
    fn test_device_path_display() {
        let path = DevicePath::new("/dev/ttyUSB0");
        assert_eq!(path.to_string(), "/dev/ttyUSB0");
        assert_eq!(path.to_string_lossy(), "/dev/ttyUSB0");
    }
}
