//! Enum wrappers for peripheral dispatch.
//!
//! Native `async fn` in traits is not object-safe, so the dispatcher holds
//! these enums instead of `Box<dyn ...>`. Each variant forwards to its
//! concrete device.
//!
//! ```
//! use washbay_core::IdentifierKind;
//! use washbay_hardware::devices::AnyReader;
//! use washbay_hardware::mock::MockReader;
//! use washbay_hardware::traits::IdentifierReader;
//!
//! let (reader, _handle) = MockReader::new(IdentifierKind::Qr);
//! let reader = AnyReader::Mock(reader);
//! assert_eq!(reader.kind(), IdentifierKind::Qr);
//! ```

use crate::Result;
use crate::hidraw::HidrawReader;
use crate::mock::{MockReader, MockRelay, MockSystemControl};
use crate::qr::SerialQrReader;
use crate::relay::SysfsRelay;
use crate::system::{CommandSystemControl, SystemAction};
use crate::traits::{IdentifierReader, Relay, SystemControl};
use std::time::Duration;
use washbay_core::{DevicePath, Identifier, IdentifierKind};

/// Any identifier reader.
#[derive(Debug)]
pub enum AnyReader {
    /// Keyboard-emulation RFID reader on hidraw.
    Hidraw(HidrawReader),
    /// Serial QR scanner.
    SerialQr(SerialQrReader),
    /// Mock reader for tests.
    Mock(MockReader),
}

impl IdentifierReader for AnyReader {
    fn kind(&self) -> IdentifierKind {
        match self {
            Self::Hidraw(device) => device.kind(),
            Self::SerialQr(device) => device.kind(),
            Self::Mock(device) => device.kind(),
        }
    }

    async fn read_identifier(
        &mut self,
        path: &DevicePath,
        timeout: Duration,
    ) -> Result<Option<Identifier>> {
        match self {
            Self::Hidraw(device) => device.read_identifier(path, timeout).await,
            Self::SerialQr(device) => device.read_identifier(path, timeout).await,
            Self::Mock(device) => device.read_identifier(path, timeout).await,
        }
    }
}

/// Any relay output.
#[derive(Debug)]
pub enum AnyRelay {
    Sysfs(SysfsRelay),
    Mock(MockRelay),
}

impl Relay for AnyRelay {
    async fn set(&mut self, on: bool) -> Result<()> {
        match self {
            Self::Sysfs(device) => device.set(on).await,
            Self::Mock(device) => device.set(on).await,
        }
    }
}

/// Any host power control.
#[derive(Debug)]
pub enum AnySystemControl {
    Command(CommandSystemControl),
    Mock(MockSystemControl),
}

impl SystemControl for AnySystemControl {
    async fn execute(&mut self, action: SystemAction) -> Result<()> {
        match self {
            Self::Command(control) => control.execute(action).await,
            Self::Mock(control) => control.execute(action).await,
        }
    }
}
