//! Peripheral access for the wash-bay bridge.
//!
//! - [`locator`]: glob-based discovery of the controller, scanner and RFID nodes
//! - [`hidraw`]: keyboard-emulation RFID reader on a hidraw node
//! - [`qr`]: serial QR scanner
//! - [`relay`]: sysfs GPIO relays and the named [`RelayBank`]
//! - [`system`]: host reboot / shutdown
//! - [`mock`]: in-memory stand-ins driven by handles
//!
//! Device traits use native `async fn` (Edition 2024), so dispatch across
//! implementations goes through the enums in [`devices`].

pub mod devices;
pub mod error;
pub mod hidraw;
pub mod locator;
pub mod mock;
pub mod qr;
pub mod relay;
pub mod system;
pub mod traits;

pub use devices::{AnyReader, AnyRelay, AnySystemControl};
pub use error::{HardwareError, Result};
pub use hidraw::HidrawReader;
pub use locator::{PortClass, PortLocator, find};
pub use qr::SerialQrReader;
pub use relay::{RelayBank, SysfsRelay};
pub use system::{CommandSystemControl, SystemAction};
pub use traits::{IdentifierReader, Relay, SystemControl};
