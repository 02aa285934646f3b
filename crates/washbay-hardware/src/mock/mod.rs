//! Mock peripherals for tests and the simulated relay driver.
//!
//! Each mock is paired with a handle that drives or observes it from the
//! test side.

pub mod reader;
pub mod relay;
pub mod system;

pub use reader::{MockReader, MockReaderHandle};
pub use relay::{MockRelay, MockRelayHandle, RelayEvent};
pub use system::{MockSystemControl, MockSystemHandle};
