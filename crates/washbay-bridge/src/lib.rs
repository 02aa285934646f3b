//! Session dispatch for the wash-bay bridge.
//!
//! [`Dispatcher`] ties the controller link, the identifier readers and the
//! relay bank together. Only one identifier is in flight at a time: after
//! sending, the dispatcher stays [`SessionState::Locked`] until the
//! controller answers or the response timeout passes.

pub mod dispatcher;
pub mod session;

pub use dispatcher::{Dispatcher, Peripherals, PortSlot, Tick};
pub use session::{PendingSession, SessionOutcome, SessionState, SessionStats};
