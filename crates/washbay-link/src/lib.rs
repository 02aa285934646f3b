//! Line-oriented link to the bay microcontroller.
//!
//! The link owns at most one open transport, framed with
//! [`LinkCodec`](washbay_protocol::LinkCodec). It never reconnects on its
//! own: after a failure it reports disconnected and the caller decides when
//! to try again.

pub mod error;
pub mod link;

pub use error::{LinkError, Result};
pub use link::{BoxedTransport, ControllerLink, LinkTransport, Opener};
