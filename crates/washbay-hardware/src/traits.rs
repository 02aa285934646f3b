//! Peripheral trait definitions.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT).
//! They are not object-safe; dynamic selection goes through the enum
//! wrappers in [`devices`](crate::devices).

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::system::SystemAction;
use std::time::Duration;
use washbay_core::{DevicePath, Identifier, IdentifierKind};

/// A reader that produces at most one identifier per attempt.
///
/// Each call is a self-contained attempt: the device is opened, read until
/// one record completes or `timeout` elapses, and released again. No
/// partial record survives between attempts.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use washbay_core::DevicePath;
/// use washbay_hardware::traits::IdentifierReader;
///
/// async fn poll<R: IdentifierReader>(reader: &mut R, path: &DevicePath) {
///     match reader.read_identifier(path, Duration::from_secs(3)).await {
///         Ok(Some(id)) => println!("{id}"),
///         Ok(None) => {}
///         Err(e) => eprintln!("{e}"),
///     }
/// }
/// ```
pub trait IdentifierReader {
    /// Kind of identifier this reader yields.
    fn kind(&self) -> IdentifierKind;

    /// Attempt one read.
    ///
    /// Returns `Ok(None)` when the attempt times out or yields an empty
    /// record.
    ///
    /// # Errors
    /// Returns an error if the device cannot be opened or read.
    async fn read_identifier(
        &mut self,
        path: &DevicePath,
        timeout: Duration,
    ) -> Result<Option<Identifier>>;
}

/// A single on/off output.
pub trait Relay {
    /// Drive the output to the logical `on` state.
    ///
    /// # Errors
    /// Returns an error if the output cannot be switched.
    async fn set(&mut self, on: bool) -> Result<()>;
}

/// Host power control.
pub trait SystemControl {
    /// Start the host action. Returns once the action is launched.
    ///
    /// # Errors
    /// Returns an error if the action cannot be started.
    async fn execute(&mut self, action: SystemAction) -> Result<()>;
}
