//! Controller link over a pluggable transport.
//!
//! # Connection lifecycle
//!
//! 1. `connect(path)` opens the transport and sends the start handshake
//! 2. `send()` / `try_receive()` exchange lines
//! 3. any write or read failure drops the transport; `is_connected()` turns false
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use tokio::time::Instant;
//! use washbay_core::{DevicePath, IdentifierKind};
//! use washbay_core::config::IdentifierFormat;
//! use washbay_link::ControllerLink;
//! use washbay_protocol::Outbound;
//!
//! # async fn example() -> washbay_link::Result<()> {
//! let mut link = ControllerLink::serial(115_200, Duration::from_secs(1), IdentifierFormat::Tagged);
//! link.connect(&DevicePath::new("/dev/ttyUSB0")).await?;
//!
//! link.send(Outbound::Identifier { kind: IdentifierKind::Rfid, value: "04a1".into() }).await?;
//! if let Some(inbound) = link.try_receive(Instant::now() + Duration::from_secs(7)).await? {
//!     println!("{inbound:?}");
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{LinkError, Result};
use futures::{SinkExt, StreamExt};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{Instant, timeout, timeout_at};
use tokio_serial::SerialPortBuilderExt;
use tokio_util::codec::Framed;
use tracing::{debug, info, trace, warn};
use washbay_core::DevicePath;
use washbay_core::config::IdentifierFormat;
use washbay_protocol::{Inbound, LinkCodec, Outbound};

/// Byte stream the link can run over.
pub trait LinkTransport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> LinkTransport for T {}

pub type BoxedTransport = Box<dyn LinkTransport>;

/// Opens a transport for a device path.
pub type Opener = Box<dyn FnMut(&DevicePath) -> io::Result<BoxedTransport> + Send>;

/// Link to the bay controller.
pub struct ControllerLink {
    opener: Opener,
    framed: Option<Framed<BoxedTransport, LinkCodec>>,
    path: Option<DevicePath>,
    format: IdentifierFormat,
    write_timeout: Duration,
}

impl ControllerLink {
    /// Link that opens serial ports at `baud`.
    pub fn serial(baud: u32, write_timeout: Duration, format: IdentifierFormat) -> Self {
        let opener: Opener = Box::new(move |path: &DevicePath| -> io::Result<BoxedTransport> {
            let port = tokio_serial::new(path.to_string_lossy(), baud)
                .open_native_async()
                .map_err(io::Error::from)?;
            Ok(Box::new(port))
        });
        Self::with_opener(opener, write_timeout, format)
    }

    /// Link that opens transports through `opener`.
    pub fn with_opener(opener: Opener, write_timeout: Duration, format: IdentifierFormat) -> Self {
        Self {
            opener,
            framed: None,
            path: None,
            format,
            write_timeout,
        }
    }

    /// Open the transport on `path` and send the start handshake.
    ///
    /// Any existing transport is dropped first.
    ///
    /// # Errors
    /// Returns `LinkError::ConnectFailed` if the transport cannot be opened,
    /// or the send error if the handshake cannot be written.
    pub async fn connect(&mut self, path: &DevicePath) -> Result<()> {
        self.disconnect();

        let transport = (self.opener)(path).map_err(|source| LinkError::ConnectFailed {
            path: path.clone(),
            source,
        })?;
        self.framed = Some(Framed::new(transport, LinkCodec::new(self.format)));
        self.path = Some(path.clone());
        info!(%path, "Controller link connected");

        self.send(Outbound::Handshake).await
    }

    /// Write one message.
    ///
    /// A write failure or timeout drops the transport. The message is not
    /// retried.
    ///
    /// # Errors
    /// Returns `LinkError::NotConnected` when no transport is open,
    /// `LinkError::WriteTimeout` when the write stalls, or the underlying
    /// protocol error.
    pub async fn send(&mut self, message: Outbound) -> Result<()> {
        let framed = self.framed.as_mut().ok_or(LinkError::NotConnected)?;
        trace!(?message, "Sending to controller");

        let result = timeout(self.write_timeout, framed.send(message)).await;
        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(washbay_core::Error::Io(e))) => {
                warn!("Controller write failed: {}", e);
                self.disconnect();
                Err(LinkError::Io(e))
            }
            Ok(Err(e)) => Err(LinkError::Protocol(e)),
            Err(_) => {
                let ms = u64::try_from(self.write_timeout.as_millis()).unwrap_or(u64::MAX);
                warn!("Controller write timeout after {}ms", ms);
                self.disconnect();
                Err(LinkError::WriteTimeout(ms))
            }
        }
    }

    /// Wait until `deadline` for one inbound message.
    ///
    /// A deadline already in the past performs a single non-blocking poll.
    /// Returns `Ok(None)` if nothing arrived.
    ///
    /// # Errors
    /// Returns `LinkError::NotConnected` when no transport is open, or
    /// `LinkError::ConnectionLost` when the controller hangs up or the
    /// transport fails; either failure drops the transport.
    pub async fn try_receive(&mut self, deadline: Instant) -> Result<Option<Inbound>> {
        let framed = self.framed.as_mut().ok_or(LinkError::NotConnected)?;

        let result = timeout_at(deadline, framed.next()).await;
        match result {
            Err(_) => Ok(None),
            Ok(Some(Ok(inbound))) => {
                debug!(?inbound, "Received from controller");
                Ok(Some(inbound))
            }
            Ok(Some(Err(e))) => {
                warn!("Controller read failed: {}", e);
                self.disconnect();
                Err(LinkError::ConnectionLost(e.to_string()))
            }
            Ok(None) => {
                warn!("Controller closed the link");
                self.disconnect();
                Err(LinkError::ConnectionLost("end of stream".to_string()))
            }
        }
    }

    /// Drop the transport, if any.
    pub fn disconnect(&mut self) {
        if self.framed.take().is_some() {
            if let Some(path) = self.path.take() {
                info!(%path, "Controller link closed");
            }
        }
        self.path = None;
    }

    pub fn is_connected(&self) -> bool {
        self.framed.is_some()
    }

    /// Path of the open transport.
    pub fn path(&self) -> Option<&DevicePath> {
        self.path.as_ref()
    }

    pub fn format(&self) -> IdentifierFormat {
        self.format
    }
}

impl Drop for ControllerLink {
    fn drop(&mut self) {
        if self.framed.is_some() {
            debug!("ControllerLink dropped while connected - transport will be closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing_opener() -> Opener {
        Box::new(|_path: &DevicePath| -> io::Result<BoxedTransport> {
            Err(io::Error::from(io::ErrorKind::NotFound))
        })
    }

    #[tokio::test]
    async fn test_link_not_connected_initially() {
        let link = ControllerLink::with_opener(
            failing_opener(),
            Duration::from_secs(1),
            IdentifierFormat::Tagged,
        );
        assert!(!link.is_connected());
        assert!(link.path().is_none());
    }

    #[tokio::test]
    async fn test_send_without_connect() {
        let mut link = ControllerLink::with_opener(
            failing_opener(),
            Duration::from_secs(1),
            IdentifierFormat::Tagged,
        );
        let result = link.send(Outbound::Handshake).await;
        assert!(matches!(result, Err(LinkError::NotConnected)));

        let result = link.try_receive(Instant::now()).await;
        assert!(matches!(result, Err(LinkError::NotConnected)));
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let mut link = ControllerLink::with_opener(
            failing_opener(),
            Duration::from_secs(1),
            IdentifierFormat::Tagged,
        );
        let result = link.connect(&DevicePath::new("/dev/ttyUSB0")).await;
        assert!(matches!(result, Err(LinkError::ConnectFailed { .. })));
        assert!(!link.is_connected());
    }

    #[tokio::test]
    async fn test_serial_connect_missing_port() {
        let mut link =
            ControllerLink::serial(115_200, Duration::from_secs(1), IdentifierFormat::Record);
        let result = link.connect(&DevicePath::new("/nonexistent/ttyUSB0")).await;
        assert!(matches!(result, Err(LinkError::ConnectFailed { .. })));
        assert_eq!(link.format(), IdentifierFormat::Record);
    }
}
