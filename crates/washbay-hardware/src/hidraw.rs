//! RFID reader on a Linux hidraw node.
//!
//! The node is opened non-blocking and registered with the tokio reactor,
//! so a read waits on readiness instead of parking the runtime thread.

use crate::error::{HardwareError, Result};
use crate::traits::IdentifierReader;
use nix::fcntl::OFlag;
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Duration;
use tokio::io::unix::AsyncFd;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, trace};
use washbay_core::constants::{DEFAULT_DUPLICATE_WINDOW, HID_REPORT_LEN};
use washbay_core::{DevicePath, Identifier, IdentifierKind};
use washbay_protocol::keycode::KeyReportAssembler;
use washbay_protocol::normalize::strip_duplicate;

/// Non-blocking hidraw node as an [`AsyncRead`].
#[derive(Debug)]
pub struct HidrawStream {
    inner: AsyncFd<File>,
}

impl HidrawStream {
    /// Open `path` read-only with `O_NONBLOCK`.
    ///
    /// # Errors
    /// Returns an error if the node cannot be opened or registered.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(OFlag::O_NONBLOCK.bits())
            .open(path)?;
        Ok(Self {
            inner: AsyncFd::new(file)?,
        })
    }
}

impl AsyncRead for HidrawStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        loop {
            let mut guard = ready!(self.inner.poll_read_ready(cx))?;
            let unfilled = buf.initialize_unfilled();
            match guard.try_io(|inner| inner.get_ref().read(unfilled)) {
                Ok(Ok(len)) => {
                    buf.advance(len);
                    return Poll::Ready(Ok(()));
                }
                Ok(Err(err)) => return Poll::Ready(Err(err)),
                Err(_would_block) => continue,
            }
        }
    }
}

/// Read 8-byte reports from `src` until Enter or `deadline`.
///
/// Returns the decoded record with a doubled identifier of `window`
/// characters collapsed, or `None` on timeout or an empty record.
///
/// # Errors
/// Returns an error if the stream fails or ends.
pub async fn read_record<R>(src: &mut R, deadline: Instant, window: usize) -> io::Result<Option<String>>
where
    R: AsyncRead + Unpin,
{
    let mut assembler = KeyReportAssembler::new();
    let mut report = [0u8; HID_REPORT_LEN];

    loop {
        match timeout_at(deadline, src.read_exact(&mut report)).await {
            Ok(result) => {
                result?;
            }
            Err(_) => {
                trace!(pending = assembler.pending(), "RFID read window elapsed");
                return Ok(None);
            }
        }

        if let Some(record) = assembler.push_report(&report) {
            if record.is_empty() {
                return Ok(None);
            }
            return Ok(Some(strip_duplicate(&record, window).to_string()));
        }
    }
}

/// RFID reader backed by a hidraw keyboard-emulation device.
#[derive(Debug, Clone)]
pub struct HidrawReader {
    duplicate_window: usize,
}

impl HidrawReader {
    pub fn new(duplicate_window: usize) -> Self {
        Self { duplicate_window }
    }
}

impl Default for HidrawReader {
    fn default() -> Self {
        Self::new(DEFAULT_DUPLICATE_WINDOW)
    }
}

impl IdentifierReader for HidrawReader {
    fn kind(&self) -> IdentifierKind {
        IdentifierKind::Rfid
    }

    async fn read_identifier(
        &mut self,
        path: &DevicePath,
        timeout: Duration,
    ) -> Result<Option<Identifier>> {
        let deadline = Instant::now() + timeout;
        let mut stream = HidrawStream::open(path.as_path()).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => HardwareError::disconnected(path.to_string()),
            _ => HardwareError::Io(e),
        })?;
        debug!(%path, "Waiting for RFID card");

        let record = read_record(&mut stream, deadline, self.duplicate_window).await?;
        Ok(record.map(Identifier::rfid))
    }
}
