//! QR scanner on a USB CDC serial port.
//!
//! The scanner emits each decoded payload as one newline-terminated line.
//! The port is opened per attempt and closed when the attempt ends.

use crate::error::Result;
use crate::traits::IdentifierReader;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{Instant, timeout_at};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, warn};
use washbay_core::constants::{DEFAULT_SCANNER_BAUD, MAX_LINE_LEN};
use washbay_core::{DevicePath, Identifier, IdentifierKind};
use washbay_protocol::line::{LineAssembler, LineEvent};

/// Read from `src` until one non-blank line completes or `deadline` passes.
///
/// # Errors
/// Returns an error if the stream fails or ends.
pub async fn read_line<R>(src: &mut R, deadline: Instant) -> io::Result<Option<String>>
where
    R: AsyncRead + Unpin,
{
    let mut lines = LineAssembler::with_max_len(MAX_LINE_LEN);
    let mut chunk = [0u8; 256];

    loop {
        while let Some(event) = lines.next_event() {
            match event {
                LineEvent::Line(line) => return Ok(Some(line)),
                LineEvent::Overflow { len } => warn!(len, "Discarded oversized QR payload"),
            }
        }

        let n = match timeout_at(deadline, src.read(&mut chunk)).await {
            Ok(result) => result?,
            Err(_) => return Ok(None),
        };
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "scanner stream closed",
            ));
        }
        lines.push(&chunk[..n]);
    }
}

/// QR reader on a serial scanner.
#[derive(Debug, Clone)]
pub struct SerialQrReader {
    baud: u32,
}

impl SerialQrReader {
    pub fn new(baud: u32) -> Self {
        Self { baud }
    }

    pub fn baud(&self) -> u32 {
        self.baud
    }
}

impl Default for SerialQrReader {
    fn default() -> Self {
        Self::new(DEFAULT_SCANNER_BAUD)
    }
}

impl IdentifierReader for SerialQrReader {
    fn kind(&self) -> IdentifierKind {
        IdentifierKind::Qr
    }

    async fn read_identifier(
        &mut self,
        path: &DevicePath,
        timeout: Duration,
    ) -> Result<Option<Identifier>> {
        let deadline = Instant::now() + timeout;
        let mut port = tokio_serial::new(path.to_string_lossy(), self.baud).open_native_async()?;
        debug!(%path, baud = self.baud, "Waiting for QR code");

        let line = read_line(&mut port, deadline).await?;
        Ok(line.map(Identifier::qr))
    }
}
