//! Mock identifier reader.

use crate::error::{HardwareError, Result};
use crate::traits::IdentifierReader;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use washbay_core::constants::DEFAULT_DUPLICATE_WINDOW;
use washbay_core::{DevicePath, Identifier, IdentifierKind};
use washbay_protocol::keycode::{KeyReportAssembler, keystroke_reports};
use washbay_protocol::normalize::strip_duplicate;

#[derive(Debug)]
enum ReadEvent {
    Value(String),
    Fault(String),
}

/// Reader fed by a [`MockReaderHandle`].
///
/// Each attempt waits for the next presented value up to its timeout,
/// exactly like a device with no card in the field.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use washbay_core::{DevicePath, IdentifierKind};
/// use washbay_hardware::mock::MockReader;
/// use washbay_hardware::traits::IdentifierReader;
///
/// #[tokio::main]
/// async fn main() -> washbay_hardware::Result<()> {
///     let (mut reader, handle) = MockReader::new(IdentifierKind::Qr);
///     handle.present("ticket-1");
///
///     let path = DevicePath::new("/dev/ttyACM0");
///     let id = reader.read_identifier(&path, Duration::from_secs(5)).await?;
///     assert_eq!(id.unwrap().value, "ticket-1");
///     assert_eq!(handle.polls(), 1);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockReader {
    kind: IdentifierKind,
    event_rx: mpsc::UnboundedReceiver<ReadEvent>,
    polls: Arc<AtomicUsize>,
}

impl MockReader {
    pub fn new(kind: IdentifierKind) -> (Self, MockReaderHandle) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let polls = Arc::new(AtomicUsize::new(0));

        let reader = Self {
            kind,
            event_rx,
            polls: Arc::clone(&polls),
        };
        let handle = MockReaderHandle { event_tx, polls };
        (reader, handle)
    }
}

impl IdentifierReader for MockReader {
    fn kind(&self) -> IdentifierKind {
        self.kind
    }

    async fn read_identifier(
        &mut self,
        path: &DevicePath,
        timeout: Duration,
    ) -> Result<Option<Identifier>> {
        self.polls.fetch_add(1, Ordering::SeqCst);

        match tokio::time::timeout(timeout, self.event_rx.recv()).await {
            Ok(Some(ReadEvent::Value(value))) => Ok(Some(Identifier::new(self.kind, value))),
            Ok(Some(ReadEvent::Fault(message))) => Err(HardwareError::disconnected(format!(
                "{path}: {message}"
            ))),
            Ok(None) => {
                // Handle dropped: behave like an idle device.
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
            Err(_) => Ok(None),
        }
    }
}

/// Test-side control for a [`MockReader`].
#[derive(Debug, Clone)]
pub struct MockReaderHandle {
    event_tx: mpsc::UnboundedSender<ReadEvent>,
    polls: Arc<AtomicUsize>,
}

impl MockReaderHandle {
    /// Queue a value for the next read attempt.
    pub fn present(&self, value: impl Into<String>) {
        let _ = self.event_tx.send(ReadEvent::Value(value.into()));
    }

    /// Queue a value produced by typing `codes` on a keyboard-emulation reader.
    ///
    /// The codes run through the same report assembly and duplicate
    /// collapsing as the hidraw reader. Nothing is queued for an empty record.
    pub fn present_keycodes(&self, codes: &[u8]) {
        let mut assembler = KeyReportAssembler::new();
        for &code in codes {
            for report in keystroke_reports(code) {
                if let Some(record) = assembler.push_report(&report) {
                    if !record.is_empty() {
                        self.present(strip_duplicate(&record, DEFAULT_DUPLICATE_WINDOW));
                    }
                }
            }
        }
    }

    /// Make the next read attempt fail as if the device vanished.
    pub fn fail(&self, message: impl Into<String>) {
        let _ = self.event_tx.send(ReadEvent::Fault(message.into()));
    }

    /// Number of read attempts made so far.
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> DevicePath {
        DevicePath::new("/dev/hidraw0")
    }

    #[tokio::test(start_paused = true)]
    async fn test_presented_value_is_read() {
        let (mut reader, handle) = MockReader::new(IdentifierKind::Rfid);
        handle.present("04a1");

        let id = reader
            .read_identifier(&path(), Duration::from_secs(3))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(id.kind, IdentifierKind::Rfid);
        assert_eq!(id.value, "04a1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_reader_times_out() {
        let (mut reader, handle) = MockReader::new(IdentifierKind::Rfid);
        let started = tokio::time::Instant::now();

        let id = reader.read_identifier(&path(), Duration::from_secs(3)).await.unwrap();
        assert_eq!(id, None);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(handle.polls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keycodes_scenario_abc() {
        let (mut reader, handle) = MockReader::new(IdentifierKind::Rfid);
        handle.present_keycodes(&[4, 5, 6, 40]);

        let id = reader
            .read_identifier(&path(), Duration::from_secs(3))
            .await
            .unwrap();
        assert_eq!(id.unwrap().value, "abc");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fault_is_error() {
        let (mut reader, handle) = MockReader::new(IdentifierKind::Qr);
        handle.fail("unplugged");

        let result = reader.read_identifier(&path(), Duration::from_secs(5)).await;
        assert!(matches!(result, Err(HardwareError::Disconnected { .. })));
    }
}
