//! Newline framing shared by the QR scanner stream and the controller link.
//!
//! Bytes are buffered until `\n`; each completed line is decoded leniently
//! (invalid UTF-8 sequences are dropped, not rejected) and trimmed. Blank
//! lines are skipped. A buffer that grows past the maximum line length
//! without a newline is discarded so a chattering peripheral cannot grow
//! memory without bound.

use bytes::{Buf, BytesMut};
use washbay_core::constants::MAX_LINE_LEN;

/// Decode bytes as text, dropping invalid sequences, and trim whitespace.
///
/// # Examples
///
/// ```
/// use washbay_protocol::line::decode_lossy;
///
/// assert_eq!(decode_lossy(b"  QR-42\r"), "QR-42");
/// assert_eq!(decode_lossy(b"ab\xffc"), "abc");
/// ```
#[must_use]
pub fn decode_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Result of pulling from a [`LineAssembler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// A complete, non-blank line.
    Line(String),
    /// The buffer exceeded the limit and `len` bytes were dropped.
    Overflow { len: usize },
}

/// Incremental newline splitter.
///
/// # Examples
///
/// ```
/// use washbay_protocol::line::{LineAssembler, LineEvent};
///
/// let mut lines = LineAssembler::new();
/// lines.push(b"MODE:");
/// assert_eq!(lines.next_event(), None);
///
/// lines.push(b"QR\r\n\n");
/// assert_eq!(lines.next_event(), Some(LineEvent::Line("MODE:QR".into())));
/// assert_eq!(lines.next_event(), None);
/// ```
#[derive(Debug)]
pub struct LineAssembler {
    buffer: BytesMut,
    max_len: usize,
}

impl LineAssembler {
    /// Create an assembler with the default maximum line length.
    pub fn new() -> Self {
        Self::with_max_len(MAX_LINE_LEN)
    }

    /// Create an assembler with a custom maximum line length.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(256),
            max_len,
        }
    }

    /// Append raw bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Pull the next complete line or overflow notice.
    ///
    /// Returns `None` when more bytes are needed.
    pub fn next_event(&mut self) -> Option<LineEvent> {
        loop {
            match self.buffer.iter().position(|&b| b == b'\n') {
                Some(pos) if pos > self.max_len => {
                    self.buffer.advance(pos + 1);
                    return Some(LineEvent::Overflow { len: pos });
                }
                Some(pos) => {
                    let raw = self.buffer.split_to(pos + 1);
                    let line = decode_lossy(&raw[..pos]);
                    if !line.is_empty() {
                        return Some(LineEvent::Line(line));
                    }
                }
                None if self.buffer.len() > self.max_len => {
                    let len = self.buffer.len();
                    self.buffer.clear();
                    return Some(LineEvent::Overflow { len });
                }
                None => return None,
            }
        }
    }

    /// Pull the next complete line, skipping overflow notices.
    pub fn next_line(&mut self) -> Option<String> {
        while let Some(event) = self.next_event() {
            if let LineEvent::Line(line) = event {
                return Some(line);
            }
        }
        None
    }

    /// Bytes buffered without a terminating newline yet.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_line_waits() {
        let mut lines = LineAssembler::new();
        lines.push(b"https://example.com/t");
        assert_eq!(lines.next_line(), None);
        assert_eq!(lines.pending(), 21);

        lines.push(b"?id=7\n");
        assert_eq!(lines.next_line().as_deref(), Some("https://example.com/t?id=7"));
        assert_eq!(lines.pending(), 0);
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let mut lines = LineAssembler::new();
        lines.push(b"one\ntwo\r\nthree");
        assert_eq!(lines.next_line().as_deref(), Some("one"));
        assert_eq!(lines.next_line().as_deref(), Some("two"));
        assert_eq!(lines.next_line(), None);
        assert_eq!(lines.pending(), 5);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let mut lines = LineAssembler::new();
        lines.push(b"\r\n   \n\nvalue\n");
        assert_eq!(lines.next_line().as_deref(), Some("value"));
    }

    #[test]
    fn test_invalid_utf8_dropped() {
        let mut lines = LineAssembler::new();
        lines.push(b"\xfe\xffQR\xc3-1\n");
        assert_eq!(lines.next_line().as_deref(), Some("QR-1"));
    }

    #[test]
    fn test_overflow_without_newline() {
        let mut lines = LineAssembler::with_max_len(8);
        lines.push(b"0123456789");
        assert_eq!(lines.next_event(), Some(LineEvent::Overflow { len: 10 }));
        assert_eq!(lines.pending(), 0);

        lines.push(b"ok\n");
        assert_eq!(lines.next_line().as_deref(), Some("ok"));
    }

    #[test]
    fn test_overlong_terminated_line_dropped() {
        let mut lines = LineAssembler::with_max_len(4);
        lines.push(b"toolong\nfine\n");
        assert_eq!(lines.next_event(), Some(LineEvent::Overflow { len: 7 }));
        assert_eq!(lines.next_event(), Some(LineEvent::Line("fine".into())));
    }

    #[test]
    fn test_clear() {
        let mut lines = LineAssembler::new();
        lines.push(b"partial");
        lines.clear();
        lines.push(b"\n");
        assert_eq!(lines.next_line(), None);
    }
}
