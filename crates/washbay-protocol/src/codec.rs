//! Tokio codec for the controller link.
//!
//! Wraps [`LineAssembler`] and [`parse_inbound`] so the link can run over
//! `Framed<transport, LinkCodec>`:
//!
//! ```text
//! serial bytes -> Decoder -> Inbound
//! Outbound -> Encoder -> "<line>\n"
//! ```
//!
//! Decoding never fails on content: malformed lines become
//! [`Inbound::Unrecognized`] and oversized lines are dropped and counted.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use washbay_core::config::IdentifierFormat;
use washbay_core::constants::MAX_LINE_LEN;
use washbay_core::{Error, Result};

use crate::line::{LineAssembler, LineEvent};
use crate::message::{Inbound, Outbound, parse_inbound};

/// Newline-delimited codec for controller traffic.
#[derive(Debug)]
pub struct LinkCodec {
    lines: LineAssembler,
    format: IdentifierFormat,
    max_line_len: usize,
    dropped: usize,
}

impl LinkCodec {
    /// Create a codec emitting identifiers in `format`.
    pub fn new(format: IdentifierFormat) -> Self {
        Self::with_max_line_len(format, MAX_LINE_LEN)
    }

    pub fn with_max_line_len(format: IdentifierFormat, max_line_len: usize) -> Self {
        Self {
            lines: LineAssembler::with_max_len(max_line_len),
            format,
            max_line_len,
            dropped: 0,
        }
    }

    pub fn format(&self) -> IdentifierFormat {
        self.format
    }

    /// Number of oversized inbound lines discarded so far.
    pub fn dropped_lines(&self) -> usize {
        self.dropped
    }
}

impl Default for LinkCodec {
    fn default() -> Self {
        Self::new(IdentifierFormat::default())
    }
}

impl Decoder for LinkCodec {
    type Item = Inbound;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Inbound>> {
        if !src.is_empty() {
            // All bytes now belong to the assembler.
            self.lines.push(src);
            src.clear();
        }

        while let Some(event) = self.lines.next_event() {
            match event {
                LineEvent::Line(line) => return Ok(Some(parse_inbound(&line))),
                LineEvent::Overflow { .. } => self.dropped += 1,
            }
        }
        Ok(None)
    }
}

impl Encoder<Outbound> for LinkCodec {
    type Error = Error;

    fn encode(&mut self, item: Outbound, dst: &mut BytesMut) -> Result<()> {
        let line = item.encode(self.format)?;
        if line.len() > self.max_line_len {
            return Err(Error::FrameTooLarge {
                size: line.len(),
                max_size: self.max_line_len,
            });
        }

        dst.reserve(line.len() + 1);
        dst.extend_from_slice(line.as_bytes());
        dst.extend_from_slice(b"\n");
        Ok(())
    }
}
