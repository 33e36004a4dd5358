//! Newline framing over a partial-read-prone byte stream
//!
//! TCP has no message boundaries: one read may hold half a line, several
//! lines, or a line whose terminator arrives in the next read. [`LineCodec`]
//! scans an accumulating buffer and splits off each complete line; bytes after
//! the last terminator stay buffered until more data arrives.
//!
//! The codec plugs into [`tokio_util::codec::FramedRead`] for sessions, and
//! [`LineFramer`] wraps it with its own buffer for callers that push bytes by
//! hand.
//!
//! ```rust
//! use fuelwatch::framer::LineFramer;
//!
//! let mut framer = LineFramer::new();
//! assert!(framer.feed(b"PLANE-").is_empty());
//! assert_eq!(framer.feed(b"7\n3_3_2023 1"), vec!["PLANE-7".to_string()]);
//! assert_eq!(framer.buffered(), 10);
//! ```

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

/// Byte that terminates every logical line.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Line splitter usable as a `tokio_util` decoder.
///
/// Lines are yielded without their terminator. Invalid UTF-8 is replaced
/// rather than rejected so that a corrupt byte only spoils its own line.
/// Unterminated residual bytes at end of stream are discarded.
#[derive(Debug, Default, Clone)]
pub struct LineCodec {
    /// Offset up to which the buffer is known to hold no terminator.
    next_index: usize,
}

impl LineCodec {
    /// Create a new codec
    pub fn new() -> Self {
        Self::default()
    }

    /// Split the next complete line off the front of `buf`, if there is one.
    pub fn next_line(&mut self, buf: &mut BytesMut) -> Option<String> {
        let start = self.next_index.min(buf.len());
        match buf[start..].iter().position(|b| *b == LINE_TERMINATOR) {
            Some(offset) => {
                let end = start + offset;
                let mut line = buf.split_to(end + 1);
                line.truncate(end);
                self.next_index = 0;
                Some(String::from_utf8_lossy(&line).into_owned())
            }
            None => {
                self.next_index = buf.len();
                None
            }
        }
    }

    /// Drop any partial line left in `buf`, returning how many bytes went.
    pub fn discard_residual(&mut self, buf: &mut BytesMut) -> usize {
        let discarded = buf.len();
        buf.clear();
        self.next_index = 0;
        discarded
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(self.next_line(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.next_line(src) {
            return Ok(Some(line));
        }
        let discarded = self.discard_residual(src);
        if discarded > 0 {
            trace!("Discarding {} bytes of unterminated line at end of stream", discarded);
        }
        Ok(None)
    }
}

/// Push-style framer owning its byte accumulator.
#[derive(Debug, Default)]
pub struct LineFramer {
    codec: LineCodec,
    buffer: BytesMut,
}

impl LineFramer {
    /// Create an empty framer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and return every line completed by them, in order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(line) = self.codec.next_line(&mut self.buffer) {
            lines.push(line);
        }
        lines
    }

    /// End of stream: discard the unterminated tail and return its length.
    pub fn finish(&mut self) -> usize {
        self.codec.discard_residual(&mut self.buffer)
    }

    /// Number of bytes waiting for a terminator.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
