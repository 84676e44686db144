//! Line framing over the protocol byte streams.
//!
//! Inbound frames are single `\n`-terminated lines. Outbound frames are
//! written as `\n<payload>\n` and flushed immediately: the leading line break
//! keeps a protocol line from sharing a line with stray output that another
//! component wrote to the same stream without a terminator.

use std::io::{BufRead, Write};

use tracing::{debug, trace};

use crate::error::ProtocolError;
use crate::protocol::{Frame, OutboundMessage};

/// Tracing target for framing operations.
const FRAME_TARGET: &str = "multilang_protocol::frame";

/// Reads and writes protocol frames over a pair of byte streams.
///
/// The framer exclusively owns both streams. Reads block without timeout:
/// stream lifetime belongs to the daemon.
#[derive(Debug)]
pub struct Framer<R, W> {
    reader: R,
    writer: W,
    line: Vec<u8>,
}

impl<R: BufRead, W: Write> Framer<R, W> {
    /// Creates a framer over the given input and output streams.
    #[must_use]
    pub const fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            line: Vec::new(),
        }
    }

    /// Blocks until one full line is available and parses it as a [`Frame`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Io`] if the read fails,
    /// [`ProtocolError::EndOfStream`] if the stream closes before a line
    /// terminator, and [`ProtocolError::Decode`] if the line is not UTF-8 or
    /// not a frame.
    pub fn read_frame(&mut self) -> Result<Frame, ProtocolError> {
        self.line.clear();
        let bytes_read = self
            .reader
            .read_until(b'\n', &mut self.line)
            .map_err(|source| ProtocolError::io("reading a frame", source))?;

        if self.line.last() != Some(&b'\n') {
            return Err(ProtocolError::EndOfStream { bytes_read });
        }

        trace!(
            target: FRAME_TARGET,
            bytes_read,
            "read inbound line"
        );
        let text = std::str::from_utf8(&self.line).map_err(|error| {
            ProtocolError::decode(format!("frame is not valid UTF-8: {error}"))
        })?;
        Frame::parse(text.trim_end())
    }

    /// Writes one payload bracketed by line breaks and flushes the stream.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Io`] if writing or flushing fails.
    pub fn write_frame(&mut self, payload: &[u8]) -> Result<(), ProtocolError> {
        let write = |writer: &mut W| -> std::io::Result<()> {
            writer.write_all(b"\n")?;
            writer.write_all(payload)?;
            writer.write_all(b"\n")?;
            writer.flush()
        };
        write(&mut self.writer).map_err(|source| ProtocolError::io("writing a frame", source))
    }

    /// Serialises `message` and writes it as one frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if serialisation fails and
    /// [`ProtocolError::Io`] if writing fails.
    pub fn write_message(&mut self, message: &OutboundMessage) -> Result<(), ProtocolError> {
        let json = message.to_json()?;
        debug!(
            target: FRAME_TARGET,
            frame = %json,
            "writing outbound frame"
        );
        self.write_frame(json.as_bytes())
    }

    /// Releases the underlying streams.
    #[must_use]
    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}
