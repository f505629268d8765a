//! HTTP head encoder implementation for serializing the start line and header fields
//!
//! The head is treated as a list of segments: the start line, one segment per header,
//! and the terminating blank line. Each segment is written straight from the message's
//! borrowed bytes; only the segment index and the offset inside it survive between calls.

use bytes::BytesMut;
use tracing::trace;

use crate::codec::framing::StartLineRef;
use crate::codec::output::PieceWriter;
use crate::protocol::Header;

const HTTP_11: &[u8] = b"HTTP/1.1";
const CRLF: &[u8] = b"\r\n";

/// Streams the message head into bounded output buffers.
#[derive(Debug, Default)]
pub(crate) struct HeaderEncoder {
    segment: usize,
    writer: PieceWriter,
}

impl HeaderEncoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Writes as much of the head as fits into `dst`. Returns true once the blank line
    /// ending the head has been written.
    ///
    /// Values were validated when the message was built and are copied verbatim.
    pub(crate) fn encode(&mut self, start_line: &StartLineRef<'_>, headers: &[Header], dst: &mut BytesMut) -> bool {
        loop {
            let finished = match self.segment {
                0 => self.encode_start_line(start_line, dst),
                index if index <= headers.len() => {
                    let header = &headers[index - 1];
                    self.writer.write(dst, &[header.name(), b": ", header.value(), CRLF])
                }
                index if index == headers.len() + 1 => self.writer.write(dst, &[CRLF]),
                _ => return true,
            };

            if !finished {
                trace!(segment = self.segment, offset = self.writer.offset(), "head encoding paused, output buffer full");
                return false;
            }
            self.segment += 1;
        }
    }

    fn encode_start_line(&mut self, start_line: &StartLineRef<'_>, dst: &mut BytesMut) -> bool {
        match start_line {
            StartLineRef::Request { method, path } => self.writer.write(dst, &[*method, b" ", *path, b" ", HTTP_11, CRLF]),
            StartLineRef::Response { status, reason } => {
                self.writer.write(dst, &[HTTP_11, b" ", status.as_str().as_bytes(), b" ", *reason, CRLF])
            }
        }
    }
}
