//! Encoder implementation for HTTP chunked transfer encoding.
//!
//! Body data is sent as a series of `<hex-size>CRLF<data>CRLF` frames followed by exactly
//! one last chunk (`0CRLF`, optional trailers, `CRLF`), as specified in
//! [RFC 9112 Section 7.1](https://www.rfc-editor.org/rfc/rfc9112#section-7.1).
//!
//! Data comes from two places, drained in this order:
//! - the message's body source, cut into frames that fit the output buffer (or buffered
//!   when the output buffer is too small to hold a whole frame)
//! - the caller's chunk queue, one frame per [`Chunk`], never split or merged

use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use tracing::{error, trace};

use crate::codec::output::{PieceWriter, spare_capacity};
use crate::codec::syntax::{hex_len, write_hex};
use crate::protocol::body::{BodyRead, BodySource};
use crate::protocol::{Chunk, ChunkReceiver, NextChunk, SendError};

const CRLF: &[u8] = b"\r\n";
const TERMINATOR: &[u8] = b"0\r\n\r\n";

/// Fixed bytes around the data of one frame: the size line's CRLF and the trailing CRLF.
const FRAME_OVERHEAD: usize = 4;

#[derive(Debug)]
pub(crate) struct ChunkedEncoder {
    max_chunk_size: usize,
    source_eof: bool,
    in_flight: Option<Frame>,
    writer: PieceWriter,
    eof: bool,
    send_size: u64,
}

/// A frame that has started, or is about to start, going out.
#[derive(Debug)]
enum Frame {
    /// size line (with extensions), then data, then CRLF
    Data { head: Bytes, data: Bytes },
    /// the whole last chunk, trailers included
    Last { bytes: Bytes },
}

impl Frame {
    fn from_chunk(chunk: Chunk) -> Self {
        if chunk.is_last() {
            return Self::last(&chunk);
        }

        let mut head = BytesMut::with_capacity(hex_len(chunk.data().len()) + CRLF.len());
        put_hex(&mut head, chunk.data().len());
        put_extensions(&mut head, &chunk);
        head.extend_from_slice(CRLF);
        Self::Data { head: head.freeze(), data: chunk.data().clone() }
    }

    fn last(chunk: &Chunk) -> Self {
        if chunk.extensions().is_empty() && chunk.trailers().is_none() {
            return Self::terminator();
        }

        let mut bytes = BytesMut::new();
        bytes.extend_from_slice(b"0");
        put_extensions(&mut bytes, chunk);
        bytes.extend_from_slice(CRLF);
        for trailer in chunk.trailers().into_iter().flatten() {
            bytes.extend_from_slice(trailer.name());
            bytes.extend_from_slice(b": ");
            bytes.extend_from_slice(trailer.value());
            bytes.extend_from_slice(CRLF);
        }
        bytes.extend_from_slice(CRLF);
        Self::Last { bytes: bytes.freeze() }
    }

    fn terminator() -> Self {
        Self::Last { bytes: Bytes::from_static(TERMINATOR) }
    }

    fn pieces(&self) -> [&[u8]; 3] {
        match self {
            Frame::Data { head, data } => [head, data, CRLF],
            Frame::Last { bytes } => [bytes, &[], &[]],
        }
    }

    fn data_len(&self) -> usize {
        match self {
            Frame::Data { data, .. } => data.len(),
            Frame::Last { .. } => 0,
        }
    }

    fn is_last(&self) -> bool {
        matches!(self, Frame::Last { .. })
    }
}

fn put_hex(dst: &mut BytesMut, n: usize) {
    let mut digits = [0u8; 16];
    write_hex(n, &mut digits);
    dst.extend_from_slice(&digits[..hex_len(n)]);
}

fn put_extensions(dst: &mut BytesMut, chunk: &Chunk) {
    for extension in chunk.extensions() {
        dst.extend_from_slice(b";");
        dst.extend_from_slice(extension.name());
        if let Some(value) = extension.value() {
            dst.extend_from_slice(b"=");
            dst.extend_from_slice(value);
        }
    }
}

/// What one attempt to cut a frame from the body source achieved.
enum SourceProgress {
    Wrote,
    Stalled,
    Eof,
}

impl ChunkedEncoder {
    pub(crate) fn new(max_chunk_size: usize) -> Self {
        Self { max_chunk_size, source_eof: false, in_flight: None, writer: PieceWriter::new(), eof: false, send_size: 0 }
    }

    pub(crate) fn is_finish(&self) -> bool {
        self.eof
    }

    /// Returns true once the last chunk has been written completely.
    pub(crate) fn encode<B: BodySource>(
        &mut self,
        mut source: Option<&mut B>,
        mut chunks: Option<&mut ChunkReceiver>,
        dst: &mut BytesMut,
    ) -> Result<bool, SendError> {
        if self.eof {
            return Ok(true);
        }

        loop {
            if let Some(frame) = &self.in_flight {
                if !self.writer.write(dst, &frame.pieces()) {
                    return Ok(false);
                }

                self.send_size += frame.data_len() as u64;
                let last = frame.is_last();
                self.in_flight = None;
                if last {
                    trace!(send_size = self.send_size, "chunked body finished");
                    self.eof = true;
                    return Ok(true);
                }
                continue;
            }

            if !self.source_eof {
                if let Some(source) = source.as_deref_mut() {
                    match self.encode_source(source, dst)? {
                        SourceProgress::Wrote => continue,
                        SourceProgress::Stalled => return Ok(false),
                        SourceProgress::Eof => {
                            trace!(send_size = self.send_size, "body source finished");
                            self.source_eof = true;
                            continue;
                        }
                    }
                }
            }

            let frame = match chunks.as_deref_mut() {
                Some(chunks) => match chunks.next_chunk() {
                    NextChunk::Ready(chunk) => Frame::from_chunk(chunk),
                    NextChunk::Pending => return Ok(false),
                    NextChunk::Closed => Frame::terminator(),
                },
                None => Frame::terminator(),
            };
            self.in_flight = Some(frame);
        }
    }

    /// Cuts one frame from the body source directly into `dst`.
    ///
    /// The data is read behind room for the widest size line that could be needed, then
    /// shifted left when the actual size needs fewer digits, so it is copied only once
    /// from the source.
    fn encode_source<B: BodySource>(&mut self, source: &mut B, dst: &mut BytesMut) -> Result<SourceProgress, SendError> {
        let space = spare_capacity(dst);
        if space == 0 {
            return Ok(SourceProgress::Stalled);
        }
        let max_data = space.saturating_sub(hex_len(space) + FRAME_OVERHEAD).min(self.max_chunk_size);
        if max_data == 0 {
            return self.buffer_source_frame(source);
        }

        let digits = hex_len(max_data);
        let start = dst.len();
        let data_start = start + digits + CRLF.len();
        dst.resize(data_start + max_data, 0);

        match source.read(&mut dst[data_start..]) {
            Ok(BodyRead::Data(n)) if n > max_data => {
                dst.truncate(start);
                Err(SendError::invalid_body(format!("body source reported {n} bytes for a {max_data} byte buffer")))
            }
            Ok(BodyRead::Data(n)) if n > 0 => {
                let head_end = start + hex_len(n) + CRLF.len();
                if head_end < data_start {
                    dst.copy_within(data_start..data_start + n, head_end);
                }
                write_hex(n, &mut dst[start..]);
                dst[head_end - CRLF.len()..head_end].copy_from_slice(CRLF);
                dst.truncate(head_end + n);
                dst.extend_from_slice(CRLF);
                self.send_size += n as u64;
                Ok(SourceProgress::Wrote)
            }
            Ok(BodyRead::Data(_) | BodyRead::Pending) => {
                dst.truncate(start);
                Ok(SourceProgress::Stalled)
            }
            Ok(BodyRead::Eof) => {
                dst.truncate(start);
                Ok(SourceProgress::Eof)
            }
            Err(e) => {
                dst.truncate(start);
                error!(cause = %e, "failed to read body source");
                Err(SendError::io(e))
            }
        }
    }

    /// Reads one frame of source data into an owned buffer and queues it as the in-flight
    /// frame, for output buffers too small to hold a frame written in place.
    fn buffer_source_frame<B: BodySource>(&mut self, source: &mut B) -> Result<SourceProgress, SendError> {
        let mut data = BytesMut::zeroed(self.max_chunk_size);
        match source.read(&mut data) {
            Ok(BodyRead::Data(n)) if n > self.max_chunk_size => Err(SendError::invalid_body(format!(
                "body source reported {n} bytes for a {} byte buffer",
                self.max_chunk_size
            ))),
            Ok(BodyRead::Data(n)) if n > 0 => {
                data.truncate(n);
                let mut head = BytesMut::with_capacity(hex_len(n) + CRLF.len());
                put_hex(&mut head, n);
                head.extend_from_slice(CRLF);
                trace!(size = n, "body source frame buffered for a small output buffer");
                self.in_flight = Some(Frame::Data { head: head.freeze(), data: data.freeze() });
                Ok(SourceProgress::Wrote)
            }
            Ok(BodyRead::Data(_) | BodyRead::Pending) => Ok(SourceProgress::Stalled),
            Ok(BodyRead::Eof) => Ok(SourceProgress::Eof),
            Err(e) => {
                error!(cause = %e, "failed to read body source");
                Err(SendError::io(e))
            }
        }
    }

    pub(crate) fn poll_ready<B: BodySource>(
        &mut self,
        source: Option<&mut B>,
        chunks: Option<&mut ChunkReceiver>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), SendError>> {
        if self.eof || self.in_flight.is_some() {
            return Poll::Ready(Ok(()));
        }

        match (source, chunks) {
            (Some(source), _) if !self.source_eof => source.poll_ready(cx).map_err(SendError::io),
            (_, Some(chunks)) => chunks.poll_ready(cx).map(Ok),
            _ => Poll::Ready(Ok(())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::body::body_channel;
    use crate::protocol::{Headers, chunk_channel};

    /// Runs the encoder to completion with buffers of `capacity` bytes.
    fn encode_all<B: BodySource>(
        encoder: &mut ChunkedEncoder,
        mut source: Option<&mut B>,
        mut chunks: Option<&mut ChunkReceiver>,
        capacity: usize,
    ) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let mut dst = BytesMut::with_capacity(capacity);
            let finished = encoder.encode(source.as_deref_mut(), chunks.as_deref_mut(), &mut dst).unwrap();
            out.extend_from_slice(&dst);
            if finished {
                return out;
            }
        }
    }

    #[test]
    fn no_data_is_just_the_terminator() {
        let mut encoder = ChunkedEncoder::new(1024);
        let out = encode_all::<Bytes>(&mut encoder, None, None, 64);
        assert_eq!(out, b"0\r\n\r\n");
        assert!(encoder.is_finish());
    }

    #[test]
    fn body_source_frames() {
        let mut source = Bytes::from_static(b"write more tests");
        let mut encoder = ChunkedEncoder::new(1024);
        let out = encode_all(&mut encoder, Some(&mut source), None, 1024);
        assert_eq!(out, b"10\r\nwrite more tests\r\n0\r\n\r\n");
    }

    #[test]
    fn body_source_respects_max_chunk_size() {
        let mut source = Bytes::from_static(b"write more tests");
        let mut encoder = ChunkedEncoder::new(6);
        let out = encode_all(&mut encoder, Some(&mut source), None, 1024);
        assert_eq!(out, b"6\r\nwrite \r\n6\r\nmore t\r\n4\r\nests\r\n0\r\n\r\n");
    }

    #[test]
    fn body_source_shifts_data_after_short_read() {
        // 300 bytes of space asks for 0x125 bytes, the source only has 0x10
        let (sender, mut receiver) = body_channel();
        sender.send_data("0123456789abcdef").unwrap();
        drop(sender);

        let mut encoder = ChunkedEncoder::new(1024);
        let out = encode_all(&mut encoder, Some(&mut receiver), None, 300);
        assert_eq!(out, b"10\r\n0123456789abcdef\r\n0\r\n\r\n");
    }

    #[test]
    fn tiny_buffers_still_make_progress() {
        for capacity in 1..=5 {
            let mut source = Bytes::from_static(b"abc");
            let mut encoder = ChunkedEncoder::new(1024);
            let out = encode_all(&mut encoder, Some(&mut source), None, capacity);
            assert_eq!(out, b"3\r\nabc\r\n0\r\n\r\n", "capacity {capacity}");
        }
    }

    #[test]
    fn tiny_buffers_respect_max_chunk_size() {
        let (sender, mut receiver) = body_channel();
        sender.send_data("write more tests").unwrap();
        drop(sender);

        let mut encoder = ChunkedEncoder::new(10);
        let out = encode_all(&mut encoder, Some(&mut receiver), None, 3);
        assert_eq!(out, b"a\r\nwrite more\r\n6\r\n tests\r\n0\r\n\r\n");
    }

    #[test]
    fn full_buffer_stalls_without_reading() {
        let mut source = Bytes::from_static(b"abc");
        let mut encoder = ChunkedEncoder::new(1024);
        let mut dst = BytesMut::with_capacity(4);
        dst.extend_from_slice(b"full");

        assert!(!encoder.encode(Some(&mut source), None, &mut dst).unwrap());
        assert_eq!(&dst[..], b"full");
        assert_eq!(&source[..], b"abc");
    }

    #[test]
    fn explicit_chunks_in_order() {
        let (sender, mut chunks) = chunk_channel();
        sender.send(Chunk::new("hello")).unwrap();
        sender.send(Chunk::new(", world!!!!!!!!!!").with_extension("ext", None).unwrap()).unwrap();
        drop(sender);

        let mut encoder = ChunkedEncoder::new(1024);
        let out = encode_all::<Bytes>(&mut encoder, None, Some(&mut chunks), 4);
        assert_eq!(out, b"5\r\nhello\r\n11;ext\r\n, world!!!!!!!!!!\r\n0\r\n\r\n");
    }

    #[test]
    fn explicit_empty_chunk_is_the_only_terminator() {
        let (sender, mut chunks) = chunk_channel();
        sender.send(Chunk::new("data")).unwrap();
        sender.send(Chunk::last()).unwrap();
        drop(sender);

        let mut encoder = ChunkedEncoder::new(1024);
        let out = encode_all::<Bytes>(&mut encoder, None, Some(&mut chunks), 64);
        assert_eq!(out, b"4\r\ndata\r\n0\r\n\r\n");
    }

    #[test]
    fn last_chunk_with_extension_and_trailers() {
        let mut trailers = Headers::new();
        trailers.add("X-Checksum", "abc").add("X-Count", "2");
        let last = Chunk::last().with_extension("done", Some(Bytes::from_static(b"1"))).unwrap().with_trailers(trailers).unwrap();

        let (sender, mut chunks) = chunk_channel();
        sender.send(last).unwrap();
        // chunks after the last chunk are never written
        sender.send(Chunk::new("ignored")).unwrap();

        let mut encoder = ChunkedEncoder::new(1024);
        let out = encode_all::<Bytes>(&mut encoder, None, Some(&mut chunks), 8);
        assert_eq!(out, b"0;done=1\r\nX-Checksum: abc\r\nX-Count: 2\r\n\r\n");
    }

    #[test]
    fn source_then_queue() {
        let mut source = Bytes::from_static(b"abc");
        let (sender, mut chunks) = chunk_channel();
        sender.send(Chunk::new("de")).unwrap();
        drop(sender);

        let mut encoder = ChunkedEncoder::new(1024);
        let out = encode_all(&mut encoder, Some(&mut source), Some(&mut chunks), 64);
        assert_eq!(out, b"3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n");
    }

    #[test]
    fn open_queue_stalls_until_more_chunks() {
        let (sender, mut chunks) = chunk_channel();
        let mut encoder = ChunkedEncoder::new(1024);
        let mut dst = BytesMut::with_capacity(64);

        assert!(!encoder.encode::<Bytes>(None, Some(&mut chunks), &mut dst).unwrap());
        assert!(dst.is_empty());

        sender.send(Chunk::new("a")).unwrap();
        assert!(!encoder.encode::<Bytes>(None, Some(&mut chunks), &mut dst).unwrap());
        assert_eq!(&dst[..], b"1\r\na\r\n");

        drop(sender);
        assert!(encoder.encode::<Bytes>(None, Some(&mut chunks), &mut dst).unwrap());
        assert_eq!(&dst[..], b"1\r\na\r\n0\r\n\r\n");

        // finished encoders stay finished
        assert!(encoder.encode::<Bytes>(None, Some(&mut chunks), &mut dst).unwrap());
        assert_eq!(&dst[..], b"1\r\na\r\n0\r\n\r\n");
    }

    #[test]
    fn body_source_error_is_propagated() {
        let (sender, mut receiver) = body_channel();
        sender.abort(std::io::Error::other("boom"));

        let mut encoder = ChunkedEncoder::new(1024);
        let mut dst = BytesMut::with_capacity(64);
        let err = encoder.encode(Some(&mut receiver), None, &mut dst).unwrap_err();
        assert!(matches!(err, SendError::Io { .. }));
        assert!(dst.is_empty());
    }
}
