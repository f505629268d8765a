use std::task::{Context, Poll};

use bytes::BytesMut;
use tracing::{error, trace};

use crate::codec::output::spare_capacity;
use crate::protocol::SendError;
use crate::protocol::body::{BodyRead, BodySource};

/// Copies exactly `length` body bytes, straight from the source into the output buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LengthEncoder {
    length: u64,
    written: u64,
}

impl LengthEncoder {
    pub(crate) fn new(length: u64) -> Self {
        Self { length, written: 0 }
    }

    pub(crate) fn is_finish(&self) -> bool {
        self.written == self.length
    }

    /// Returns true once `length` bytes have been written.
    ///
    /// A source that ends early is a short body: the message on the wire is already
    /// truncated, so this is an error rather than padding.
    pub(crate) fn encode<B: BodySource>(&mut self, source: Option<&mut B>, dst: &mut BytesMut) -> Result<bool, SendError> {
        if self.is_finish() {
            return Ok(true);
        }

        let Some(source) = source else {
            error!(expected = self.length, "content-length declared but message has no body source");
            return Err(SendError::short_body(self.length, self.written));
        };

        loop {
            let remaining = self.length - self.written;
            if remaining == 0 {
                trace!(length = self.length, "fixed length body finished");
                return Ok(true);
            }

            let space = spare_capacity(dst);
            if space == 0 {
                return Ok(false);
            }

            let size = usize::try_from(remaining).map_or(space, |remaining| remaining.min(space));
            let start = dst.len();
            dst.resize(start + size, 0);

            match source.read(&mut dst[start..]) {
                Ok(BodyRead::Data(n)) if n > size => {
                    dst.truncate(start);
                    return Err(SendError::invalid_body(format!("body source reported {n} bytes for a {size} byte buffer")));
                }
                Ok(BodyRead::Data(n)) if n > 0 => {
                    dst.truncate(start + n);
                    self.written += n as u64;
                }
                Ok(BodyRead::Data(_) | BodyRead::Pending) => {
                    dst.truncate(start);
                    return Ok(false);
                }
                Ok(BodyRead::Eof) => {
                    dst.truncate(start);
                    error!(expected = self.length, written = self.written, "body source ended before content-length");
                    return Err(SendError::short_body(self.length, self.written));
                }
                Err(e) => {
                    dst.truncate(start);
                    error!(cause = %e, "failed to read body source");
                    return Err(SendError::io(e));
                }
            }
        }
    }

    pub(crate) fn poll_ready<B: BodySource>(&mut self, source: Option<&mut B>, cx: &mut Context<'_>) -> Poll<Result<(), SendError>> {
        match source {
            Some(source) if !self.is_finish() => source.poll_ready(cx).map_err(SendError::io),
            _ => Poll::Ready(Ok(())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::body::body_channel;
    use bytes::Bytes;

    #[test]
    fn writes_exactly_length_bytes() {
        let mut source = Bytes::from_static(b"write more tests and more");
        let mut encoder = LengthEncoder::new(16);
        let mut dst = BytesMut::with_capacity(64);

        assert!(encoder.encode(Some(&mut source), &mut dst).unwrap());
        assert_eq!(&dst[..], b"write more tests");
        assert!(encoder.is_finish());
        // the rest of the source is never read
        assert_eq!(&source[..], b" and more");
    }

    #[test]
    fn spans_small_buffers() {
        let mut source = Bytes::from_static(b"write more tests");
        let mut encoder = LengthEncoder::new(16);
        let mut out = Vec::new();

        loop {
            let mut dst = BytesMut::with_capacity(5);
            let finished = encoder.encode(Some(&mut source), &mut dst).unwrap();
            out.extend_from_slice(&dst);
            if finished {
                break;
            }
        }
        assert_eq!(out, b"write more tests");
    }

    #[test]
    fn short_body_is_an_error() {
        let mut source = Bytes::from_static(b"short");
        let mut encoder = LengthEncoder::new(16);
        let mut dst = BytesMut::with_capacity(64);

        let err = encoder.encode(Some(&mut source), &mut dst).unwrap_err();
        assert!(matches!(err, SendError::ShortBody { expected: 16, written: 5 }));
        assert_eq!(&dst[..], b"short");
    }

    #[test]
    fn missing_source_is_a_short_body() {
        let mut encoder = LengthEncoder::new(3);
        let mut dst = BytesMut::with_capacity(64);

        let err = encoder.encode(None::<&mut Bytes>, &mut dst).unwrap_err();
        assert!(matches!(err, SendError::ShortBody { expected: 3, written: 0 }));
    }

    #[test]
    fn pending_source_writes_nothing() {
        let (sender, mut receiver) = body_channel();
        let mut encoder = LengthEncoder::new(4);
        let mut dst = BytesMut::with_capacity(64);

        assert!(!encoder.encode(Some(&mut receiver), &mut dst).unwrap());
        assert!(dst.is_empty());

        sender.send_data("ab").unwrap();
        assert!(!encoder.encode(Some(&mut receiver), &mut dst).unwrap());
        sender.send_data("cd").unwrap();
        assert!(encoder.encode(Some(&mut receiver), &mut dst).unwrap());
        assert_eq!(&dst[..], b"abcd");
    }
}
