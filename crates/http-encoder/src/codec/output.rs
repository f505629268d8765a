//! Bounded writes into caller-supplied output buffers.
//!
//! The encoder only ever writes into the spare capacity of the `BytesMut` it is given and
//! never grows it, so the caller controls how much is produced per call.

use bytes::BytesMut;

/// Bytes that can still be written to `dst` without reallocating.
#[inline]
pub(crate) fn spare_capacity(dst: &BytesMut) -> usize {
    dst.capacity() - dst.len()
}

/// Writes a logical byte sequence made of several slices, resuming where the previous call
/// stopped.
///
/// Only the offset is remembered, so pieces are never copied into an intermediate buffer
/// and already written bytes are never written twice.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PieceWriter {
    offset: usize,
}

impl PieceWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Copies as much of `pieces` as fits into `dst`. Returns true once the last byte has
    /// been written, after which the writer is reset for the next sequence.
    pub(crate) fn write(&mut self, dst: &mut BytesMut, pieces: &[&[u8]]) -> bool {
        let mut skip = self.offset;
        for piece in pieces {
            if skip >= piece.len() {
                skip -= piece.len();
                continue;
            }

            let rest = &piece[skip..];
            skip = 0;
            let size = rest.len().min(spare_capacity(dst));
            dst.extend_from_slice(&rest[..size]);
            self.offset += size;
            if size < rest.len() {
                return false;
            }
        }

        self.offset = 0;
        true
    }

    /// Bytes of the current sequence written so far.
    pub(crate) fn offset(&self) -> usize {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resumes_across_small_buffers() {
        let pieces: [&[u8]; 4] = [b"Host", b": ", b"amazon.com", b"\r\n"];
        let mut writer = PieceWriter::new();
        let mut out = Vec::new();

        loop {
            let mut dst = BytesMut::with_capacity(3);
            let finished = writer.write(&mut dst, &pieces);
            assert!(dst.len() <= 3);
            out.extend_from_slice(&dst);
            if finished {
                break;
            }
            assert!(writer.offset() > 0);
        }

        assert_eq!(out, b"Host: amazon.com\r\n");
        assert_eq!(writer.offset(), 0);
    }

    #[test]
    fn zero_capacity_writes_nothing() {
        let mut writer = PieceWriter::new();
        let mut dst = BytesMut::new();
        assert!(!writer.write(&mut dst, &[b"abc"]));
        assert!(dst.is_empty());
        assert_eq!(writer.offset(), 0);
    }

    #[test]
    fn empty_pieces_complete_immediately() {
        let mut writer = PieceWriter::new();
        let mut dst = BytesMut::new();
        assert!(writer.write(&mut dst, &[b"", b""]));
    }
}
