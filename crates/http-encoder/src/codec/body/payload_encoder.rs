use std::task::{Context, Poll};

use bytes::BytesMut;

use crate::codec::body::chunked_encoder::ChunkedEncoder;
use crate::codec::body::length_encoder::LengthEncoder;
use crate::protocol::body::BodySource;
use crate::protocol::{ChunkReceiver, PayloadSize, SendError};

/// encode payload for message body
#[derive(Debug)]
pub(crate) struct PayloadEncoder {
    kind: Kind,
}

#[derive(Debug)]
enum Kind {
    /// content-length payload
    Length(LengthEncoder),

    /// transfer-encoding chunked payload
    Chunked(ChunkedEncoder),

    /// have no body with the message
    NoBody,
}

impl PayloadEncoder {
    /// create an empty `PayloadEncoder`
    pub(crate) fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    /// create a chunked `PayloadEncoder`
    pub(crate) fn chunked(max_chunk_size: usize) -> Self {
        Self { kind: Kind::Chunked(ChunkedEncoder::new(max_chunk_size)) }
    }

    /// create a fixed length `PayloadEncoder`
    pub(crate) fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthEncoder::new(size)) }
    }

    pub(crate) fn from_payload_size(payload_size: PayloadSize, max_chunk_size: usize) -> Self {
        match payload_size {
            PayloadSize::Length(size) => Self::fix_length(size),
            PayloadSize::Chunked => Self::chunked(max_chunk_size),
            PayloadSize::Empty => Self::empty(),
        }
    }

    pub(crate) fn is_finish(&self) -> bool {
        match &self.kind {
            Kind::Length(encoder) => encoder.is_finish(),
            Kind::Chunked(encoder) => encoder.is_finish(),
            Kind::NoBody => true,
        }
    }

    /// Returns true once the whole body, including any chunked terminator, is written.
    pub(crate) fn encode<B: BodySource>(
        &mut self,
        source: Option<&mut B>,
        chunks: Option<&mut ChunkReceiver>,
        dst: &mut BytesMut,
    ) -> Result<bool, SendError> {
        match &mut self.kind {
            Kind::Length(encoder) => encoder.encode(source, dst),
            Kind::Chunked(encoder) => encoder.encode(source, chunks, dst),
            Kind::NoBody => Ok(true),
        }
    }

    pub(crate) fn poll_ready<B: BodySource>(
        &mut self,
        source: Option<&mut B>,
        chunks: Option<&mut ChunkReceiver>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), SendError>> {
        match &mut self.kind {
            Kind::Length(encoder) => encoder.poll_ready(source, cx),
            Kind::Chunked(encoder) => encoder.poll_ready(source, chunks, cx),
            Kind::NoBody => Poll::Ready(Ok(())),
        }
    }
}
