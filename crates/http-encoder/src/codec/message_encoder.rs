//! Streaming encoder for one HTTP/1.1 message.
//!
//! [`H1Encoder`] turns a validated [`EncoderMessage`] into bytes, one bounded output buffer
//! at a time. Phases run strictly in order and are never revisited:
//!
//! 1. head: start line, headers, blank line
//! 2. body: fixed length, chunked, or nothing
//! 3. done
//!
//! The encoder never blocks. When the body source or chunk queue has nothing ready, the
//! call returns [`EncodeStatus::InProgress`] having written whatever was available, and
//! [`H1Encoder::poll_body_ready`] tells an async driver when to call again.

use std::task::{Context, Poll};

use bytes::BytesMut;
use tracing::{Span, debug_span, error, trace};

use crate::codec::body::PayloadEncoder;
use crate::codec::framing::{EncoderMessage, StartLineRef};
use crate::codec::header::HeaderEncoder;
use crate::context::EncoderContext;
use crate::protocol::SendError;
use crate::protocol::body::BodySource;

/// Progress reported by [`H1Encoder::encode_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeStatus {
    /// More calls are needed.
    InProgress,
    /// The whole message has been written.
    Done,
}

impl EncodeStatus {
    #[inline]
    pub fn is_done(&self) -> bool {
        matches!(self, EncodeStatus::Done)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Head,
    Body,
    Done,
    Failed,
}

/// Resumable encoder state for one message.
///
/// Owned and driven by a single connection driver; it borrows the message for its whole
/// lifetime, so the message cannot change while it is being sent.
#[derive(Debug)]
pub struct H1Encoder<'a, B> {
    message: EncoderMessage<'a, B>,
    header_encoder: HeaderEncoder,
    payload_encoder: PayloadEncoder,
    phase: Phase,
    span: Span,
}

impl<'a, B: BodySource> H1Encoder<'a, B> {
    pub fn new(ctx: &EncoderContext, message: EncoderMessage<'a, B>) -> Self {
        let span = match message.start_line() {
            StartLineRef::Request { method, .. } => {
                debug_span!(parent: ctx.span(), "encode_request", method = %String::from_utf8_lossy(method))
            }
            StartLineRef::Response { status, .. } => debug_span!(parent: ctx.span(), "encode_response", status = status.as_u16()),
        };
        let payload_encoder = PayloadEncoder::from_payload_size(message.payload_size(), ctx.config().get_max_chunk_size());

        Self { message, header_encoder: HeaderEncoder::new(), payload_encoder, phase: Phase::Head, span }
    }

    /// Writes the next part of the message into the spare capacity of `dst`.
    ///
    /// `dst` is never grown; give it capacity to make progress. Once `Done` is returned,
    /// later calls return `Done` again without writing. After an error the message on the
    /// wire is truncated: the connection must be closed, and later calls fail with
    /// [`SendError::Aborted`].
    pub fn encode_next(&mut self, dst: &mut BytesMut) -> Result<EncodeStatus, SendError> {
        let span = self.span.clone();
        let _enter = span.enter();
        let start = dst.len();

        let result = self.advance(dst);
        trace!(written = dst.len() - start, phase = ?self.phase, "encode_next");

        if let Err(e) = &result
            && self.phase != Phase::Failed
        {
            error!(cause = %e, "message encoding failed, the connection must not be reused");
            self.phase = Phase::Failed;
        }
        result
    }

    fn advance(&mut self, dst: &mut BytesMut) -> Result<EncodeStatus, SendError> {
        loop {
            match self.phase {
                Phase::Head => {
                    if !self.header_encoder.encode(&self.message.start_line, self.message.headers, dst) {
                        return Ok(EncodeStatus::InProgress);
                    }
                    trace!("message head written");
                    self.phase = Phase::Body;
                }
                Phase::Body => {
                    let source = self.message.body.as_deref_mut();
                    let chunks = self.message.chunks.as_deref_mut();
                    if !self.payload_encoder.encode(source, chunks, dst)? {
                        return Ok(EncodeStatus::InProgress);
                    }
                    trace!("message body written");
                    self.phase = Phase::Done;
                }
                Phase::Done => return Ok(EncodeStatus::Done),
                Phase::Failed => return Err(SendError::Aborted),
            }
        }
    }

    /// Resolves when the body source or chunk queue can make progress.
    ///
    /// Outside the body phase, or when the encoder is only waiting for output space, this
    /// is immediately ready.
    pub fn poll_body_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), SendError>> {
        match self.phase {
            Phase::Body => {
                let source = self.message.body.as_deref_mut();
                let chunks = self.message.chunks.as_deref_mut();
                self.payload_encoder.poll_ready(source, chunks, cx)
            }
            Phase::Failed => Poll::Ready(Err(SendError::Aborted)),
            Phase::Head | Phase::Done => Poll::Ready(Ok(())),
        }
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// True if the message asked for the connection to be closed after it.
    pub fn has_connection_close_header(&self) -> bool {
        self.message.has_connection_close_header()
    }

    pub fn message(&self) -> &EncoderMessage<'a, B> {
        &self.message
    }
}
