//! Caller-built chunks for chunked transfer encoding.
//!
//! A chunk sender can push chunks while a message is being encoded; the encoder drains the
//! matching [`ChunkReceiver`] front to back and never reorders or buffers more than the one
//! chunk it is currently writing.

use std::task::{Context, Poll};

use bytes::Bytes;
use futures::StreamExt;
use futures::channel::mpsc;
use tracing::trace;

use crate::codec::syntax;
use crate::ensure;
use crate::protocol::{Headers, MessageError, SendError};

/// Trailer fields that would change how the message is framed or routed.
const FORBIDDEN_TRAILERS: [&str; 4] = ["transfer-encoding", "content-length", "trailer", "host"];

/// `;name[=value]` after the chunk size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkExtension {
    name: Bytes,
    value: Option<Bytes>,
}

impl ChunkExtension {
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn value(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }
}

/// One unit of chunked body data.
///
/// A chunk with no data is the last chunk: it ends the body and is the only chunk that may
/// carry trailers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    data: Bytes,
    extensions: Vec<ChunkExtension>,
    trailers: Option<Headers>,
}

impl Chunk {
    /// A data chunk. Passing empty data creates the last chunk.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into(), extensions: Vec::new(), trailers: None }
    }

    /// The zero-size chunk that ends the body.
    pub fn last() -> Self {
        Self::new(Bytes::new())
    }

    /// Adds a chunk extension. Name and value must be tokens.
    pub fn with_extension(mut self, name: impl Into<Bytes>, value: Option<Bytes>) -> Result<Self, MessageError> {
        let name = name.into();
        ensure!(syntax::is_token(&name), MessageError::invalid_chunk_extension("extension name is not a token"));
        if let Some(value) = &value {
            ensure!(syntax::is_token(value), MessageError::invalid_chunk_extension("extension value is not a token"));
        }
        self.extensions.push(ChunkExtension { name, value });
        Ok(self)
    }

    /// Attaches trailer fields to the last chunk.
    ///
    /// Fails with `InvalidHeaderField` on a data chunk or when a trailer would change framing,
    /// and with the usual name/value errors on malformed fields.
    pub fn with_trailers(mut self, trailers: Headers) -> Result<Self, MessageError> {
        ensure!(self.is_last(), MessageError::invalid_header_field("only the last chunk can carry trailers"));
        ensure!(
            trailers.iter().all(|header| syntax::is_token(header.name())),
            MessageError::invalid_header_name("trailer name is not a token")
        );
        ensure!(
            trailers.iter().all(|header| syntax::is_field_value(header.value())),
            MessageError::invalid_header_value("trailer value contains control characters")
        );
        if let Some(header) = trailers.iter().find(|header| FORBIDDEN_TRAILERS.iter().any(|name| header.is(name))) {
            return Err(MessageError::invalid_header_field(format!(
                "{} is not allowed as a trailer",
                String::from_utf8_lossy(header.name())
            )));
        }
        self.trailers = Some(trailers);
        Ok(self)
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn extensions(&self) -> &[ChunkExtension] {
        &self.extensions
    }

    pub fn trailers(&self) -> Option<&Headers> {
        self.trailers.as_ref()
    }

    #[inline]
    pub fn is_last(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Bytes> for Chunk {
    fn from(data: Bytes) -> Self {
        Self::new(data)
    }
}

/// Result of a non-blocking look at the chunk queue.
#[derive(Debug)]
pub(crate) enum NextChunk {
    Ready(Chunk),
    Pending,
    Closed,
}

/// Creates the ordered chunk queue shared between a producer and one encoder.
///
/// Dropping every [`ChunkSender`] closes the queue; the encoder then finishes the body
/// with a synthesized last chunk unless one was already sent.
pub fn chunk_channel() -> (ChunkSender, ChunkReceiver) {
    let (sender, receiver) = mpsc::unbounded();
    (ChunkSender { sender }, ChunkReceiver { receiver, peeked: None, closed: false })
}

#[derive(Debug, Clone)]
pub struct ChunkSender {
    sender: mpsc::UnboundedSender<Chunk>,
}

impl ChunkSender {
    /// Queues a chunk behind every chunk sent before it.
    pub fn send(&self, chunk: impl Into<Chunk>) -> Result<(), SendError> {
        self.sender.unbounded_send(chunk.into()).map_err(|e| SendError::invalid_body(format!("chunk queue closed: {e}")))
    }

    /// Closes the queue for every sender.
    pub fn close(&self) {
        self.sender.close_channel();
    }
}

#[derive(Debug)]
pub struct ChunkReceiver {
    receiver: mpsc::UnboundedReceiver<Chunk>,
    peeked: Option<Chunk>,
    closed: bool,
}

impl ChunkReceiver {
    /// Takes the front chunk without waiting.
    pub(crate) fn next_chunk(&mut self) -> NextChunk {
        let waker = futures::task::noop_waker_ref();
        let mut cx = Context::from_waker(waker);
        match self.poll_ready(&mut cx) {
            Poll::Ready(()) => match self.peeked.take() {
                Some(chunk) => NextChunk::Ready(chunk),
                None => NextChunk::Closed,
            },
            Poll::Pending => NextChunk::Pending,
        }
    }

    /// Resolves once a chunk is available or the queue is closed.
    pub fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        if self.peeked.is_some() || self.closed {
            return Poll::Ready(());
        }

        match self.receiver.poll_next_unpin(cx) {
            Poll::Ready(Some(chunk)) => {
                trace!(size = chunk.data.len(), "chunk dequeued");
                self.peeked = Some(chunk);
                Poll::Ready(())
            }
            Poll::Ready(None) => {
                self.closed = true;
                Poll::Ready(())
            }
            Poll::Pending => Poll::Pending,
        }
    }

    /// True once the queue is closed and every chunk has been taken.
    pub fn is_terminated(&self) -> bool {
        self.closed && self.peeked.is_none()
    }
}
