//! Body sources for outgoing messages.
//!
//! The encoder pulls body bytes through [`BodySource`], a non-blocking reader that can say
//! "nothing yet" instead of blocking. Three sources ship with the crate:
//!
//! - [`Bytes`]: a body that is fully in memory
//! - [`BodyReceiver`]: the consumer half of [`body_channel`], fed from another task
//! - [`HttpBodySource`]: an adapter for any `http_body::Body`
//!
//! # Readiness
//!
//! A source that can return [`BodyRead::Pending`] must also implement
//! [`BodySource::poll_ready`], so an async driver knows when to call the encoder again.

mod body_channel;
mod http_body_source;

pub use body_channel::{BodyReceiver, BodySender, body_channel};
pub use http_body_source::HttpBodySource;

use bytes::{Buf, Bytes};
use std::io;
use std::task::{Context, Poll};

/// Outcome of a single [`BodySource::read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyRead {
    /// This many bytes were written to the front of the buffer.
    Data(usize),
    /// No data right now; the source is not finished.
    Pending,
    /// The source is exhausted.
    Eof,
}

/// A non-blocking producer of body bytes.
pub trait BodySource {
    /// Copies up to `dst.len()` bytes into `dst`.
    ///
    /// Must never block. `Data(0)` is treated like `Pending`.
    fn read(&mut self, dst: &mut [u8]) -> io::Result<BodyRead>;

    /// Resolves when the next `read` can make progress, either with data or with `Eof`.
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl BodySource for Bytes {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<BodyRead> {
        if !self.has_remaining() {
            return Ok(BodyRead::Eof);
        }

        let size = dst.len().min(self.remaining());
        self.copy_to_slice(&mut dst[..size]);
        Ok(BodyRead::Data(size))
    }
}

impl<S: BodySource + ?Sized> BodySource for Box<S> {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<BodyRead> {
        (**self).read(dst)
    }

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        (**self).poll_ready(cx)
    }
}
