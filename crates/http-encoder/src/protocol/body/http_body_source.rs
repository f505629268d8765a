use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Buf;
use http_body::Body;
use tracing::{trace, warn};

use crate::protocol::body::{BodyRead, BodySource};

/// Adapts an `http_body::Body` into a [`BodySource`].
///
/// Data frames are copied out in order. Trailer frames are dropped with a warning: trailers for a chunked
/// message are sent with the last [`Chunk`](crate::protocol::Chunk) instead.
#[derive(Debug)]
pub struct HttpBodySource<B: Body> {
    body: B,
    pending: Option<B::Data>,
    eof: bool,
}

impl<B: Body> HttpBodySource<B> {
    pub fn new(body: B) -> Self {
        Self { body, pending: None, eof: false }
    }

    pub fn into_inner(self) -> B {
        self.body
    }
}

impl<B> BodySource for HttpBodySource<B>
where
    B: Body + Unpin,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    fn read(&mut self, dst: &mut [u8]) -> io::Result<BodyRead> {
        let waker = futures::task::noop_waker_ref();
        let mut cx = Context::from_waker(waker);
        match self.poll_ready(&mut cx) {
            Poll::Ready(Ok(())) => {}
            Poll::Ready(Err(e)) => return Err(e),
            Poll::Pending => return Ok(BodyRead::Pending),
        }

        let Some(data) = self.pending.as_mut() else {
            return Ok(BodyRead::Eof);
        };

        let size = dst.len().min(data.remaining());
        data.copy_to_slice(&mut dst[..size]);
        if !data.has_remaining() {
            self.pending = None;
        }
        Ok(BodyRead::Data(size))
    }

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        while self.pending.is_none() && !self.eof {
            match Pin::new(&mut self.body).poll_frame(cx) {
                Poll::Ready(Some(Ok(frame))) => match frame.into_data() {
                    Ok(data) if data.has_remaining() => {
                        trace!(size = data.remaining(), "receive data frame");
                        self.pending = Some(data);
                    }
                    Ok(_) => {}
                    Err(trailers) => warn!(
                        count = trailers.trailers_ref().map_or(0, http::HeaderMap::len),
                        "trailers frame from http body dropped, send trailers with the last chunk instead"
                    ),
                },
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Err(io::Error::other(e))),
                Poll::Ready(None) => self.eof = true,
                Poll::Pending => return Poll::Pending,
            }
        }
        Poll::Ready(Ok(()))
    }
}
