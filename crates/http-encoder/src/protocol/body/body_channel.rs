use std::io;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes};
use futures::StreamExt;
use futures::channel::mpsc;
use tracing::{error, trace};

use crate::protocol::SendError;
use crate::protocol::body::{BodyRead, BodySource};

/// Creates a body whose bytes are produced by another task.
///
/// The [`BodySender`] pushes data frames; dropping it ends the body. The [`BodyReceiver`]
/// is the [`BodySource`] handed to the message.
pub fn body_channel() -> (BodySender, BodyReceiver) {
    let (sender, receiver) = mpsc::unbounded();
    (BodySender { sender }, BodyReceiver { receiver, pending: Bytes::new(), eof: false })
}

#[derive(Debug, Clone)]
pub struct BodySender {
    sender: mpsc::UnboundedSender<io::Result<Bytes>>,
}

impl BodySender {
    pub fn send_data(&self, data: impl Into<Bytes>) -> Result<(), SendError> {
        self.sender.unbounded_send(Ok(data.into())).map_err(|e| {
            error!("failed to send body data through channel, {}", e);
            SendError::invalid_body("body receiver dropped")
        })
    }

    /// Fails the body: the encoder reading it will surface `error` and stop.
    pub fn abort(self, error: io::Error) {
        // the receiver may already be gone, in which case nobody is left to report to
        let _ = self.sender.unbounded_send(Err(error));
    }
}

#[derive(Debug)]
pub struct BodyReceiver {
    receiver: mpsc::UnboundedReceiver<io::Result<Bytes>>,
    pending: Bytes,
    eof: bool,
}

impl BodySource for BodyReceiver {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<BodyRead> {
        let waker = futures::task::noop_waker_ref();
        let mut cx = Context::from_waker(waker);
        match self.poll_ready(&mut cx) {
            Poll::Ready(Ok(())) => {}
            Poll::Ready(Err(e)) => return Err(e),
            Poll::Pending => return Ok(BodyRead::Pending),
        }

        if !self.pending.has_remaining() {
            return Ok(BodyRead::Eof);
        }

        let size = dst.len().min(self.pending.remaining());
        self.pending.copy_to_slice(&mut dst[..size]);
        Ok(BodyRead::Data(size))
    }

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        while !self.pending.has_remaining() && !self.eof {
            match self.receiver.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    trace!(size = bytes.len(), "receive body data from channel");
                    self.pending = bytes;
                }
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Err(e)),
                Poll::Ready(None) => self.eof = true,
                Poll::Pending => return Poll::Pending,
            }
        }
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_until_data_arrives() {
        let (sender, mut receiver) = body_channel();
        let mut buf = [0u8; 8];

        assert_eq!(receiver.read(&mut buf).unwrap(), BodyRead::Pending);

        sender.send_data("hello").unwrap();
        sender.send_data(Bytes::new()).unwrap();
        sender.send_data("world").unwrap();
        assert_eq!(receiver.read(&mut buf[..3]).unwrap(), BodyRead::Data(3));
        assert_eq!(&buf[..3], b"hel");
        assert_eq!(receiver.read(&mut buf).unwrap(), BodyRead::Data(2));
        assert_eq!(&buf[..2], b"lo");
        // empty frames are skipped
        assert_eq!(receiver.read(&mut buf).unwrap(), BodyRead::Data(5));
        assert_eq!(&buf[..5], b"world");
        assert_eq!(receiver.read(&mut buf).unwrap(), BodyRead::Pending);

        drop(sender);
        assert_eq!(receiver.read(&mut buf).unwrap(), BodyRead::Eof);
    }

    #[test]
    fn abort_surfaces_error() {
        let (sender, mut receiver) = body_channel();
        sender.abort(io::Error::from(io::ErrorKind::ConnectionReset));

        let mut buf = [0u8; 8];
        let err = receiver.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }

    #[test]
    fn send_after_receiver_dropped() {
        let (sender, receiver) = body_channel();
        drop(receiver);
        assert!(matches!(sender.send_data("late"), Err(SendError::InvalidBody { .. })));
    }
}
