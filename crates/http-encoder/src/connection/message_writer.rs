use std::future::poll_fn;
use std::task::Poll;

use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{error, trace};

use crate::codec::{EncodeStatus, H1Encoder};
use crate::context::{EncoderContext, MIN_WRITE_BUFFER_SIZE};
use crate::protocol::SendError;
use crate::protocol::body::BodySource;

/// Idle rounds in a row, each with the body already ready, before the encoder is
/// considered stuck. One is allowed for data arriving between the encode and the poll.
const MAX_READY_IDLE_ROUNDS: usize = 2;

#[derive(Debug)]
pub struct MessageWriter<W> {
    writer: W,
    buffer: BytesMut,
}

impl<W> MessageWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(ctx: &EncoderContext, writer: W) -> Self {
        Self::with_capacity(writer, ctx.config().get_write_buffer_size())
    }

    /// Sizes below 64 bytes are raised to 64.
    pub fn with_capacity(writer: W, buffer_size: usize) -> Self {
        Self { writer, buffer: BytesMut::with_capacity(buffer_size.max(MIN_WRITE_BUFFER_SIZE)) }
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Runs `encoder` to completion, writing every produced byte to the underlying writer.
    ///
    /// When the encoder has nothing to write, pending output is flushed and the body
    /// source or chunk queue is awaited. An encoder that keeps writing nothing while its body
    /// reports ready fails with [`SendError::NoProgress`]. Errors leave the peer with a
    /// truncated message.
    pub async fn write_message<B: BodySource>(&mut self, encoder: &mut H1Encoder<'_, B>) -> Result<(), SendError> {
        let mut ready_idle_rounds = 0;
        loop {
            self.buffer.clear();
            let status = encoder.encode_next(&mut self.buffer)?;

            if !self.buffer.is_empty() {
                ready_idle_rounds = 0;
                trace!(size = self.buffer.len(), "write encoded bytes");
                if let Err(e) = self.writer.write_all(&self.buffer).await {
                    error!(cause = %e, "failed to write message");
                    return Err(e.into());
                }
            }

            match status {
                EncodeStatus::Done => return self.flush().await,
                EncodeStatus::InProgress if self.buffer.is_empty() => {
                    self.flush().await?;

                    let mut waited = false;
                    poll_fn(|cx| match encoder.poll_body_ready(cx) {
                        Poll::Pending => {
                            waited = true;
                            Poll::Pending
                        }
                        ready => ready,
                    })
                    .await?;

                    if waited {
                        ready_idle_rounds = 0;
                    } else {
                        ready_idle_rounds += 1;
                        if ready_idle_rounds >= MAX_READY_IDLE_ROUNDS {
                            error!(capacity = self.buffer.capacity(), "encoder made no progress while its body was ready");
                            return Err(SendError::no_progress(self.buffer.capacity()));
                        }
                    }
                }
                EncodeStatus::InProgress => {}
            }
        }
    }

    #[inline]
    pub async fn flush(&mut self) -> Result<(), SendError> {
        Ok(self.writer.flush().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::EncoderMessage;
    use crate::context::EncoderConfig;
    use crate::protocol::body::{BodyRead, body_channel};
    use crate::protocol::{Chunk, HttpMessage, chunk_channel};
    use bytes::Bytes;
    use http::StatusCode;
    use indoc::indoc;
    use std::time::Duration;

    #[tokio::test]
    async fn writes_fixed_length_message() {
        let ctx = EncoderContext::default();
        let mut message = HttpMessage::response(StatusCode::OK);
        message.add_header("Content-Length", "11").set_body(Bytes::from_static(b"hello world"));
        let encoder_message = EncoderMessage::build(&ctx, &mut message, None).unwrap();
        let mut encoder = H1Encoder::new(&ctx, encoder_message);

        let mut writer = MessageWriter::with_capacity(Vec::new(), 64);
        writer.write_message(&mut encoder).await.unwrap();

        assert!(encoder.is_done());
        assert_eq!(writer.into_inner(), b"HTTP/1.1 200 OK\r\nContent-Length: 11\r\n\r\nhello world");
    }

    #[tokio::test]
    async fn small_write_buffer_spans_many_writes() {
        let ctx = EncoderContext::new(EncoderConfig::new().write_buffer_size(64));
        let body = Bytes::from(vec![b'x'; 1000]);
        let mut message = HttpMessage::request();
        message.set_method("POST").set_path("/upload").add_header("Content-Length", "1000").set_body(body.clone());
        let encoder_message = EncoderMessage::build(&ctx, &mut message, None).unwrap();
        let mut encoder = H1Encoder::new(&ctx, encoder_message);

        let mut writer = MessageWriter::new(&ctx, Vec::new());
        writer.write_message(&mut encoder).await.unwrap();

        let written = writer.into_inner();
        let head = b"POST /upload HTTP/1.1\r\nContent-Length: 1000\r\n\r\n";
        assert_eq!(&written[..head.len()], head);
        assert_eq!(&written[head.len()..], &body[..]);
    }

    #[tokio::test]
    async fn waits_for_body_channel() {
        let ctx = EncoderContext::default();
        let (sender, receiver) = body_channel();
        let mut message = HttpMessage::request();
        message.set_method("PUT").set_path("/").add_header("Transfer-Encoding", "chunked").set_body(receiver);

        let producer = tokio::spawn(async move {
            for part in ["write ", "more ", "tests"] {
                tokio::time::sleep(Duration::from_millis(5)).await;
                sender.send_data(part).unwrap();
            }
        });

        let encoder_message = EncoderMessage::build(&ctx, &mut message, None).unwrap();
        let mut encoder = H1Encoder::new(&ctx, encoder_message);
        let mut writer = MessageWriter::with_capacity(Vec::new(), 1024);
        writer.write_message(&mut encoder).await.unwrap();
        producer.await.unwrap();

        let expected = indoc! {"
            PUT / HTTP/1.1\r
            Transfer-Encoding: chunked\r
            \r
            6\r
            write \r
            5\r
            more \r
            5\r
            tests\r
            0\r
            \r
        "};
        assert_eq!(String::from_utf8(writer.into_inner()).unwrap(), expected);
    }

    #[tokio::test]
    async fn waits_for_chunk_queue() {
        let ctx = EncoderContext::default();
        let mut message = HttpMessage::<Bytes>::request();
        message.set_method("PUT").set_path("/").add_header("Transfer-Encoding", "chunked");
        let (sender, mut chunks) = chunk_channel();

        let producer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            sender.send(Chunk::new("abc").with_extension("part", Some(Bytes::from_static(b"one"))).unwrap()).unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
            sender.close();
        });

        let encoder_message = EncoderMessage::build(&ctx, &mut message, Some(&mut chunks)).unwrap();
        let mut encoder = H1Encoder::new(&ctx, encoder_message);
        let mut writer = MessageWriter::with_capacity(Vec::new(), 1024);
        writer.write_message(&mut encoder).await.unwrap();
        producer.await.unwrap();

        assert_eq!(
            writer.into_inner(),
            b"PUT / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n3;part=one\r\nabc\r\n0\r\n\r\n"
        );
    }

    /// Never has data, but keeps the default always-ready `poll_ready`.
    struct AlwaysPending;

    impl BodySource for AlwaysPending {
        fn read(&mut self, _dst: &mut [u8]) -> std::io::Result<BodyRead> {
            Ok(BodyRead::Pending)
        }
    }

    #[tokio::test]
    async fn tiny_buffer_is_raised_to_minimum() {
        let ctx = EncoderContext::default();
        let mut message = HttpMessage::request();
        message.set_method("PUT").set_path("/").add_header("Transfer-Encoding", "chunked").set_body(Bytes::from_static(b"abc"));
        let encoder_message = EncoderMessage::build(&ctx, &mut message, None).unwrap();
        let mut encoder = H1Encoder::new(&ctx, encoder_message);

        let mut writer = MessageWriter::with_capacity(Vec::new(), 5);
        tokio::time::timeout(Duration::from_secs(2), writer.write_message(&mut encoder)).await.unwrap().unwrap();

        assert_eq!(writer.into_inner(), b"PUT / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n0\r\n\r\n");
    }

    #[tokio::test]
    async fn stuck_encoder_fails_instead_of_spinning() {
        let ctx = EncoderContext::default();
        let mut message = HttpMessage::request();
        message.set_method("PUT").set_path("/").add_header("Content-Length", "3").set_body(AlwaysPending);
        let encoder_message = EncoderMessage::build(&ctx, &mut message, None).unwrap();
        let mut encoder = H1Encoder::new(&ctx, encoder_message);

        let mut writer = MessageWriter::with_capacity(Vec::new(), 1024);
        let result = tokio::time::timeout(Duration::from_secs(2), writer.write_message(&mut encoder)).await.unwrap();

        assert!(matches!(result, Err(SendError::NoProgress { capacity: 1024 })));
        assert_eq!(writer.into_inner(), b"PUT / HTTP/1.1\r\nContent-Length: 3\r\n\r\n");
    }

    #[tokio::test]
    async fn aborted_body_fails_the_write() {
        let ctx = EncoderContext::default();
        let (sender, receiver) = body_channel();
        let mut message = HttpMessage::request();
        message.set_method("PUT").set_path("/").add_header("Content-Length", "10").set_body(receiver);

        sender.send_data("abc").unwrap();
        sender.abort(std::io::Error::other("upstream reset"));

        let encoder_message = EncoderMessage::build(&ctx, &mut message, None).unwrap();
        let mut encoder = H1Encoder::new(&ctx, encoder_message);
        let mut writer = MessageWriter::with_capacity(Vec::new(), 1024);

        let err = writer.write_message(&mut encoder).await.unwrap_err();
        assert!(matches!(err, SendError::Io { .. }));
        // output of the failing call is discarded
        assert!(writer.get_mut().is_empty());
    }
}
