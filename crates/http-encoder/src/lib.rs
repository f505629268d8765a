//! A streaming HTTP/1.1 message encoder
//!
//! This crate turns structured HTTP/1.1 requests and responses into their exact wire bytes.
//! Messages are validated before anything is written, framing is chosen from the headers,
//! and the bytes are produced incrementally into caller-supplied bounded buffers, so a
//! message of any size can be sent through a fixed amount of memory.
//!
//! # Features
//!
//! - Request and response start lines with strict syntax checks
//! - Header order and name case preserved exactly as given
//! - `Content-Length` and chunked transfer encoding, including chunk extensions and trailers
//! - Non-blocking body sources: in-memory bytes, channels, or any `http_body::Body`
//! - Resumable output across any number of small buffers
//! - An async driver for tokio writers
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use micro_http_encoder::codec::{EncoderMessage, H1Encoder};
//! use micro_http_encoder::connection::MessageWriter;
//! use micro_http_encoder::context::EncoderContext;
//! use micro_http_encoder::protocol::body::body_channel;
//! use micro_http_encoder::protocol::{HttpError, HttpMessage, SendError};
//! use tokio::net::TcpStream;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), HttpError> {
//!     let ctx = EncoderContext::default();
//!     let stream = TcpStream::connect("127.0.0.1:8080").await.map_err(SendError::io)?;
//!
//!     let (sender, receiver) = body_channel();
//!     let mut message = HttpMessage::request();
//!     message
//!         .set_method("POST")
//!         .set_path("/upload")
//!         .add_header("Host", "127.0.0.1")
//!         .add_header("Transfer-Encoding", "chunked")
//!         .set_body(receiver);
//!
//!     tokio::spawn(async move {
//!         for part in ["hello", " ", "world"] {
//!             let _ = sender.send_data(Bytes::from_static(part.as_bytes()));
//!         }
//!     });
//!
//!     let encoder_message = EncoderMessage::build(&ctx, &mut message, None)?;
//!     let mut encoder = H1Encoder::new(&ctx, encoder_message);
//!     let mut writer = MessageWriter::new(&ctx, stream);
//!     writer.write_message(&mut encoder).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! The crate is organized into several key modules:
//!
//! - [`protocol`]: Message, header, chunk and body source types, plus the error types
//! - [`codec`]: Validation, framing and the streaming encoder
//! - [`connection`]: Async driver writing an encoder's output to a tokio writer
//! - [`context`]: Configuration and the tracing span shared by encoders
//!
//! # Core Components
//!
//! ## Validation
//!
//! [`codec::EncoderMessage::build`] checks the start line and every header, then picks
//! the body framing. A message either passes completely or fails with exactly one
//! [`protocol::MessageError`], before a single byte is written.
//!
//! ## Encoding
//!
//! [`codec::H1Encoder::encode_next`] fills the spare capacity of a `BytesMut` and
//! reports whether the message is done. It never blocks: when the body has no data yet
//! it returns early, and [`codec::H1Encoder::poll_body_ready`] resolves once it can
//! continue.
//!
//! ## Error Handling
//!
//! - [`protocol::HttpError`]: Top-level error type
//! - [`protocol::MessageError`]: The message is not valid HTTP/1.1
//! - [`protocol::SendError`]: The body could not be written as framed
//!
//! # Limitations
//!
//! - HTTP/1.1 only
//! - Encoding only: incoming bytes are never parsed
//! - One message per encoder, connection reuse is up to the caller

pub mod codec;
pub mod connection;
pub mod context;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
