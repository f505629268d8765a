//! HTTP/1.1 message encoding
//!
//! This module turns validated messages into wire bytes with a resumable, non-blocking
//! state machine. Nothing here performs I/O: the caller hands in a bounded output buffer
//! and writes out whatever the encoder produced.
//!
//! # Architecture
//!
//! - Validation and framing:
//!   - [`EncoderMessage`]: checks a message and decides between fixed-length, chunked, or
//!     no body
//! - Encoding:
//!   - [`H1Encoder`]: writes the start line and headers, then the body
//!   - Head encoding via the `header` module
//!   - Payload encoding via the `body` module
//!
//! # Example
//!
//! ```
//! use bytes::{Bytes, BytesMut};
//! use micro_http_encoder::codec::{EncodeStatus, EncoderMessage, H1Encoder};
//! use micro_http_encoder::context::EncoderContext;
//! use micro_http_encoder::protocol::HttpMessage;
//!
//! let ctx = EncoderContext::default();
//! let mut message = HttpMessage::request();
//! message
//!     .set_method("PUT")
//!     .set_path("/")
//!     .add_header("Content-Length", "5")
//!     .set_body(Bytes::from_static(b"hello"));
//!
//! let encoder_message = EncoderMessage::build(&ctx, &mut message, None).unwrap();
//! let mut encoder = H1Encoder::new(&ctx, encoder_message);
//!
//! let mut wire = Vec::new();
//! loop {
//!     let mut dst = BytesMut::with_capacity(16);
//!     let status = encoder.encode_next(&mut dst).unwrap();
//!     wire.extend_from_slice(&dst);
//!     if status == EncodeStatus::Done {
//!         break;
//!     }
//! }
//! assert_eq!(wire, b"PUT / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello");
//! ```

mod body;
mod framing;
mod header;
mod message_encoder;
pub(crate) mod output;
pub(crate) mod syntax;

pub use framing::{EncoderMessage, MessageOptions, StartLineRef};
pub use message_encoder::{EncodeStatus, H1Encoder};
