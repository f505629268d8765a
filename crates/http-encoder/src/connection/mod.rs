//! Async message writing
//!
//! This module drives an [`H1Encoder`](crate::codec::H1Encoder) against a tokio
//! [`AsyncWrite`](tokio::io::AsyncWrite). It owns the bounded write buffer, hands it to the
//! encoder, writes out what was produced and waits for body data whenever the encoder
//! stalls.
//!
//! # Components
//!
//! - [`MessageWriter`]: writes one message at a time to the underlying writer
//!
//! Connection reuse is left to the caller: after a successful write the writer can send
//! the next message, after a failed one the connection must be closed.

mod message_writer;

pub use message_writer::MessageWriter;
