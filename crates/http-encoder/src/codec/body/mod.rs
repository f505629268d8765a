//! HTTP body encoding for outgoing message payloads
//!
//! This module writes message bodies using the framing chosen when the message was
//! validated.
//!
//! # Components
//!
//! - [`ChunkedEncoder`](chunked_encoder::ChunkedEncoder): chunked transfer encoding from a body source and/or a chunk queue
//! - [`LengthEncoder`](length_encoder::LengthEncoder): exactly `Content-Length` bytes from a body source
//! - [`PayloadEncoder`]: selects between the two, or writes nothing
//!
//! Every encoder writes only into the spare capacity of the output buffer and resumes
//! where it stopped on the next call.

mod chunked_encoder;
mod length_encoder;
mod payload_encoder;

pub(crate) use payload_encoder::PayloadEncoder;
