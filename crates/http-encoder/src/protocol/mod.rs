//! Message model consumed by the encoder.
//!
//! Nothing here is validated on construction; validation happens once, when a message is
//! turned into an [`EncoderMessage`](crate::codec::EncoderMessage).
//!
//! # Components
//!
//! - **Messages** ([`message`]): [`HttpMessage`] with a tagged [`StartLine`], plus the
//!   [`PayloadSize`] framing decided for it
//! - **Headers** ([`header`]): ordered, case-preserving [`Headers`]
//! - **Chunks** ([`chunk`]): caller-built [`Chunk`]s and the [`chunk_channel`] queue
//! - **Bodies** ([`body`]): the non-blocking [`BodySource`](body::BodySource) trait and
//!   its implementations
//! - **Errors** ([`error`]): [`MessageError`] for validation, [`SendError`] for
//!   mid-stream failures, [`HttpError`] for both

mod message;
pub use message::HttpMessage;
pub use message::PayloadSize;
pub use message::StartLine;

mod header;
pub use header::Header;
pub use header::Headers;

mod chunk;
pub(crate) use chunk::NextChunk;
pub use chunk::Chunk;
pub use chunk::ChunkExtension;
pub use chunk::ChunkReceiver;
pub use chunk::ChunkSender;
pub use chunk::chunk_channel;

mod error;
pub use error::HttpError;
pub use error::MessageError;
pub use error::SendError;

pub mod body;
