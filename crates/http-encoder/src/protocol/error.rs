use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("message error: {source}")]
    MessageError {
        #[from]
        source: MessageError,
    },

    #[error("send error: {source}")]
    SendError {
        #[from]
        source: SendError,
    },
}

/// Validation failures detected while building an [`EncoderMessage`](crate::codec::EncoderMessage).
///
/// Every variant is terminal for the message: nothing is written and the caller keeps
/// ownership of everything it lent to the builder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http request path")]
    InvalidPath,

    #[error("invalid http reason phrase")]
    InvalidReason,

    #[error("invalid header name: {reason}")]
    InvalidHeaderName { reason: String },

    #[error("invalid header value: {reason}")]
    InvalidHeaderValue { reason: String },

    #[error("invalid header field: {reason}")]
    InvalidHeaderField { reason: String },

    #[error("invalid chunk extension: {reason}")]
    InvalidChunkExtension { reason: String },
}

impl MessageError {
    pub fn invalid_header_name<S: ToString>(str: S) -> Self {
        Self::InvalidHeaderName { reason: str.to_string() }
    }

    pub fn invalid_header_value<S: ToString>(str: S) -> Self {
        Self::InvalidHeaderValue { reason: str.to_string() }
    }

    pub fn invalid_header_field<S: ToString>(str: S) -> Self {
        Self::InvalidHeaderField { reason: str.to_string() }
    }

    pub fn invalid_chunk_extension<S: ToString>(str: S) -> Self {
        Self::InvalidChunkExtension { reason: str.to_string() }
    }
}

/// Failures raised while a message is on the wire.
///
/// After any of these the bytes already produced are a truncated message, so the
/// connection that carried them must be closed.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("body ended after {written} of {expected} declared bytes")]
    ShortBody { expected: u64, written: u64 },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("encoder aborted by an earlier error")]
    Aborted,

    #[error("encoder made no progress with {capacity} bytes of output space while its body was ready")]
    NoProgress { capacity: usize },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn short_body(expected: u64, written: u64) -> Self {
        Self::ShortBody { expected, written }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn no_progress(capacity: usize) -> Self {
        Self::NoProgress { capacity }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
