//! Explicit encoder context.
//!
//! Every entry point takes an [`EncoderContext`] instead of reading process-wide state.
//! It carries the [`EncoderConfig`] and the tracing span that every encoder it creates is
//! nested under. Dropping the context ends its lifecycle; encoders keep a copy of what
//! they need, so they may outlive it.

use tracing::{Span, debug_span};

/// Default upper bound for the data carried by one chunk cut from a body source.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 16 * 1024;

/// Default size of the buffer a [`MessageWriter`](crate::connection::MessageWriter) encodes into.
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 8 * 1024;

/// Smallest accepted write buffer: large enough for one byte of chunked data and its framing.
pub(crate) const MIN_WRITE_BUFFER_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderConfig {
    max_chunk_size: usize,
    write_buffer_size: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self { max_chunk_size: DEFAULT_MAX_CHUNK_SIZE, write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE }
    }
}

impl EncoderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the data size of chunks cut from a body source. Caller-built chunks are never split.
    ///
    /// Zero is raised to one.
    #[must_use]
    pub fn max_chunk_size(mut self, size: usize) -> Self {
        self.max_chunk_size = size.max(1);
        self
    }

    #[must_use]
    pub fn write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size.max(MIN_WRITE_BUFFER_SIZE);
        self
    }

    pub fn get_max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    pub fn get_write_buffer_size(&self) -> usize {
        self.write_buffer_size
    }
}

#[derive(Debug)]
pub struct EncoderContext {
    config: EncoderConfig,
    span: Span,
}

impl EncoderContext {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config, span: debug_span!("http_encoder") }
    }

    /// Uses `span` as the parent of every encoder span created from this context.
    pub fn with_span(config: EncoderConfig, span: Span) -> Self {
        Self { config, span }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Default for EncoderContext {
    fn default() -> Self {
        Self::new(EncoderConfig::default())
    }
}
