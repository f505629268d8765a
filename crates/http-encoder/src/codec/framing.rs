//! Message validation and framing.
//!
//! [`EncoderMessage`] is the validated, immutable description of one message that the
//! [`H1Encoder`](crate::codec::H1Encoder) consumes. Building it checks the start line and
//! headers and decides how the body is delimited on the wire:
//!
//! - `Transfer-Encoding` whose final coding is `chunked` selects chunked framing
//! - otherwise a `Content-Length` selects a fixed-length body
//! - otherwise there is no body
//!
//! Checks run in a fixed order and the first failure is returned:
//!
//! 1. method (requests)
//! 2. path (requests) or reason phrase (responses)
//! 3. header names
//! 4. header values
//! 5. `Transfer-Encoding` coding list
//! 6. `Transfer-Encoding: chunked` combined with `Content-Length`
//! 7. `Content-Length` value
//! 8. framing headers on responses that cannot have a body
//!
//! `Connection: close` detection never fails a message.
//!
//! The descriptor borrows the caller's message and chunk queue rather than copying them,
//! so neither can be touched until the descriptor (and any encoder built from it) is gone.

use http::StatusCode;
use tracing::{debug, warn};

use crate::codec::syntax;
use crate::context::EncoderContext;
use crate::ensure;
use crate::protocol::{ChunkReceiver, Header, Headers, HttpMessage, MessageError, PayloadSize, StartLine};

const TRANSFER_ENCODING: &str = "transfer-encoding";
const CONTENT_LENGTH: &str = "content-length";
const CONNECTION: &str = "connection";
const CHUNKED: &[u8] = b"chunked";
const CLOSE: &[u8] = b"close";

/// Validated start line, borrowing from the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartLineRef<'a> {
    Request { method: &'a [u8], path: &'a [u8] },
    Response { status: StatusCode, reason: &'a [u8] },
}

/// Knobs that change framing without changing validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageOptions {
    /// Send a response's framing headers but no body, as for a response to `HEAD`.
    /// Ignored for requests.
    pub body_headers_ignored: bool,
}

/// The validated, encode-ready form of one [`HttpMessage`].
#[derive(Debug)]
pub struct EncoderMessage<'a, B> {
    pub(crate) start_line: StartLineRef<'a>,
    pub(crate) headers: &'a [Header],
    pub(crate) body: Option<&'a mut B>,
    pub(crate) chunks: Option<&'a mut ChunkReceiver>,
    payload_size: PayloadSize,
    has_chunked_encoding_header: bool,
    has_connection_close_header: bool,
    content_length: u64,
    body_headers_ignored: bool,
}

impl<'a, B> EncoderMessage<'a, B> {
    /// Validates `message` and plans its framing.
    ///
    /// `chunks` is the queue of caller-built chunks for a chunked message. It is drained
    /// after the message's own body source, if there is one.
    pub fn build(
        ctx: &EncoderContext,
        message: &'a mut HttpMessage<B>,
        chunks: Option<&'a mut ChunkReceiver>,
    ) -> Result<Self, MessageError> {
        Self::build_with_options(ctx, message, chunks, MessageOptions::default())
    }

    pub fn build_with_options(
        ctx: &EncoderContext,
        message: &'a mut HttpMessage<B>,
        chunks: Option<&'a mut ChunkReceiver>,
        options: MessageOptions,
    ) -> Result<Self, MessageError> {
        let _enter = ctx.span().enter();
        let (start_line, headers, body) = message.parts_mut();

        let start_line = check_start_line(start_line)?;
        check_header_fields(headers)?;

        let chunked = transfer_encoding_is_chunked(headers)?;
        ensure!(
            !(chunked && headers.contains(CONTENT_LENGTH)),
            MessageError::invalid_header_field("transfer-encoding chunked and content-length both present in headers")
        );
        let content_length = if chunked { 0 } else { parse_content_length(headers)?.unwrap_or(0) };

        let mut body_headers_ignored = false;
        if let StartLineRef::Response { status, .. } = start_line {
            if status.is_informational() || status == StatusCode::NO_CONTENT {
                ensure!(
                    !headers.contains(CONTENT_LENGTH) && !headers.contains(TRANSFER_ENCODING),
                    MessageError::invalid_header_field(format!("status {status} must not carry body framing headers"))
                );
            }
            body_headers_ignored = options.body_headers_ignored || status == StatusCode::NOT_MODIFIED;
        }

        let has_connection_close_header = headers
            .get_all(CONNECTION)
            .flat_map(syntax::list_elements)
            .any(|token| token.eq_ignore_ascii_case(CLOSE));

        let payload_size = match (body_headers_ignored, chunked, content_length) {
            (true, ..) => PayloadSize::Empty,
            (false, true, _) => PayloadSize::Chunked,
            (false, false, 0) => PayloadSize::Empty,
            (false, false, length) => PayloadSize::Length(length),
        };

        if payload_size.is_empty() && body.is_some() && !body_headers_ignored {
            warn!("message has a body source but no content-length or chunked framing, body will not be sent");
        }
        if !payload_size.is_chunked() && chunks.is_some() {
            warn!("chunk queue supplied for a message that is not chunked, chunks will not be sent");
        }

        debug!(
            ?payload_size,
            content_length,
            chunked,
            connection_close = has_connection_close_header,
            body_headers_ignored,
            "planned message framing"
        );

        Ok(Self {
            start_line,
            headers: headers.as_slice(),
            body,
            chunks,
            payload_size,
            has_chunked_encoding_header: chunked,
            has_connection_close_header,
            content_length,
            body_headers_ignored,
        })
    }

    pub fn start_line(&self) -> StartLineRef<'a> {
        self.start_line
    }

    pub fn headers(&self) -> &'a [Header] {
        self.headers
    }

    /// The framing the body will be sent with.
    pub fn payload_size(&self) -> PayloadSize {
        self.payload_size
    }

    pub fn has_chunked_encoding_header(&self) -> bool {
        self.has_chunked_encoding_header
    }

    pub fn has_connection_close_header(&self) -> bool {
        self.has_connection_close_header
    }

    /// Declared body length; zero for chunked messages and messages without a body.
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    pub fn body_headers_ignored(&self) -> bool {
        self.body_headers_ignored
    }

    pub fn has_body_source(&self) -> bool {
        self.body.is_some()
    }

    pub fn has_chunk_queue(&self) -> bool {
        self.chunks.is_some()
    }
}

fn check_start_line(start_line: &StartLine) -> Result<StartLineRef<'_>, MessageError> {
    match start_line {
        StartLine::Request { method, path } => {
            let method = method.as_deref().ok_or(MessageError::InvalidMethod)?;
            ensure!(syntax::is_token(method), MessageError::InvalidMethod);

            let path = path.as_deref().ok_or(MessageError::InvalidPath)?;
            ensure!(syntax::is_request_target(path), MessageError::InvalidPath);

            Ok(StartLineRef::Request { method, path })
        }
        StartLine::Response { status, reason } => {
            let reason = match reason.as_deref() {
                Some(reason) => {
                    ensure!(syntax::is_reason_phrase(reason), MessageError::InvalidReason);
                    reason
                }
                None => status.canonical_reason().unwrap_or_default().as_bytes(),
            };
            Ok(StartLineRef::Response { status: *status, reason })
        }
    }
}

/// All names are checked before any value, so a bad name always wins over a bad value.
fn check_header_fields(headers: &Headers) -> Result<(), MessageError> {
    if let Some(header) = headers.iter().find(|header| !syntax::is_token(header.name())) {
        return Err(MessageError::invalid_header_name(format!("{:?} is not a token", String::from_utf8_lossy(header.name()))));
    }

    if let Some(header) = headers.iter().find(|header| !syntax::is_field_value(header.value())) {
        return Err(MessageError::invalid_header_value(format!(
            "value of {} contains control characters",
            String::from_utf8_lossy(header.name())
        )));
    }

    Ok(())
}

/// Evaluates every `Transfer-Encoding` instance as one comma-joined coding list
/// (RFC 9110 §5.3). The list must end in `chunked`, and `chunked` must appear once.
/// Empty instances and empty list elements are rejected rather than skipped.
fn transfer_encoding_is_chunked(headers: &Headers) -> Result<bool, MessageError> {
    let mut last = None;
    let mut chunked_count = 0usize;
    for value in headers.get_all(TRANSFER_ENCODING) {
        for coding in value.split(|b| *b == b',').map(<[u8]>::trim_ascii) {
            ensure!(!coding.is_empty(), MessageError::invalid_header_value("transfer-encoding has an empty coding"));
            if coding.eq_ignore_ascii_case(CHUNKED) {
                chunked_count += 1;
            }
            last = Some(coding);
        }
    }

    match last {
        None => Ok(false),
        Some(coding) if coding.eq_ignore_ascii_case(CHUNKED) => {
            ensure!(chunked_count == 1, MessageError::invalid_header_value("chunked transfer coding applied more than once"));
            Ok(true)
        }
        Some(_) => Err(MessageError::invalid_header_value("transfer-encoding must end with chunked")),
    }
}

/// Every `Content-Length` instance must be a clean decimal, and all of them must agree.
fn parse_content_length(headers: &Headers) -> Result<Option<u64>, MessageError> {
    let mut content_length = None;
    for value in headers.get_all(CONTENT_LENGTH) {
        let length = syntax::parse_content_length(value).ok_or_else(|| {
            MessageError::invalid_header_value(format!("content-length {:?} is not a decimal", String::from_utf8_lossy(value)))
        })?;

        match content_length {
            Some(previous) if previous != length => {
                return Err(MessageError::invalid_header_value(format!(
                    "conflicting content-length values {previous} and {length}"
                )));
            }
            _ => content_length = Some(length),
        }
    }
    Ok(content_length)
}
