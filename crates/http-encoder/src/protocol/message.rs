use bytes::Bytes;
use http::{StatusCode, request, response};

use crate::protocol::Headers;

/// The first line of a HTTP message.
///
/// Requests and responses go through the same header and body pipeline; only the
/// start line differs. Method and path are optional so that a message missing either
/// can be represented and rejected by validation instead of by the type system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartLine {
    Request { method: Option<Bytes>, path: Option<Bytes> },
    Response { status: StatusCode, reason: Option<Bytes> },
}

impl StartLine {
    #[inline]
    pub fn is_request(&self) -> bool {
        matches!(self, StartLine::Request { .. })
    }

    #[inline]
    pub fn is_response(&self) -> bool {
        matches!(self, StartLine::Response { .. })
    }
}

/// Represents the size information of an HTTP payload.
///
/// This enum is used to determine how the payload should be framed:
/// - Known length: Send exact number of bytes
/// - Chunked: Send using chunked transfer encoding
/// - Empty: No payload to send
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Payload with known length in bytes
    Length(u64),
    /// Payload using chunked transfer encoding
    Chunked,
    /// Empty payload (no body)
    Empty,
}

impl PayloadSize {
    /// Returns true if the payload uses chunked transfer encoding
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    /// Returns true if the payload is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }
}

/// A HTTP message as the caller builds it, before any validation.
///
/// `B` is the body source; messages without a body can keep the default.
#[derive(Debug)]
pub struct HttpMessage<B = Bytes> {
    start_line: StartLine,
    headers: Headers,
    body: Option<B>,
}

impl<B> HttpMessage<B> {
    /// An empty request; method and path must be set before it can be encoded.
    pub fn request() -> Self {
        Self { start_line: StartLine::Request { method: None, path: None }, headers: Headers::new(), body: None }
    }

    /// A response with the canonical reason phrase of `status`.
    pub fn response(status: StatusCode) -> Self {
        Self { start_line: StartLine::Response { status, reason: None }, headers: Headers::new(), body: None }
    }

    /// Builds a request from `http` parts. Only the path and query of the uri are used.
    pub fn from_request_parts(parts: &request::Parts, body: Option<B>) -> Self {
        let path = parts.uri.path_and_query().map_or("/", http::uri::PathAndQuery::as_str);
        Self {
            start_line: StartLine::Request {
                method: Some(Bytes::copy_from_slice(parts.method.as_str().as_bytes())),
                path: Some(Bytes::copy_from_slice(path.as_bytes())),
            },
            headers: Headers::from(&parts.headers),
            body,
        }
    }

    pub fn from_response_parts(parts: &response::Parts, body: Option<B>) -> Self {
        Self {
            start_line: StartLine::Response { status: parts.status, reason: None },
            headers: Headers::from(&parts.headers),
            body,
        }
    }

    /// Sets the request method. Has no effect on a response.
    pub fn set_method(&mut self, value: impl Into<Bytes>) -> &mut Self {
        if let StartLine::Request { method, .. } = &mut self.start_line {
            *method = Some(value.into());
        }
        self
    }

    /// Sets the request path. Has no effect on a response.
    pub fn set_path(&mut self, value: impl Into<Bytes>) -> &mut Self {
        if let StartLine::Request { path, .. } = &mut self.start_line {
            *path = Some(value.into());
        }
        self
    }

    /// Overrides the reason phrase. Has no effect on a request.
    pub fn set_reason(&mut self, value: impl Into<Bytes>) -> &mut Self {
        if let StartLine::Response { reason, .. } = &mut self.start_line {
            *reason = Some(value.into());
        }
        self
    }

    pub fn add_header(&mut self, name: impl Into<Bytes>, value: impl Into<Bytes>) -> &mut Self {
        self.headers.add(name, value);
        self
    }

    pub fn set_body(&mut self, body: B) -> &mut Self {
        self.body = Some(body);
        self
    }

    pub fn take_body(&mut self) -> Option<B> {
        self.body.take()
    }

    pub fn start_line(&self) -> &StartLine {
        &self.start_line
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn body(&self) -> Option<&B> {
        self.body.as_ref()
    }

    /// Splits the message into borrows of its parts, so the headers can be read while the
    /// body is drained.
    pub(crate) fn parts_mut(&mut self) -> (&StartLine, &Headers, Option<&mut B>) {
        (&self.start_line, &self.headers, self.body.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, Request, Response};

    #[test]
    fn request_builder() {
        let mut message = HttpMessage::<Bytes>::request();
        message.set_method("PUT").set_path("/upload").add_header("Host", "amazon.com").set_reason("ignored");

        assert_eq!(
            message.start_line(),
            &StartLine::Request { method: Some(Bytes::from_static(b"PUT")), path: Some(Bytes::from_static(b"/upload")) }
        );
        assert_eq!(message.headers().len(), 1);
        assert!(message.body().is_none());
    }

    #[test]
    fn from_http_request_parts() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("http://example.com/search?q=rust")
            .header("Content-Length", "4")
            .body(())
            .unwrap();
        let (parts, ()) = request.into_parts();

        let message = HttpMessage::from_request_parts(&parts, Some(Bytes::from_static(b"body")));
        match message.start_line() {
            StartLine::Request { method, path } => {
                assert_eq!(method.as_deref(), Some(&b"POST"[..]));
                assert_eq!(path.as_deref(), Some(&b"/search?q=rust"[..]));
            }
            StartLine::Response { .. } => panic!("expect request start line"),
        }
        assert_eq!(message.headers().get_all("content-length").next(), Some(&b"4"[..]));
    }

    #[test]
    fn from_http_response_parts() {
        let (parts, ()) = Response::builder().status(StatusCode::NOT_FOUND).body(()).unwrap().into_parts();
        let message = HttpMessage::<Bytes>::from_response_parts(&parts, None);

        assert!(message.start_line().is_response());
        assert_eq!(message.start_line(), &StartLine::Response { status: StatusCode::NOT_FOUND, reason: None });
    }
}
