//! Ordered, case-preserving header list.
//!
//! Unlike `http::HeaderMap`, names keep the exact bytes the caller supplied and
//! duplicates stay in insertion order, which is what goes on the wire.

use bytes::Bytes;
use http::HeaderMap;

/// A single header field. Both halves are opaque bytes until validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    name: Bytes,
    value: Bytes,
}

impl Header {
    pub fn new(name: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self { name: name.into(), value: value.into() }
    }

    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// ASCII case-insensitive name comparison.
    #[inline]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.as_bytes())
    }
}

/// Headers in caller-supplied order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    inner: Vec<Header>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { inner: Vec::with_capacity(capacity) }
    }

    /// Appends a header; an existing header with the same name is kept.
    pub fn add(&mut self, name: impl Into<Bytes>, value: impl Into<Bytes>) -> &mut Self {
        self.inner.push(Header::new(name, value));
        self
    }

    /// Values of every header named `name`, in document order.
    pub fn get_all<'h>(&'h self, name: &'h str) -> impl Iterator<Item = &'h [u8]> + 'h {
        self.inner.iter().filter(move |header| header.is(name)).map(Header::value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.iter().any(|header| header.is(name))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Header> {
        self.inner.iter()
    }

    pub fn as_slice(&self) -> &[Header] {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<'h> IntoIterator for &'h Headers {
    type Item = &'h Header;
    type IntoIter = std::slice::Iter<'h, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Header> for Headers {
    fn from_iter<I: IntoIterator<Item = Header>>(iter: I) -> Self {
        Self { inner: iter.into_iter().collect() }
    }
}

impl<N, V> FromIterator<(N, V)> for Headers
where
    N: Into<Bytes>,
    V: Into<Bytes>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        iter.into_iter().map(|(name, value)| Header::new(name, value)).collect()
    }
}

/// The `http` crate stores names lowercased, so that is what will be written.
impl From<&HeaderMap> for Headers {
    fn from(map: &HeaderMap) -> Self {
        let mut headers = Headers::with_capacity(map.len());
        for (name, value) in map {
            headers.add(Bytes::copy_from_slice(name.as_str().as_bytes()), Bytes::copy_from_slice(value.as_bytes()));
        }
        headers
    }
}
