//! Byte-level HTTP/1.1 grammar checks shared by the framing planner and the chunk builders.
//!
//! Grammar references are RFC 9110 §5.6 (tokens, lists, field values) and RFC 9112 §3
//! (request-target, reason-phrase).

/// Returns true if `byte` is a `tchar`.
///
/// ```text
/// tchar = "!" / "#" / "$" / "%" / "&" / "'" / "*" / "+" / "-" / "." /
///         "^" / "_" / "`" / "|" / "~" / DIGIT / ALPHA
/// ```
#[inline]
pub(crate) const fn is_tchar(byte: u8) -> bool {
    matches!(
        byte,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
    ) || byte.is_ascii_alphanumeric()
}

/// A token is one or more `tchar`. Used for methods, header names and chunk extensions.
pub(crate) fn is_token(bytes: &[u8]) -> bool {
    !bytes.is_empty() && bytes.iter().all(|b| is_tchar(*b))
}

/// Control bytes other than HTAB are never allowed in a field value or reason phrase.
#[inline]
const fn is_forbidden_ctl(byte: u8) -> bool {
    (byte < 0x20 && byte != b'\t') || byte == 0x7f
}

/// Checks `field-value = *( VCHAR / obs-text / SP / HTAB )`.
///
/// Any CR or LF is rejected, which rules out obsolete line folding as well as header injection.
pub(crate) fn is_field_value(bytes: &[u8]) -> bool {
    !bytes.iter().any(|b| is_forbidden_ctl(*b))
}

/// Reason phrases share the field-value alphabet.
pub(crate) fn is_reason_phrase(bytes: &[u8]) -> bool {
    is_field_value(bytes)
}

/// The request-target must be non-empty and free of whitespace and control bytes,
/// otherwise the request line could be split or extended on the wire.
pub(crate) fn is_request_target(bytes: &[u8]) -> bool {
    !bytes.is_empty() && !bytes.iter().any(|b| *b <= b' ' || *b == 0x7f)
}

/// Iterates the elements of a comma-separated list value, trimming optional whitespace
/// and skipping empty elements (RFC 9110 §5.6.1).
pub(crate) fn list_elements(value: &[u8]) -> impl Iterator<Item = &[u8]> {
    value.split(|b| *b == b',').map(<[u8]>::trim_ascii).filter(|element| !element.is_empty())
}

/// Parses a Content-Length value.
///
/// Only a clean decimal is accepted: ASCII digits, no sign, no surrounding whitespace,
/// no leading zeros other than a lone `0`, and no overflow.
pub(crate) fn parse_content_length(value: &[u8]) -> Option<u64> {
    match value {
        [] => None,
        [b'0'] => Some(0),
        [b'0', ..] => None,
        digits => digits.iter().try_fold(0u64, |acc, b| {
            if b.is_ascii_digit() { acc.checked_mul(10)?.checked_add(u64::from(b - b'0')) } else { None }
        }),
    }
}

/// Number of lowercase hex digits needed to print `n`; zero prints as a single `0`.
#[inline]
pub(crate) const fn hex_len(n: usize) -> usize {
    if n == 0 { 1 } else { (usize::BITS - n.leading_zeros()).div_ceil(4) as usize }
}

/// Writes `n` as lowercase hex into the front of `dst`, which must hold `hex_len(n)` bytes.
pub(crate) fn write_hex(n: usize, dst: &mut [u8]) {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let len = hex_len(n);
    let mut rest = n;
    for slot in dst[..len].iter_mut().rev() {
        *slot = DIGITS[rest & 0xf];
        rest >>= 4;
    }
}
