//! The header block decoder (C4): turns the raw bytes between a part's
//! opening delimiter and the `CRLF CRLF` header terminator into an ordered
//! list of `(name, value)` pairs.
//!
//! Deliberately dumb: no `Content-Disposition` parsing, no header-name
//! canonicalization, no duplicate merging. Splitting happens on raw bytes
//! before any UTF-8 decoding, so a header value survives byte-for-byte even
//! if a later header line is malformed.

use crate::error::Error;

/// A single decoded header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// The header name, as it appeared before the first `:`.
    pub name: String,
    /// The header value, with one leading space (if any) trimmed.
    pub value: String,
}

/// Decode a header block (the bytes between a part's opening delimiter and
/// its `CRLF CRLF` terminator) into a list of headers.
///
/// Lines are split on `CRLF`. A line with no `:` is silently dropped. An
/// empty block yields an empty list.
pub(crate) fn decode(block: &[u8]) -> Result<Vec<Header>, Error> {
    let mut headers = Vec::new();
    for line in split_crlf(block) {
        if line.is_empty() {
            continue;
        }
        let Some(colon) = line.iter().position(|&b| b == b':') else {
            continue;
        };
        let name = std::str::from_utf8(&line[..colon])?;
        let mut value = &line[colon + 1..];
        if value.first() == Some(&b' ') {
            value = &value[1..];
        }
        let value = std::str::from_utf8(value)?;
        headers.push(Header { name: name.to_string(), value: value.to_string() });
    }
    Ok(headers)
}

fn split_crlf(block: &[u8]) -> impl Iterator<Item = &[u8]> {
    block.split(|&b| b == b'\n').map(|line| {
        if line.last() == Some(&b'\r') {
            &line[..line.len() - 1]
        } else {
            line
        }
    })
}
