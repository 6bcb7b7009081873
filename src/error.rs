//! The error currency for this crate.

use thiserror::Error;

/// Errors produced while scanning or decoding a multipart body.
///
/// All variants here are "malformed message body" conditions: the caller's
/// connection is fine, the bytes it handed us just don't describe a valid
/// `multipart/*` message (or exceed a configured limit).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The input stream produced no bytes at all.
    #[error("multipart body was empty")]
    EmptyStream,

    /// The input ended while still searching for the opening boundary.
    #[error("input ended before the opening boundary was found")]
    MalformedStart,

    /// A header block exceeded the configured `header_limit`.
    #[error("header block exceeded the configured limit of {limit} bytes")]
    HeaderTooLarge {
        /// The limit that was exceeded.
        limit: usize,
    },

    /// The input ended in the middle of matching a boundary delimiter.
    #[error("input ended while matching a boundary delimiter")]
    PartialBoundary,

    /// A part's body was not followed by a closing delimiter before end of stream.
    #[error("part body was not terminated by a closing boundary")]
    UnterminatedPart,

    /// The spill driver's `max_parts` ceiling was exceeded with `fail_on_limit` set.
    #[error("multipart message exceeded the configured limit of {max_parts} parts")]
    PartsLimitExceeded {
        /// The configured ceiling.
        max_parts: usize,
    },

    /// A header value (or header block) was not valid UTF-8.
    #[error("header block was not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// An I/O error from the underlying byte source, or from spill-file I/O.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
