//! A streaming parser for `multipart/form-data` bodies.
//!
//! [`Multipart`] finds part boundaries across arbitrarily chunked input and
//! hands back one [`Field`] at a time, each borrowing the driver for the
//! lifetime of its body — the ordering the wire format requires (no peeking
//! at part `N + 1` while part `N`'s body is still open) falls directly out
//! of the borrow checker rather than being enforced at runtime.
//!
//! [`SpillingMultipart`] builds on the same boundary scanner but resolves
//! each part's body eagerly, spilling it to a temporary file once it grows
//! past a configurable threshold, and hands back owned [`Part`] values.
//!
//! Both drivers take any `S: Stream<Item = Result<bytes::Bytes,
//! std::io::Error>> + Unpin` as input, so they work the same whether the
//! bytes come from a socket, a file, or an in-memory buffer.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod boundary;
mod cursor;
mod error;
mod headers;
mod multipart;
mod part;
mod spill;
mod spilling;

pub use error::Error;
pub use headers::Header;
pub use multipart::{Config, Multipart};
pub use part::{Field, Part, PartBody};
pub use spill::{SpillConfig, SpillFile};
pub use spilling::SpillingMultipart;
