//! Part bodies: the lazy, borrow-scoped body reader (`Field`) used by
//! [`crate::Multipart`], and the fully-resolved part produced by
//! [`crate::SpillingMultipart`].

use bytes::{Bytes, BytesMut};
use futures_core::Stream;

use crate::error::Error;
use crate::headers::Header;
use crate::multipart::Multipart;

/// One part's headers plus a lazy handle on its body.
///
/// Borrowing `&'a mut Multipart<S>` is what gives this crate the ordering
/// guarantee the format itself requires: while a `Field` is alive, the
/// compiler will not let you ask the underlying `Multipart` for the next
/// part, so a part's body can only be read (or skipped) before the next one
/// becomes reachable.
pub struct Field<'a, S> {
    pub(crate) headers: Vec<Header>,
    pub(crate) multipart: &'a mut Multipart<S>,
    pub(crate) done: bool,
}

impl<'a, S> Field<'a, S>
where
    S: Stream<Item = Result<Bytes, std::io::Error>> + Unpin,
{
    /// This part's decoded headers, in the order they appeared.
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Read the next chunk of this part's body, or `None` once the body is
    /// fully read (the closing delimiter has been found).
    pub async fn chunk(&mut self) -> Option<Result<Bytes, Error>> {
        if self.done {
            return None;
        }
        match self.multipart.next_body_chunk().await {
            Ok(Some(bytes)) => Some(Ok(bytes)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }

    /// Drain the whole body into one buffer.
    ///
    /// Convenience only: for large bodies prefer [`Field::chunk`] directly,
    /// or [`crate::SpillingMultipart`] if the body may exceed what you're
    /// willing to hold in memory.
    pub async fn bytes(&mut self) -> Result<Bytes, Error> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.chunk().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

/// A fully-resolved part produced by [`crate::SpillingMultipart`]: headers
/// plus a body that has already been decided to live in memory or on disk.
#[derive(Debug)]
pub struct Part {
    /// This part's decoded headers, in the order they appeared.
    pub headers: Vec<Header>,
    /// The part's body.
    pub body: PartBody,
}

impl Part {
    /// Read this part's body into memory, regardless of whether it was kept
    /// buffered or spilled to disk.
    ///
    /// For a part known to have spilled, prefer reading
    /// [`PartBody::Spilled`]'s path directly with a bounded-size reader; this
    /// is a convenience for callers that already know the body is small.
    pub async fn bytes(&self) -> Result<Bytes, Error> {
        match &self.body {
            PartBody::Memory(bytes) => Ok(bytes.clone()),
            PartBody::Spilled(file) => file.read_all().await,
        }
    }
}

/// Where a resolved part's body ended up.
#[derive(Debug)]
pub enum PartBody {
    /// The body was small enough to keep buffered.
    Memory(Bytes),
    /// The body exceeded the spill threshold and was written to a temp file.
    Spilled(crate::spill::SpillFile),
}
