//! The spill driver (C6): resolves each part's body fully (in memory or on
//! disk) before handing it back, rather than leaving it as a lazy,
//! borrow-scoped stream.
//!
//! Unlike [`crate::Multipart`], this driver owns the decision of where a
//! part's bytes end up, so it returns an owned [`Part`] rather than a
//! borrowing [`crate::Field`] — there's nothing left to borrow once the body
//! has already been fully written out.

use bytes::Bytes;
use futures_core::Stream;

use crate::error::Error;
use crate::multipart::{Config, Multipart};
use crate::part::Part;
use crate::spill::{SpillConfig, SpillWriter};

/// Drives a `multipart/form-data` body one part at a time, spilling
/// oversized bodies to temporary files.
pub struct SpillingMultipart<S> {
    inner: Multipart<S>,
    spill: SpillConfig,
    parts_seen: usize,
    stopped: bool,
}

impl<S> SpillingMultipart<S>
where
    S: Stream<Item = Result<Bytes, std::io::Error>> + Unpin,
{
    /// Build a driver over `source`, splitting on `boundary` (the bare token
    /// from the `Content-Type` header, without the leading `--`).
    pub fn new(source: S, boundary: impl AsRef<[u8]>, header_limit: usize, spill: SpillConfig) -> Self {
        SpillingMultipart {
            inner: Multipart::new(source, boundary, Config { header_limit }),
            spill,
            parts_seen: 0,
            stopped: false,
        }
    }

    /// Return the next fully-resolved part, or `None` once the message is
    /// exhausted.
    ///
    /// If `max_parts` is reached and `fail_on_limit` is false, this returns
    /// `None` without draining the rest of the stream; the caller is
    /// responsible for deciding whether that's acceptable for their
    /// transport.
    pub async fn next_part(&mut self) -> Result<Option<Part>, Error> {
        if self.stopped {
            return Ok(None);
        }
        if self.parts_seen >= self.spill.max_parts {
            if self.spill.fail_on_limit {
                return Err(Error::PartsLimitExceeded { max_parts: self.spill.max_parts });
            }
            tracing::warn!(max_parts = self.spill.max_parts, "stopping after part limit");
            self.stopped = true;
            return Ok(None);
        }

        let Some(mut field) = self.inner.next_field().await? else {
            self.stopped = true;
            return Ok(None);
        };
        self.parts_seen += 1;
        let headers = field.headers().to_vec();

        let mut writer = SpillWriter::new();
        while let Some(chunk) = field.chunk().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => return Err(e),
            };
            writer.write(&chunk, self.spill.max_before_write).await?;
        }
        let body = writer.finish().await?;

        Ok(Some(Part { headers, body }))
    }
}
