//! The part-by-part driver (C5): turns a boundary and a byte stream into a
//! sequence of [`Field`]s, each borrowing the driver for the duration of its
//! body.

use bytes::Bytes;
use futures_core::Stream;

use crate::boundary::{Delimiters, HDR_END};
use crate::cursor::{Before, Budget, ChunkCursor};
use crate::error::Error;
use crate::headers::{self, Header};
use crate::part::{Field, Part, PartBody};

/// Tunables for [`Multipart`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum size, in bytes, of a single part's header block. Exceeding
    /// this yields [`Error::HeaderTooLarge`].
    pub header_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config { header_limit: 1024 }
    }
}

impl Config {
    /// Set [`Config::header_limit`].
    #[must_use]
    pub fn with_header_limit(mut self, header_limit: usize) -> Self {
        self.header_limit = header_limit;
        self
    }
}

#[derive(Debug, PartialEq, Eq)]
enum State {
    /// Before the opening boundary has been found.
    Prelude,
    /// Between a closing boundary and the next part's headers (or the
    /// terminal marker).
    BetweenParts,
    /// A `Field` has been handed out; its body may or may not have been
    /// fully drained.
    InPart,
    /// The terminal boundary has been consumed; no more parts follow.
    Done,
}

/// Drives a `multipart/form-data` body one part at a time.
///
/// Parts must be consumed in order: [`Multipart::next_field`] takes `&mut
/// self`, and the [`Field`] it returns borrows that same `&mut self`, so the
/// compiler refuses to let you request part `i + 1` while part `i`'s body is
/// still reachable.
pub struct Multipart<S> {
    cursor: ChunkCursor<S>,
    delims: Delimiters,
    state: State,
    k: usize,
    config: Config,
}

impl<S> Multipart<S>
where
    S: Stream<Item = Result<Bytes, std::io::Error>> + Unpin,
{
    /// Build a driver over `source`, splitting on `boundary` (the bare token
    /// from the `Content-Type: multipart/form-data; boundary=...` header,
    /// without the leading `--`).
    pub fn new(source: S, boundary: impl AsRef<[u8]>, config: Config) -> Self {
        Multipart {
            cursor: ChunkCursor::new(source),
            delims: Delimiters::new(boundary.as_ref()),
            state: State::Prelude,
            k: 0,
            config,
        }
    }

    /// Return the next part, or `None` once the terminal boundary has been
    /// consumed.
    ///
    /// If the previous `Field` didn't fully drain its body, its remaining
    /// bytes are skipped here before the next part's headers are read.
    pub async fn next_field(&mut self) -> Result<Option<Field<'_, S>>, Error> {
        match self.state {
            State::Done => return Ok(None),
            State::Prelude => {
                self.skip_prelude().await?;
            }
            State::BetweenParts => {
                // Already positioned right after the inter-part delimiter by
                // whichever call transitioned us into this state.
            }
            State::InPart => {
                self.drain_current_body().await?;
                if self.state == State::Done {
                    return Ok(None);
                }
            }
        }

        let headers = self.read_header_block().await?;
        self.state = State::InPart;
        self.k = 0;
        Ok(Some(Field { headers, multipart: self, done: false }))
    }

    /// Drain every remaining part into memory and return them as one
    /// buffered vector, rather than one [`Field`] at a time.
    ///
    /// This is the fully-buffered counterpart to [`Multipart::next_field`]:
    /// since this driver never spills, every body ends up as
    /// [`PartBody::Memory`]. Prefer [`Multipart::next_field`] for large or
    /// unboundedly-sized bodies; use [`crate::SpillingMultipart`] instead if
    /// bodies may be too large to hold all at once.
    pub async fn collect(mut self) -> Result<Vec<Part>, Error> {
        let mut parts = Vec::new();
        while let Some(mut field) = self.next_field().await? {
            let headers = field.headers().to_vec();
            let body = field.bytes().await?;
            parts.push(Part { headers, body: PartBody::Memory(body) });
        }
        Ok(parts)
    }

    /// Scan forward until the opening boundary is found, discarding any
    /// preamble bytes before it.
    async fn skip_prelude(&mut self) -> Result<(), Error> {
        let delim = self.delims.start.clone();
        let mut budget = Budget::unlimited();
        loop {
            match self.cursor.read_before(&delim, &mut self.k, &mut budget).await {
                Ok(Before::Chunk(_)) => continue,
                Ok(Before::Delimiter) => {
                    tracing::trace!("opening boundary found, prelude skipped");
                    return Ok(());
                }
                Err(Error::PartialBoundary) if !self.cursor.seen_any_bytes() => {
                    return Err(Error::EmptyStream);
                }
                Err(Error::PartialBoundary) => return Err(Error::MalformedStart),
                Err(e) => return Err(e),
            }
        }
    }

    /// After matching the inter-part delimiter, check whether it's
    /// immediately followed by `--` (the terminal marker) or more input.
    async fn resolve_after_inter(&mut self) -> Result<(), Error> {
        let peeked = self.cursor.peek2().await?;
        if peeked == b"--" {
            self.cursor.advance(2);
            tracing::trace!("terminal boundary reached");
            self.state = State::Done;
        } else {
            self.state = State::BetweenParts;
        }
        Ok(())
    }

    async fn read_header_block(&mut self) -> Result<Vec<Header>, Error> {
        let mut block = Vec::new();
        let mut k = 0usize;
        let mut budget = Budget::limited(self.config.header_limit);
        loop {
            match self.cursor.read_before(HDR_END, &mut k, &mut budget).await {
                Ok(Before::Chunk(bytes)) => block.extend_from_slice(&bytes),
                Ok(Before::Delimiter) => break,
                Err(e) => return Err(e),
            }
        }
        headers::decode(&block)
    }

    /// Read the next chunk of the current part's body, or `None` once the
    /// closing delimiter is found (in which case `self.state` is advanced).
    pub(crate) async fn next_body_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        debug_assert_eq!(self.state, State::InPart);
        let mut budget = Budget::unlimited();
        match self.cursor.read_before(&self.delims.inter.clone(), &mut self.k, &mut budget).await {
            Ok(Before::Chunk(bytes)) => Ok(Some(bytes)),
            Ok(Before::Delimiter) => {
                self.resolve_after_inter().await?;
                Ok(None)
            }
            Err(Error::PartialBoundary) => Err(Error::UnterminatedPart),
            Err(e) => Err(e),
        }
    }

    async fn drain_current_body(&mut self) -> Result<(), Error> {
        loop {
            if self.next_body_chunk().await?.is_none() {
                return Ok(());
            }
        }
    }
}
