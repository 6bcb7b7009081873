//! The chunk cursor: pulls `Bytes` off a `Stream`, feeds them through the
//! boundary scanner (C1), and hands callers the bytes that fall *before* a
//! delimiter, one "before"-slice at a time, until the delimiter itself is
//! found.
//!
//! This is C2 (unlimited splitting, used while hunting for the opening or an
//! inter-part boundary) and C3 (byte-budgeted splitting, used while reading a
//! header block) unified behind one driver: the only difference between them
//! is whether `read_before` enforces a byte ceiling.

use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use futures_util::StreamExt;

use crate::boundary::{scan, ScanOutcome};
use crate::error::Error;

/// Wraps the caller's byte stream with the carry buffer the scanner needs to
/// track a delimiter match across chunk boundaries.
pub(crate) struct ChunkCursor<S> {
    source: S,
    /// Bytes already read from `source` that haven't yet been classified.
    /// The first `k` bytes (the `k` tracked by the caller's scanner state)
    /// are the ambiguous delimiter-prefix match already confirmed; anything
    /// beyond that is freshly pulled input that the next `scan` call has not
    /// looked at yet. `scan` is only ever given that unscanned tail, never
    /// the already-accounted-for prefix, so its `k_in`/byte-index bookkeeping
    /// isn't re-applied to bytes it has already judged once.
    carry: BytesMut,
    eof: bool,
    /// Whether `source` has ever yielded a non-empty chunk. Distinguishes a
    /// completely empty input (`Error::EmptyStream`) from one that ran out
    /// partway through the opening boundary (`Error::MalformedStart`).
    seen_any_bytes: bool,
    /// Set when a `Matched` outcome had leftover "before" bytes that had to
    /// be returned as a `Before::Chunk` first: the delimiter itself was
    /// already consumed by that same call, so the *next* `read_before` call
    /// must report `Before::Delimiter` immediately, without scanning
    /// anything further.
    delimiter_pending: bool,
}

/// What `read_before` found.
pub(crate) enum Before {
    /// More non-delimiter bytes. The delimiter has not been found yet.
    Chunk(Bytes),
    /// The delimiter was found; nothing (or nothing more) precedes it.
    Delimiter,
}

impl<S> ChunkCursor<S>
where
    S: Stream<Item = Result<Bytes, std::io::Error>> + Unpin,
{
    pub(crate) fn new(source: S) -> Self {
        ChunkCursor {
            source,
            carry: BytesMut::new(),
            eof: false,
            seen_any_bytes: false,
            delimiter_pending: false,
        }
    }

    /// True once the source is exhausted and there is no leftover carry or
    /// pending delimiter notification.
    pub(crate) fn is_drained(&self) -> bool {
        self.eof && self.carry.is_empty() && !self.delimiter_pending
    }

    /// Whether any bytes have ever been pulled off the underlying source.
    pub(crate) fn seen_any_bytes(&self) -> bool {
        self.seen_any_bytes
    }

    async fn pull(&mut self) -> Result<bool, Error> {
        if self.eof {
            return Ok(false);
        }
        match self.source.next().await {
            Some(Ok(bytes)) => {
                if !bytes.is_empty() {
                    self.seen_any_bytes = true;
                }
                self.carry.extend_from_slice(&bytes);
                Ok(true)
            }
            Some(Err(e)) => Err(Error::Io(e)),
            None => {
                self.eof = true;
                Ok(false)
            }
        }
    }

    /// Scan forward for `delim`, returning the next slice of confirmed
    /// non-delimiter bytes, or `Before::Delimiter` once `delim` has been
    /// consumed. Call repeatedly (draining `Before::Chunk`s) until
    /// `Before::Delimiter` is returned.
    ///
    /// If `limit` is `Some(n)`, returns `Error::HeaderTooLarge` as soon as the
    /// cumulative count of confirmed non-delimiter bytes (since the last
    /// delimiter) would exceed `n`.
    pub(crate) async fn read_before(
        &mut self,
        delim: &[u8],
        k: &mut usize,
        budget: &mut Budget,
    ) -> Result<Before, Error> {
        if self.delimiter_pending {
            self.delimiter_pending = false;
            *k = 0;
            return Ok(Before::Delimiter);
        }

        loop {
            // The first `*k` bytes of `carry` are the already-confirmed
            // ambiguous prefix; anything beyond that is unscanned input.
            if self.carry.len() == *k {
                if !self.pull().await? {
                    return Err(Error::PartialBoundary);
                }
                continue;
            }

            let prefix_len = *k;
            let mut chunk = self.carry.split_off(prefix_len);
            // `self.carry` now holds exactly the `prefix_len`-byte prefix;
            // `chunk` is the newly pulled, not-yet-scanned suffix.
            let step = scan(delim, prefix_len, &chunk);
            budget.add(step.consumed)?;

            match step.outcome {
                ScanOutcome::NoMatch => {
                    self.carry.unsplit(chunk);
                    *k = 0;
                    let out = self.carry.split().freeze();
                    return Ok(Before::Chunk(out));
                }
                ScanOutcome::Matched { before, tail_from } => {
                    let tail = chunk.split_off(tail_from);
                    *k = 0;
                    if before > 0 {
                        let new_before = before - prefix_len;
                        let mut out = std::mem::replace(&mut self.carry, BytesMut::new());
                        out.extend_from_slice(&chunk[..new_before]);
                        self.carry.extend_from_slice(&tail);
                        self.delimiter_pending = true;
                        return Ok(Before::Chunk(out.freeze()));
                    }
                    // The old prefix and the matched portion of `chunk` were
                    // entirely consumed by the delimiter itself; nothing to
                    // flush as content.
                    self.carry.clear();
                    self.carry.extend_from_slice(&tail);
                    return Ok(Before::Delimiter);
                }
                ScanOutcome::Partial { before } => {
                    *k = step.k_out;
                    if before > 0 {
                        let new_before = before - prefix_len;
                        let mut out = std::mem::replace(&mut self.carry, BytesMut::new());
                        out.extend_from_slice(&chunk[..new_before]);
                        self.carry.extend_from_slice(&chunk[new_before..]);
                        return Ok(Before::Chunk(out.freeze()));
                    }
                    // No reset occurred: old prefix and the whole new chunk
                    // together form the (longer) ambiguous prefix so far.
                    self.carry.unsplit(chunk);
                    if !self.pull().await? {
                        return Err(Error::PartialBoundary);
                    }
                }
            }
        }
    }

    /// Peek at the next 2 bytes without consuming them, pulling more input if
    /// needed. Used right after an `inter` match to distinguish a normal
    /// part separator from the terminal `--` marker. Returns fewer than 2
    /// bytes only at end of stream.
    pub(crate) async fn peek2(&mut self) -> Result<&[u8], Error> {
        while self.carry.len() < 2 && !self.eof {
            self.pull().await?;
        }
        let n = self.carry.len().min(2);
        Ok(&self.carry[..n])
    }

    /// Drop the first `n` bytes of the carry (used after `peek2` confirms
    /// what they are).
    pub(crate) fn advance(&mut self, n: usize) {
        let _ = self.carry.split_to(n.min(self.carry.len()));
    }
}

/// Tracks a byte ceiling across repeated `read_before` calls; `None` means unlimited.
pub(crate) struct Budget {
    limit: Option<usize>,
    used: usize,
}

impl Budget {
    pub(crate) fn unlimited() -> Self {
        Budget { limit: None, used: 0 }
    }

    pub(crate) fn limited(limit: usize) -> Self {
        Budget { limit: Some(limit), used: 0 }
    }

    fn add(&mut self, n: usize) -> Result<(), Error> {
        self.used += n;
        if let Some(limit) = self.limit {
            if self.used > limit {
                return Err(Error::HeaderTooLarge { limit });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn src(chunks: Vec<&'static [u8]>) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Unpin {
        stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from_static(c))))
    }

    #[tokio::test]
    async fn finds_delimiter_in_single_chunk() {
        let mut cursor = ChunkCursor::new(src(vec![b"hello--B world"]));
        let mut k = 0;
        let mut budget = Budget::unlimited();
        let before = cursor.read_before(b"--B", &mut k, &mut budget).await.unwrap();
        match before {
            Before::Chunk(b) => assert_eq!(&b[..], b"hello"),
            _ => panic!("expected chunk"),
        }
        let next = cursor.read_before(b"--B", &mut k, &mut budget).await.unwrap();
        assert!(matches!(next, Before::Delimiter));
    }

    #[tokio::test]
    async fn delimiter_split_across_chunks() {
        let mut cursor = ChunkCursor::new(src(vec![b"hello--", b"B world"]));
        let mut k = 0;
        let mut budget = Budget::unlimited();
        let before = cursor.read_before(b"--B", &mut k, &mut budget).await.unwrap();
        match before {
            Before::Chunk(b) => assert_eq!(&b[..], b"hello"),
            _ => panic!("expected chunk"),
        }
        let next = cursor.read_before(b"--B", &mut k, &mut budget).await.unwrap();
        assert!(matches!(next, Before::Delimiter));
    }

    #[tokio::test]
    async fn unterminated_input_errors() {
        let mut cursor = ChunkCursor::new(src(vec![b"hello world, no delimiter here"]));
        let mut k = 0;
        let mut budget = Budget::unlimited();
        let first = cursor.read_before(b"--B", &mut k, &mut budget).await.unwrap();
        assert!(matches!(first, Before::Chunk(_)));
        let err = cursor.read_before(b"--B", &mut k, &mut budget).await;
        assert!(matches!(err, Err(Error::PartialBoundary)));
    }

    #[tokio::test]
    async fn header_block_immediately_followed_by_delimiter_does_not_panic() {
        // Regresses the carry/`k` double-counting bug: a header block ends
        // right at the delimiter (no body bytes in between), so the very
        // next `read_before` call must hand back `Before::Delimiter` without
        // re-scanning the bytes it just matched.
        let mut cursor = ChunkCursor::new(src(vec![b"X: 1\r\n\r\n\r\n--B\r\n"]));
        let mut k = 0;
        let mut budget = Budget::limited(1024);
        let before = cursor.read_before(b"\r\n\r\n", &mut k, &mut budget).await.unwrap();
        match before {
            Before::Chunk(b) => assert_eq!(&b[..], b"X: 1"),
            _ => panic!("expected header block chunk"),
        }
        let next = cursor.read_before(b"\r\n\r\n", &mut k, &mut budget).await.unwrap();
        assert!(matches!(next, Before::Delimiter));
    }

    #[tokio::test]
    async fn false_start_carry_is_reclassified_as_content_when_it_breaks() {
        // A partial match ("--") straddles a chunk boundary, then the next
        // chunk's first byte breaks it (not a real delimiter occurrence),
        // before a *real* match is found later in that same chunk. Both the
        // abandoned "--" and the byte that broke it must be emitted as one
        // `Before::Chunk`, and the real match must still be reported
        // correctly on the following call.
        let mut cursor = ChunkCursor::new(src(vec![b"x--", b"y--B z"]));
        let mut k = 0;
        let mut budget = Budget::unlimited();

        let first = cursor.read_before(b"--B", &mut k, &mut budget).await.unwrap();
        match first {
            Before::Chunk(b) => assert_eq!(&b[..], b"x"),
            _ => panic!("expected chunk"),
        }

        let second = cursor.read_before(b"--B", &mut k, &mut budget).await.unwrap();
        match second {
            Before::Chunk(b) => assert_eq!(&b[..], b"--y"),
            _ => panic!("expected chunk"),
        }

        let third = cursor.read_before(b"--B", &mut k, &mut budget).await.unwrap();
        assert!(matches!(third, Before::Delimiter));
    }

    #[tokio::test]
    async fn limit_is_enforced() {
        let mut cursor = ChunkCursor::new(src(vec![b"0123456789--B"]));
        let mut k = 0;
        let mut budget = Budget::limited(4);
        let err = cursor.read_before(b"--B", &mut k, &mut budget).await;
        assert!(matches!(err, Err(Error::HeaderTooLarge { limit: 4 })));
    }
}
