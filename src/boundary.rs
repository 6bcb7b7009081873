//! The boundary scanner (C1): an incremental byte-matcher that locates a
//! delimiter across arbitrarily chunked input.
//!
//! This is deliberately *not* a general KMP automaton: per the byte
//! transition rule below, a byte that doesn't continue the current match but
//! does equal `delim[0]` restarts the match at `k = 1` rather than falling
//! back to the proper KMP failure function. That's fine for the delimiters
//! this crate ever searches for (`--boundary`, `\r\n--boundary`, `\r\n\r\n`),
//! none of which have a repeating internal prefix that the simplification
//! would mis-handle, and it keeps the hot loop branch-trivial.

const CRLF: &[u8] = b"\r\n";

/// The three delimiters derived from a caller-supplied boundary token.
pub(crate) struct Delimiters {
    /// `"--" ++ boundary` — opens the first part.
    pub start: Vec<u8>,
    /// `CRLF ++ "--" ++ boundary` — separates parts.
    pub inter: Vec<u8>,
}

impl Delimiters {
    pub(crate) fn new(boundary: &[u8]) -> Self {
        let mut start = Vec::with_capacity(2 + boundary.len());
        start.extend_from_slice(b"--");
        start.extend_from_slice(boundary);

        let mut inter = Vec::with_capacity(CRLF.len() + start.len());
        inter.extend_from_slice(CRLF);
        inter.extend_from_slice(&start);

        Delimiters { start, inter }
    }
}

/// `CRLF ++ CRLF`, the header block terminator.
pub(crate) const HDR_END: &[u8] = b"\r\n\r\n";

/// Outcome of scanning one chunk against `delim` starting from scanner state `k_in`.
pub(crate) enum ScanOutcome {
    /// No match (`k_out == 0`): the whole chunk (plus carry) is confirmed
    /// non-delimiter content.
    NoMatch,
    /// The delimiter was fully matched. `before` is the count of leading
    /// chunk bytes that are confirmed non-delimiter content (0 if the match
    /// was completed entirely by a previously-carried prefix); `tail_from`
    /// is the chunk index immediately after the matched delimiter.
    Matched { before: usize, tail_from: usize },
    /// The chunk ended with an unresolved partial match. `before` is the
    /// count of leading chunk bytes confirmed non-delimiter content (0 if
    /// the entire chunk extends a previously-carried prefix); the remaining
    /// `chunk.len() - before` bytes become the new carry.
    Partial { before: usize },
}

/// The per-step accounting needed by callers enforcing a byte budget (C3).
pub(crate) struct ScanStep {
    pub outcome: ScanOutcome,
    /// New scanner state, in `[0, delim.len()]`.
    pub k_out: usize,
    /// Bytes newly confirmed as non-delimiter content by this call, for
    /// limit accounting. Bytes that are merely carried forward (still an
    /// ambiguous delimiter prefix) are not counted here; they're counted
    /// whenever their fate is eventually resolved.
    pub consumed: usize,
}

/// Scan `chunk` against `delim`, continuing from scanner state `k_in`.
///
/// Implements the transition rule from the boundary-scanner contract: at
/// state `k`, a byte either continues the match (`k += 1`), restarts it
/// (`k = 1`, if it equals `delim[0]`), or resets it (`k = 0`).
pub(crate) fn scan(delim: &[u8], k_in: usize, chunk: &[u8]) -> ScanStep {
    debug_assert!(!delim.is_empty());
    // `k_in == delim.len()` would mean "already matched"; callers must reset
    // `k` to 0 once a match is reported rather than ever scanning again from
    // the terminal state, so indexing `delim[k]` below can never go out of
    // bounds.
    debug_assert!(k_in < delim.len());

    let mut k = k_in;
    let mut i = 0usize;
    let mut matched = false;

    while i < chunk.len() {
        let b = chunk[i];
        if b == delim[k] {
            k += 1;
        } else if b == delim[0] {
            k = 1;
        } else {
            k = 0;
        }
        i += 1;
        if k == delim.len() {
            matched = true;
            break;
        }
    }

    // `before` bytes are the chunk bytes that lie strictly before whatever
    // portion of the delimiter this chunk contributed; any bytes sitting in
    // `carry` from a prior call are never re-counted here.
    let before = (i + k_in).saturating_sub(k);

    let outcome = if matched {
        ScanOutcome::Matched { before, tail_from: i }
    } else if k == 0 {
        ScanOutcome::NoMatch
    } else {
        ScanOutcome::Partial { before }
    };

    let consumed = if before == 0 {
        // Entire chunk extends (or completes from) an existing carry:
        // nothing newly confirmed as non-delimiter content yet.
        0
    } else if matched {
        i.saturating_sub(k)
    } else {
        // No-match or partial-with-`before`: the whole chunk was scanned.
        i
    };

    ScanStep { outcome, k_out: k, consumed }
}
