//! Reverse tokenizer over seekable sources.
//!
//! `ReverseScanner` yields tokens from the end of a source towards its
//! start, using an ordinary forward split function. It reads the source in
//! windows working backwards; each window is split forwards and its tokens
//! are handed out from last to first.
//!
//! # Window layout
//!
//! ```text
//!            offset                                offset + buf.len()
//!              |<------ fresh bytes ------>|<-- partial -->|
//!              [ first token? | t0 | t1 | .. | tn ][ carried ]
//! ```
//!
//! - Unless the window starts at offset 0, its first token may have begun
//!   before the window, so it is discarded. Its bytes (the partial prefix)
//!   are carried to the end of the next window, where they are split again
//!   with their true start in view.
//! - When the partial prefix fills the whole window, the window doubles up
//!   to `ScanLimits::max_buf`; beyond that the token is too long.
//!
//! This relies on split functions resynchronizing after one token: the
//! first boundary a split finds from an arbitrary position must be a real
//! token boundary. Line, word, byte and UTF-8 character splits all qualify.
//! A window that opens inside a UTF-8 sequence first steps over its
//! continuation bytes (at most three), so a split never starts mid-character.

mod limits;
mod split;

pub use limits::ScanLimits;
pub use split::{scan_bytes, scan_lines, scan_runes, scan_words, SplitFn, Step};

use std::borrow::Cow;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;

use crate::errors::{ScanError, SplitError};

/// Scanner yielding tokens of a `Read + Seek` source in reverse order.
///
/// Usage mirrors a forward scanner: call [`scan`](Self::scan) until it
/// returns false, reading each token with [`bytes`](Self::bytes) or
/// [`text`](Self::text), then check [`err`](Self::err).
pub struct ReverseScanner<R> {
    source: R,
    split: SplitFn,
    limits: ScanLimits,
    /// Source offset of `buf[0]`.
    offset: u64,
    /// True while the window's right edge is the end of the source.
    at_eof: bool,
    buf: Vec<u8>,
    partial: usize,
    /// Ranges into `buf` in forward order; the last one is current.
    tokens: Vec<Range<usize>>,
    err: Option<ScanError>,
}

impl<R: Read + Seek> ReverseScanner<R> {
    /// Creates a scanner splitting lines, with default limits.
    ///
    /// Seeks to the end of `source`; a seek failure is reported by
    /// [`err`](Self::err) and no tokens are produced.
    pub fn new(source: R) -> Self {
        Self::with_limits(source, ScanLimits::DEFAULT)
    }

    /// Creates a scanner splitting lines, with explicit window limits.
    ///
    /// # Panics
    ///
    /// Panics if `limits` are invalid.
    pub fn with_limits(mut source: R, limits: ScanLimits) -> Self {
        limits.validate();
        let (offset, err) = match source.seek(SeekFrom::End(0)) {
            Ok(len) => (len, None),
            Err(err) => (0, Some(ScanError::Io(err))),
        };
        tracing::trace!(len = offset, "reverse scanner opened");
        Self {
            source,
            split: Box::new(scan_lines),
            limits,
            offset,
            at_eof: true,
            buf: Vec::new(),
            partial: 0,
            tokens: Vec::new(),
            err,
        }
    }

    /// Sets the split function. Takes effect at the next refill.
    pub fn split<F>(&mut self, split: F) -> &mut Self
    where
        F: FnMut(&[u8], bool) -> Result<Step, SplitError> + Send + 'static,
    {
        self.split = Box::new(split);
        self
    }

    /// Sets the initial window size and the maximum token size.
    ///
    /// The initial size only applies before the first scan.
    ///
    /// # Panics
    ///
    /// Panics if `initial` is zero or greater than `max`.
    pub fn buffer(&mut self, initial: usize, max: usize) -> &mut Self {
        let limits = ScanLimits {
            initial_buf: initial,
            max_buf: max,
        };
        limits.validate();
        self.limits = limits;
        self
    }

    /// Advances to the previous token.
    ///
    /// Returns false at the start of the source or on a fatal error.
    pub fn scan(&mut self) -> bool {
        self.tokens.pop();
        loop {
            if !self.tokens.is_empty() {
                return true;
            }
            if self.err.is_some() || self.offset == 0 {
                return false;
            }
            if let Err(err) = self.refill() {
                tracing::debug!(error = %err, offset = self.offset, "reverse scan failed");
                self.tokens.clear();
                self.err = Some(err);
            }
        }
    }

    /// Returns the current token, or an empty slice if there is none.
    pub fn bytes(&self) -> &[u8] {
        match self.tokens.last() {
            Some(range) => &self.buf[range.clone()],
            None => &[],
        }
    }

    /// Returns the current token as text, replacing invalid UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.bytes())
    }

    /// Returns the fatal error that stopped scanning, if any.
    ///
    /// Reaching the start of the source is not an error.
    pub fn err(&self) -> Option<&ScanError> {
        self.err.as_ref()
    }

    /// Consumes the scanner, yielding owned tokens in reverse order.
    ///
    /// A fatal error is yielded once, after the last good token.
    pub fn into_tokens(self) -> Tokens<R> {
        Tokens {
            scanner: self,
            done: false,
        }
    }

    /// Slides the window backwards and splits it into tokens.
    ///
    /// Requires `offset > 0`. May produce no tokens when the window holds
    /// only skipped bytes.
    fn refill(&mut self) -> Result<(), ScanError> {
        self.tokens.clear();
        if self.buf.is_empty() {
            self.buf.resize(self.limits.initial_buf, 0);
        }

        loop {
            self.slide()?;

            if self.offset == 0 {
                self.partial = 0;
                break;
            }
            // The first token may have started before the window.
            let start = continuation_len(&self.buf);
            match self.split_at(start)? {
                Some((advance, _)) if start + advance < self.buf.len() => {
                    self.partial = start + advance;
                    break;
                }
                _ => {
                    // One token spans the whole window; grow and retry.
                    self.partial = self.buf.len();
                }
            }
        }

        let mut i = self.partial;
        while i < self.buf.len() {
            let Some((advance, token)) = self.split_at(i)? else {
                break;
            };
            if let Some(token) = token {
                self.tokens.push(token);
            }
            i += advance;
        }
        self.at_eof = false;
        tracing::trace!(
            offset = self.offset,
            window = self.buf.len(),
            partial = self.partial,
            tokens = self.tokens.len(),
            "reverse scanner refilled"
        );
        Ok(())
    }

    /// Reads the bytes preceding the window, keeping the partial prefix
    /// at the window's end.
    fn slide(&mut self) -> Result<(), ScanError> {
        let mut space = self.buf.len() - self.partial;
        if space == 0 {
            let max = self.limits.max_buf;
            if self.buf.len() >= max {
                return Err(ScanError::TokenTooLong { max });
            }
            let grown = (self.buf.len() * 2).min(max);
            tracing::debug!(from = self.buf.len(), to = grown, "growing reverse window");
            self.buf.resize(grown, 0);
            space = grown - self.partial;
        }
        if space as u64 > self.offset {
            // Near the start: shrink so the window begins at offset 0.
            space = self.offset as usize;
            self.buf.truncate(self.partial + space);
        }

        let new_offset = self.offset - space as u64;
        self.buf.copy_within(0..self.partial, space);
        self.source.seek(SeekFrom::Start(new_offset))?;
        self.offset = new_offset;
        self.source.read_exact(&mut self.buf[..space])?;
        Ok(())
    }

    /// Runs the split function on `buf[start..]`.
    ///
    /// Returns `None` when it needs more data, otherwise the advance and
    /// the token range translated to window coordinates. A step reaching
    /// outside `buf[start..]` is an error.
    fn split_at(
        &mut self,
        start: usize,
    ) -> Result<Option<(usize, Option<Range<usize>>)>, ScanError> {
        let data = &self.buf[start..];
        let available = data.len();
        match (self.split)(data, self.at_eof)? {
            Step::More | Step::Advance { advance: 0, .. } => Ok(None),
            Step::Advance { advance, token } => {
                let end = token.as_ref().map_or(0, |t| t.end);
                let inverted = token.as_ref().is_some_and(|t| t.start > t.end);
                if advance > available || end > available || inverted {
                    return Err(ScanError::AdvanceTooFar {
                        advance: advance.max(end),
                        available,
                    });
                }
                let token = token.map(|t| start + t.start..start + t.end);
                Ok(Some((advance, token)))
            }
        }
    }
}

/// Number of UTF-8 continuation bytes (`0x80..=0xBF`) opening `buf`,
/// capped at the three a character can carry.
fn continuation_len(buf: &[u8]) -> usize {
    buf.iter()
        .take(3)
        .take_while(|&&b| (0x80..=0xBF).contains(&b))
        .count()
}

impl<R> std::fmt::Debug for ReverseScanner<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReverseScanner")
            .field("offset", &self.offset)
            .field("window", &self.buf.len())
            .field("partial", &self.partial)
            .field("tokens", &self.tokens.len())
            .field("err", &self.err)
            .finish()
    }
}

/// Iterator over owned tokens, from [`ReverseScanner::into_tokens`].
#[derive(Debug)]
pub struct Tokens<R> {
    scanner: ReverseScanner<R>,
    done: bool,
}

impl<R: Read + Seek> Iterator for Tokens<R> {
    type Item = Result<Vec<u8>, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.scanner.scan() {
            return Some(Ok(self.scanner.bytes().to_vec()));
        }
        self.done = true;
        self.scanner.err.take().map(Err)
    }
}
