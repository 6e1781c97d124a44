//! Split functions: the token rules a scanner applies to its window.
//!
//! A split function looks at `data` (a suffix of the window) and either
//! asks for more input or reports how many bytes it consumed and which of
//! them, if any, form a token. Split functions are written for forward
//! scanning; the reverse scanner reuses them unchanged by always starting
//! them at a token boundary.
//!
//! `at_eof` is true when no bytes follow `data`, so a trailing token with
//! no delimiter is complete.

use std::ops::Range;

use memchr::memchr;

use crate::errors::SplitError;

/// Result of one split call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// No complete token at the start of `data`; more input is needed.
    More,
    /// Consume `advance` bytes, yielding `token` if present.
    ///
    /// `advance` must be positive and at most `data.len()`; `token` is a
    /// range of `data`. A `None` token skips bytes without yielding.
    Advance {
        advance: usize,
        token: Option<Range<usize>>,
    },
}

impl Step {
    /// Consumes `advance` bytes and yields `token`.
    #[must_use]
    pub fn token(advance: usize, token: Range<usize>) -> Self {
        Self::Advance {
            advance,
            token: Some(token),
        }
    }

    /// Consumes `advance` bytes without yielding a token.
    #[must_use]
    pub fn skip(advance: usize) -> Self {
        Self::Advance {
            advance,
            token: None,
        }
    }
}

/// Boxed split function stored by a scanner.
pub type SplitFn = Box<dyn FnMut(&[u8], bool) -> Result<Step, SplitError> + Send>;

/// Splits on `\n`, dropping a trailing `\r` from each line.
///
/// The last line is returned even without a newline. An empty final line
/// (input ending in `\n`) is not a token.
pub fn scan_lines(data: &[u8], at_eof: bool) -> Result<Step, SplitError> {
    if data.is_empty() {
        return Ok(Step::More);
    }
    if let Some(i) = memchr(b'\n', data) {
        return Ok(Step::token(i + 1, 0..drop_cr(data, i)));
    }
    if at_eof {
        return Ok(Step::token(data.len(), 0..drop_cr(data, data.len())));
    }
    Ok(Step::More)
}

fn drop_cr(data: &[u8], end: usize) -> usize {
    if end > 0 && data[end - 1] == b'\r' {
        end - 1
    } else {
        end
    }
}

/// Splits on Unicode whitespace, yielding non-empty words.
///
/// Invalid UTF-8 is treated as part of a word.
pub fn scan_words(data: &[u8], at_eof: bool) -> Result<Step, SplitError> {
    let mut start = 0;
    while start < data.len() {
        let (ch, width) = decode_char(&data[start..]);
        if !ch.is_whitespace() {
            break;
        }
        start += width;
    }

    let mut i = start;
    while i < data.len() {
        let (ch, width) = decode_char(&data[i..]);
        if ch.is_whitespace() {
            return Ok(Step::token(i + width, start..i));
        }
        i += width;
    }

    if at_eof && data.len() > start {
        return Ok(Step::token(data.len(), start..data.len()));
    }
    if start > 0 {
        return Ok(Step::skip(start));
    }
    Ok(Step::More)
}

/// Yields every byte as its own token.
pub fn scan_bytes(data: &[u8], _at_eof: bool) -> Result<Step, SplitError> {
    if data.is_empty() {
        return Ok(Step::More);
    }
    Ok(Step::token(1, 0..1))
}

/// Yields each UTF-8 encoded character.
///
/// An invalid byte is yielded alone as a one-byte token. A truncated
/// sequence waits for more input unless `at_eof` is set, in which case its
/// first byte is yielded alone.
pub fn scan_runes(data: &[u8], at_eof: bool) -> Result<Step, SplitError> {
    let Some(&lead) = data.first() else {
        return Ok(Step::More);
    };
    if lead < 0x80 {
        return Ok(Step::token(1, 0..1));
    }
    match utf8_width(data) {
        Width::Valid(n) => Ok(Step::token(n, 0..n)),
        Width::Invalid => Ok(Step::token(1, 0..1)),
        Width::Truncated if at_eof => Ok(Step::token(1, 0..1)),
        Width::Truncated => Ok(Step::More),
    }
}

enum Width {
    Valid(usize),
    Invalid,
    Truncated,
}

/// Classifies the UTF-8 sequence at the start of `data`.
fn utf8_width(data: &[u8]) -> Width {
    let want = match data[0] {
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => return Width::Invalid,
    };
    if data.len() < want {
        if data[1..].iter().all(|&b| (0x80..=0xBF).contains(&b)) {
            return Width::Truncated;
        }
        return Width::Invalid;
    }
    match std::str::from_utf8(&data[..want]) {
        Ok(_) => Width::Valid(want),
        Err(_) => Width::Invalid,
    }
}

/// Decodes one character, mapping invalid or truncated input to U+FFFD of
/// width one.
fn decode_char(data: &[u8]) -> (char, usize) {
    let lead = data[0];
    if lead < 0x80 {
        return (char::from(lead), 1);
    }
    if let Width::Valid(n) = utf8_width(data) {
        if let Some(ch) = std::str::from_utf8(&data[..n])
            .ok()
            .and_then(|s| s.chars().next())
        {
            return (ch, n);
        }
    }
    (char::REPLACEMENT_CHARACTER, 1)
}
