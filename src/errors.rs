//! Error types for the reverse scanner and the packed filesystem.
//!
//! Errors are component-specific so each failure mode stays precise. The
//! buffered tee has no enum here: it implements `io::Read` and speaks
//! `io::Error` end to end, passing producer and spill errors through
//! unchanged.
//!
//! # Design Notes
//! - Variants with `detail` carry human-readable context and are not stable
//!   for machine parsing.
//! - I/O errors preserve their source.

use std::fmt;
use std::io;

/// Error produced by a split function.
///
/// Split functions are caller-supplied, so this wraps an arbitrary error
/// while staying `Send + Sync` for use across threads.
#[derive(Debug)]
pub struct SplitError(Box<dyn std::error::Error + Send + Sync>);

impl SplitError {
    /// Creates a split error from any error or message.
    pub fn new<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self(err.into())
    }

    /// Returns the wrapped error.
    pub fn into_inner(self) -> Box<dyn std::error::Error + Send + Sync> {
        self.0
    }
}

impl fmt::Display for SplitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for SplitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.0.as_ref())
    }
}

/// Fatal errors from the reverse scanner.
///
/// Any of these ends scanning; normal exhaustion is not an error.
#[derive(Debug)]
#[non_exhaustive]
pub enum ScanError {
    /// Seek or read failure on the source.
    Io(io::Error),
    /// A single token does not fit in the maximum window.
    TokenTooLong { max: usize },
    /// The split function failed.
    Split(SplitError),
    /// The split function consumed more bytes than it was given.
    AdvanceTooFar { advance: usize, available: usize },
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::TokenTooLong { max } => write!(f, "token too long (max: {max} bytes)"),
            Self::Split(err) => write!(f, "split error: {err}"),
            Self::AdvanceTooFar { advance, available } => {
                write!(
                    f,
                    "split advanced past input: advance {advance}, available {available}"
                )
            }
        }
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Split(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ScanError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<SplitError> for ScanError {
    fn from(err: SplitError) -> Self {
        Self::Split(err)
    }
}

/// Errors from encoding, decoding and walking a packed filesystem image.
#[derive(Debug)]
#[non_exhaustive]
pub enum StringFsError {
    /// I/O error while reading the source tree.
    Io(io::Error),
    /// The path handed to the encoder is not a directory.
    RootNotDirectory,
    /// A directory entry name is not valid UTF-8.
    NonUtf8Name,
    /// The root entry list would sit beyond the 32-bit trailer range.
    ImageTooLarge { size: u64 },
    /// The image is too short to hold the sentinel and trailer.
    ImageTooShort { len: usize },
    /// The image does not start with the empty sentinel entry list.
    BadSentinel,
    /// The trailer points outside the image body.
    RootOutOfBounds { root: u32, len: usize },
    /// An entry list could not be decoded.
    CorruptEntryList { offset: u64, detail: &'static str },
    /// A path component does not exist.
    NotFound,
    /// A directory operation was applied to a file.
    NotADirectory,
    /// A file read was applied to a directory.
    CannotReadDirectory,
}

impl fmt::Display for StringFsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::RootNotDirectory => write!(f, "root must be a directory"),
            Self::NonUtf8Name => write!(f, "entry name is not valid UTF-8"),
            Self::ImageTooLarge { size } => {
                write!(f, "image too large: {size} bytes (max: {})", u32::MAX)
            }
            Self::ImageTooShort { len } => write!(f, "image too short: {len} bytes"),
            Self::BadSentinel => write!(f, "image does not start with an empty entry list"),
            Self::RootOutOfBounds { root, len } => {
                write!(f, "root offset {root} out of bounds (image body: {len} bytes)")
            }
            Self::CorruptEntryList { offset, detail } => {
                write!(f, "corrupt entry list at offset {offset}: {detail}")
            }
            Self::NotFound => write!(f, "file not found"),
            Self::NotADirectory => write!(f, "not a directory"),
            Self::CannotReadDirectory => write!(f, "cannot read a directory"),
        }
    }
}

impl std::error::Error for StringFsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for StringFsError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<StringFsError> for io::Error {
    fn from(err: StringFsError) -> Self {
        match err {
            StringFsError::Io(err) => err,
            StringFsError::NotFound => io::Error::new(io::ErrorKind::NotFound, err),
            other => io::Error::other(other),
        }
    }
}
