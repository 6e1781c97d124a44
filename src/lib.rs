//! Byte plumbing for streams that cross a boundary: a disk-spilling tee, a
//! reverse tokenizer and a packed read-only filesystem.
//!
//! ## Scope
//! - [`tee::BufferedTee`] decouples a fast producer from a slow consumer.
//!   Everything the consumer has not read yet lives in spill blocks on disk,
//!   and blocks are recycled as soon as they are delivered.
//! - [`reverse::ReverseScanner`] yields the tokens of a seekable source from
//!   last to first, reusing ordinary forward split functions.
//! - [`stringfs`] packs a directory tree into one byte image and opens paths
//!   in it without unpacking.
//!
//! ## Key invariants
//! - The tee delivers every source byte exactly once, in order, and reports
//!   a source error only after the bytes read before it.
//! - Tee memory is bounded by its limits; spill storage grows only to
//!   `block_size * peak live blocks`.
//! - The reverse scanner's window is bounded by `ScanLimits::max_buf`; a
//!   longer token is an error, never unbounded growth.
//! - Images are read-only and decoding never copies file contents.
//!
//! ## Notable entry points
//! - `BufferedTee::new` / `BufferedTee::spill_to_temp`: wrap a reader.
//! - `ReverseScanner::new` + `split` + `scan`: reverse tokenizing.
//! - `encode_dir` / `ImageBuilder` and `StringFs::decode` + `open`: images.
//!
//! The `bytespool` binary exposes each of these as a subcommand.

pub mod cli;
pub mod errors;
pub mod reverse;
pub mod stringfs;
pub mod tee;
#[cfg(test)]
pub mod test_utils;

pub use errors::{ScanError, SplitError, StringFsError};
pub use reverse::{ReverseScanner, ScanLimits, Step};
pub use stringfs::{encode_dir, ImageBuilder, StringFs};
pub use tee::{BufferedTee, CloseHandle, TeeLimits, TeeStats};
