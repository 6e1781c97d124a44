//! Packed read-only filesystem.
//!
//! A directory tree is encoded into one contiguous byte image that can be
//! embedded, mapped or shipped as a single blob, then opened by path without
//! unpacking. The `format` module documents the byte layout.
//!
//! ```text
//! encode_dir("assets") ──► Vec<u8> ──► StringFs::decode(&image)
//!                                        └─► open("/css/site.css") ──► File: Read
//! ```

mod encode;
mod format;
mod fs;

pub use encode::{encode_dir, ImageBuilder};
pub use fs::{DirEntry, File, StringFs};
