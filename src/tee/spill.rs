//! Spill storage for the buffered tee.
//!
//! A spill is a seekable byte store addressed by absolute offset. The tee
//! only writes at block offsets it owns and only reads ranges it has already
//! written, so implementations need no internal bookkeeping beyond
//! positioned I/O.
//!
//! # File lifecycle
//!
//! `TempSpill` hands out `NamedTempFile`s, which delete themselves on drop.
//! The tee drops its spill when the buffer agent exits, so the file is gone
//! once `close` returns.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// Positioned byte storage used for spilled blocks.
pub trait Spill: Send {
    /// Fills `buf` from `offset`, failing if the range was never written.
    fn read_exact_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<()>;

    /// Writes all of `data` at `offset`, growing the store if needed.
    fn write_all_at(&mut self, data: &[u8], offset: u64) -> io::Result<()>;
}

/// Produces the spill storage for one tee.
///
/// Any `Fn() -> io::Result<S>` closure is a factory, which keeps tests and
/// ad-hoc callers free of wrapper types.
pub trait SpillFactory {
    /// Storage type handed to the buffer agent.
    type Spill: Spill + 'static;

    /// Creates fresh, exclusively owned storage.
    fn create(&self) -> io::Result<Self::Spill>;
}

impl<F, S> SpillFactory for F
where
    F: Fn() -> io::Result<S>,
    S: Spill + 'static,
{
    type Spill = S;

    fn create(&self) -> io::Result<S> {
        self()
    }
}

/// Factory for named temporary spill files.
///
/// Files are created under `dir` (or the system temp directory) with names
/// starting with `prefix`.
#[derive(Clone, Debug)]
pub struct TempSpill {
    dir: Option<PathBuf>,
    prefix: String,
}

impl TempSpill {
    /// Spill files prefix used when none is given.
    pub const DEFAULT_PREFIX: &'static str = "bytespool-spill-";

    /// Creates a factory with a directory hint and file name prefix.
    pub fn new(dir: Option<&Path>, prefix: &str) -> Self {
        Self {
            dir: dir.map(Path::to_path_buf),
            prefix: prefix.to_owned(),
        }
    }

    /// Returns the directory hint, if any.
    #[must_use]
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }
}

impl Default for TempSpill {
    fn default() -> Self {
        Self::new(None, Self::DEFAULT_PREFIX)
    }
}

impl SpillFactory for TempSpill {
    type Spill = NamedTempFile;

    fn create(&self) -> io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(&self.prefix);
        let file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        tracing::debug!(path = %file.path().display(), "created spill file");
        Ok(file)
    }
}

impl Spill for File {
    fn read_exact_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        read_exact_at(self, buf, offset)
    }

    fn write_all_at(&mut self, data: &[u8], offset: u64) -> io::Result<()> {
        write_all_at(self, data, offset)
    }
}

impl Spill for NamedTempFile {
    fn read_exact_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        read_exact_at(self.as_file(), buf, offset)
    }

    fn write_all_at(&mut self, data: &[u8], offset: u64) -> io::Result<()> {
        write_all_at(self.as_file(), data, offset)
    }
}

/// In-memory spill. Useful when the data is known to be small, and in tests.
impl Spill for Vec<u8> {
    fn read_exact_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::UnexpectedEof, "offset out of range"))?;
        let end = start
            .checked_add(buf.len())
            .filter(|&end| end <= self.len())
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "read past spill end"))?;
        buf.copy_from_slice(&self[start..end]);
        Ok(())
    }

    fn write_all_at(&mut self, data: &[u8], offset: u64) -> io::Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::other("offset exceeds address space"))?;
        let end = start
            .checked_add(data.len())
            .ok_or_else(|| io::Error::other("spill offset overflow"))?;
        if end > self.len() {
            self.resize(end, 0);
        }
        self[start..end].copy_from_slice(data);
        Ok(())
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    std::os::unix::fs::FileExt::read_exact_at(file, buf, offset)
}

#[cfg(unix)]
fn write_all_at(file: &File, data: &[u8], offset: u64) -> io::Result<()> {
    std::os::unix::fs::FileExt::write_all_at(file, data, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "read past spill end",
                ))
            }
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

#[cfg(windows)]
fn write_all_at(file: &File, mut data: &[u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !data.is_empty() {
        match file.seek_write(data, offset) {
            Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero)),
            Ok(n) => {
                data = &data[n..];
                offset += n as u64;
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
