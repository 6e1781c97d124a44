//! Image encoding: an in-memory builder and a directory walker on top of it.

use std::convert::Infallible;
use std::fs;
use std::io::{self, Read};
use std::mem;
use std::path::{Path, PathBuf};

use super::format::{encode_count, encode_entry, Entry, SENTINEL, TRAILER_LEN};
use crate::errors::StringFsError;

#[derive(Debug)]
struct Pending {
    name: String,
    offset: u64,
    dir: bool,
    len: u64,
}

/// Builds an image in post-order: a directory's children are written
/// before its entry list.
///
/// The builder itself is the root directory. Entries keep insertion
/// order; lookups return the first entry with a matching name. Names
/// containing `/` or empty names are stored but cannot be opened.
///
/// ```
/// use bytespool::stringfs::{ImageBuilder, StringFs};
///
/// let mut builder = ImageBuilder::new();
/// builder.file("README", b"hi").dir("src", |src| {
///     src.file("main.rs", b"fn main() {}");
/// });
/// let image = builder.finish().unwrap();
///
/// let fs = StringFs::decode(&image).unwrap();
/// assert_eq!(fs.open("/src/main.rs").unwrap().contents().unwrap(), b"fn main() {}");
/// ```
#[derive(Debug)]
pub struct ImageBuilder {
    buf: Vec<u8>,
    /// Entries of the directory currently being filled.
    entries: Vec<Pending>,
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self {
            buf: SENTINEL.to_vec(),
            entries: Vec::new(),
        }
    }

    /// Adds a file with the given contents.
    pub fn file(&mut self, name: &str, contents: &[u8]) -> &mut Self {
        let offset = self.buf.len() as u64;
        self.buf.extend_from_slice(contents);
        self.push(name, offset, false, contents.len() as u64);
        self
    }

    /// Adds a file whose contents are read from `reader` until EOF.
    pub fn file_from_reader<R: Read + ?Sized>(
        &mut self,
        name: &str,
        reader: &mut R,
    ) -> io::Result<&mut Self> {
        let offset = self.buf.len() as u64;
        let len = match io::copy(reader, &mut self.buf) {
            Ok(len) => len,
            Err(err) => {
                self.buf.truncate(offset as usize);
                return Err(err);
            }
        };
        self.push(name, offset, false, len);
        Ok(self)
    }

    /// Adds a directory whose children are added by `fill`.
    pub fn dir<F>(&mut self, name: &str, fill: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        let filled = self.try_dir(name, |builder| {
            fill(builder);
            Ok::<(), Infallible>(())
        });
        match filled {
            Ok(builder) => builder,
            Err(never) => match never {},
        }
    }

    /// Adds a directory whose children are added by a fallible `fill`.
    ///
    /// On error nothing is recorded for the directory, though bytes of
    /// children added before the failure stay in the image body.
    pub fn try_dir<F, E>(&mut self, name: &str, fill: F) -> Result<&mut Self, E>
    where
        F: FnOnce(&mut Self) -> Result<(), E>,
    {
        let parent = mem::take(&mut self.entries);
        let filled = fill(self);
        let children = mem::replace(&mut self.entries, parent);
        filled?;

        let offset = self.write_list(&children);
        self.push(name, offset, true, 0);
        Ok(self)
    }

    /// Writes the root entry list and trailer, returning the image.
    ///
    /// # Errors
    /// Returns `ImageTooLarge` if the root list starts beyond `u32::MAX`.
    pub fn finish(mut self) -> Result<Vec<u8>, StringFsError> {
        let entries = mem::take(&mut self.entries);
        let root = self.write_list(&entries);
        let root = u32::try_from(root).map_err(|_| StringFsError::ImageTooLarge { size: root })?;
        self.buf.reserve(TRAILER_LEN);
        self.buf.extend_from_slice(&root.to_le_bytes());
        tracing::debug!(bytes = self.buf.len(), root, "encoded image");
        Ok(self.buf)
    }

    fn push(&mut self, name: &str, offset: u64, dir: bool, len: u64) {
        self.entries.push(Pending {
            name: name.to_owned(),
            offset,
            dir,
            len,
        });
    }

    fn write_list(&mut self, entries: &[Pending]) -> u64 {
        let offset = self.buf.len() as u64;
        encode_count(&mut self.buf, entries.len() as u32);
        for pending in entries {
            encode_entry(
                &mut self.buf,
                &Entry {
                    name: &pending.name,
                    offset: pending.offset,
                    dir: pending.dir,
                    len: pending.len,
                },
            );
        }
        offset
    }
}

impl Default for ImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encodes the directory tree at `path` into an image.
///
/// Children are stored sorted by name so the same tree always yields the
/// same image. Symbolic links are followed.
///
/// # Errors
/// Returns `RootNotDirectory` if `path` is not a directory, `NonUtf8Name`
/// for a name that is not UTF-8, `Io` for filesystem failures (including a
/// symlink loop back to an ancestor), and `ImageTooLarge` if the image
/// outgrows the 32-bit root offset.
pub fn encode_dir(path: impl AsRef<Path>) -> Result<Vec<u8>, StringFsError> {
    let path = path.as_ref();
    if !fs::metadata(path)?.is_dir() {
        return Err(StringFsError::RootNotDirectory);
    }
    let mut builder = ImageBuilder::new();
    let mut ancestors = vec![fs::canonicalize(path)?];
    add_children(&mut builder, path, &mut ancestors)?;
    builder.finish()
}

fn add_children(
    builder: &mut ImageBuilder,
    dir: &Path,
    ancestors: &mut Vec<PathBuf>,
) -> Result<(), StringFsError> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry
            .file_name()
            .into_string()
            .map_err(|_| StringFsError::NonUtf8Name)?;
        children.push((name, entry.path()));
    }
    children.sort_by(|a, b| a.0.cmp(&b.0));

    for (name, path) in children {
        if fs::metadata(&path)?.is_dir() {
            let real = fs::canonicalize(&path)?;
            if ancestors.contains(&real) {
                return Err(StringFsError::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("directory cycle at {}", path.display()),
                )));
            }
            ancestors.push(real);
            builder.try_dir(&name, |sub| add_children(sub, &path, ancestors))?;
            ancestors.pop();
        } else {
            let mut file = fs::File::open(&path)?;
            builder.file_from_reader(&name, &mut file)?;
            tracing::trace!(path = %path.display(), "packed file");
        }
    }
    Ok(())
}
