//! Read-only access to a decoded image.

use std::collections::HashSet;
use std::io::{self, Read};

use super::format::{Entry, EntryList, SENTINEL, TRAILER_LEN};
use crate::errors::StringFsError;

/// A decoded image.
///
/// Borrows the image bytes; opening paths and reading files never copies
/// them. Decoding is a pure function of the bytes, so a `StringFs` can be
/// shared freely across threads.
#[derive(Clone, Copy)]
pub struct StringFs<'a> {
    /// Image without its trailer.
    body: &'a [u8],
    root: u64,
}

/// An opened file or directory.
///
/// Files implement `io::Read` over their slice of the image.
#[derive(Clone, Debug)]
pub struct File<'a> {
    body: &'a [u8],
    entry: Entry<'a>,
    pos: usize,
}

/// One child of a directory, as returned by [`File::readdir`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirEntry<'a> {
    pub name: &'a str,
    pub is_dir: bool,
    /// File length in bytes; 0 for directories.
    pub len: u64,
}

impl<'a> StringFs<'a> {
    /// Decodes an image produced by [`encode_dir`](super::encode_dir) or
    /// [`ImageBuilder`](super::ImageBuilder).
    ///
    /// # Errors
    /// Returns `ImageTooShort`, `BadSentinel`, `RootOutOfBounds` or
    /// `CorruptEntryList` for malformed images.
    pub fn decode(image: &'a [u8]) -> Result<Self, StringFsError> {
        let min = SENTINEL.len() + TRAILER_LEN;
        if image.len() < min {
            return Err(StringFsError::ImageTooShort { len: image.len() });
        }
        let (body, trailer) = image.split_at(image.len() - TRAILER_LEN);
        if body[..SENTINEL.len()] != SENTINEL {
            return Err(StringFsError::BadSentinel);
        }
        let root = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        if u64::from(root) + SENTINEL.len() as u64 > body.len() as u64 {
            return Err(StringFsError::RootOutOfBounds {
                root,
                len: body.len(),
            });
        }
        let entries = EntryList::open(body, u64::from(root))?;
        tracing::debug!(
            bytes = image.len(),
            root,
            entries = entries.remaining(),
            "decoded image"
        );
        Ok(Self {
            body,
            root: u64::from(root),
        })
    }

    /// Opens the root directory.
    pub fn root(&self) -> File<'a> {
        File::new(self.body, Entry::root(self.root))
    }

    /// Opens a slash-separated path.
    ///
    /// A leading `/` is optional and empty components are ignored, so
    /// `""`, `"/"` and `"//"` all name the root.
    ///
    /// # Errors
    /// Returns `NotFound` for a missing component, `NotADirectory` when a
    /// file is used as a directory, and `CorruptEntryList` for a damaged
    /// image.
    pub fn open(&self, path: &str) -> Result<File<'a>, StringFsError> {
        let mut entry = Entry::root(self.root);
        for name in path.split('/').filter(|name| !name.is_empty()) {
            entry = self.child(&entry, name)?;
        }
        Ok(File::new(self.body, entry))
    }

    /// Visits `path` and everything below it depth-first, parents before
    /// children, in stored order.
    ///
    /// `visit` receives each absolute path (`/`, `/a`, `/a/b`, ...) and its
    /// opened file.
    ///
    /// # Errors
    /// Returns the `open` errors for `path`, and `CorruptEntryList` for a
    /// damaged list or one reachable from two directory entries.
    pub fn walk<F>(&self, path: &str, mut visit: F) -> Result<(), StringFsError>
    where
        F: FnMut(&str, &File<'a>),
    {
        let start = self.open(path)?;
        let mut start_path = String::new();
        for name in path.split('/').filter(|name| !name.is_empty()) {
            start_path.push('/');
            start_path.push_str(name);
        }
        if start_path.is_empty() {
            start_path.push('/');
        }

        let mut seen = HashSet::new();
        let mut stack = vec![(start_path, start)];
        while let Some((path, file)) = stack.pop() {
            visit(&path, &file);
            if !file.is_dir() {
                continue;
            }
            // Encoded trees never share a list; a crafted image that does
            // would otherwise fan out exponentially.
            if !seen.insert(file.entry.offset) {
                return Err(StringFsError::CorruptEntryList {
                    offset: file.entry.offset,
                    detail: "directory list shared by two entries",
                });
            }
            let children = EntryList::open(self.body, file.entry.offset)?
                .collect::<Result<Vec<_>, _>>()?;
            for entry in children.into_iter().rev() {
                let mut child = path.clone();
                if !child.ends_with('/') {
                    child.push('/');
                }
                child.push_str(entry.name);
                stack.push((child, File::new(self.body, entry)));
            }
        }
        Ok(())
    }

    fn child(&self, dir: &Entry<'a>, name: &str) -> Result<Entry<'a>, StringFsError> {
        if !dir.dir {
            return Err(StringFsError::NotADirectory);
        }
        for entry in EntryList::open(self.body, dir.offset)? {
            let entry = entry?;
            if entry.name == name {
                return Ok(entry);
            }
        }
        Err(StringFsError::NotFound)
    }
}

impl std::fmt::Debug for StringFs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringFs")
            .field("bytes", &(self.body.len() + TRAILER_LEN))
            .field("root", &self.root)
            .finish()
    }
}

impl<'a> File<'a> {
    fn new(body: &'a [u8], entry: Entry<'a>) -> Self {
        Self {
            body,
            entry,
            pos: 0,
        }
    }

    /// Name in the parent directory; empty for the root.
    pub fn name(&self) -> &'a str {
        self.entry.name
    }

    pub fn is_dir(&self) -> bool {
        self.entry.dir
    }

    /// File length in bytes; 0 for directories.
    pub fn len(&self) -> u64 {
        if self.entry.dir {
            0
        } else {
            self.entry.len
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the whole file as a slice of the image.
    ///
    /// # Errors
    /// Returns `CannotReadDirectory` for directories.
    pub fn contents(&self) -> Result<&'a [u8], StringFsError> {
        if self.entry.dir {
            return Err(StringFsError::CannotReadDirectory);
        }
        // Entry decoding checked the range against the body.
        let start = self.entry.offset as usize;
        let end = start + self.entry.len as usize;
        Ok(&self.body[start..end])
    }

    /// Returns the names of a directory's children in stored order.
    ///
    /// # Errors
    /// Returns `NotADirectory` for files.
    pub fn readdir_names(&self) -> Result<Vec<&'a str>, StringFsError> {
        Ok(self.readdir()?.into_iter().map(|entry| entry.name).collect())
    }

    /// Returns a directory's children in stored order.
    ///
    /// # Errors
    /// Returns `NotADirectory` for files.
    pub fn readdir(&self) -> Result<Vec<DirEntry<'a>>, StringFsError> {
        if !self.entry.dir {
            return Err(StringFsError::NotADirectory);
        }
        let list = EntryList::open(self.body, self.entry.offset)?;
        let mut out = Vec::with_capacity(list.remaining().min(1024) as usize);
        for entry in list {
            let entry = entry?;
            out.push(DirEntry {
                name: entry.name,
                is_dir: entry.dir,
                len: if entry.dir { 0 } else { entry.len },
            });
        }
        Ok(out)
    }
}

impl Read for File<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.contents()?;
        let rest = &data[self.pos..];
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        self.pos += n;
        Ok(n)
    }
}
