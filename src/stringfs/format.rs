//! Packed filesystem image format.
//!
//! All integers are little-endian. Offsets are absolute image offsets.
//!
//! # Image layout
//! - sentinel: an empty entry list (`u32` count 0) at offset 0
//! - body: file contents and directory entry lists in post-order, so every
//!   directory's children precede its own entry list
//! - trailer: `u32` offset of the root entry list (last 4 bytes)
//!
//! # Entry list layout
//! - `count` (u32)
//! - `count` entries, each:
//!   - `name_len` (u32), then `name` bytes (UTF-8)
//!   - `offset` (u64): file contents, or the directory's entry list
//!   - `dir` (u8: 0 = file, 1 = directory)
//!   - `len` (u64): file length, 0 for directories
//!
//! Decoding rejects a directory entry whose list does not precede the list
//! that names it. Well-formed images satisfy this by construction, and it
//! rules out cycles in crafted ones.

use crate::errors::StringFsError;

/// Leading empty entry list.
pub(crate) const SENTINEL: [u8; 4] = 0u32.to_le_bytes();

/// Root offset trailer length.
pub(crate) const TRAILER_LEN: usize = 4;

/// One decoded directory entry, borrowing its name from the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Entry<'a> {
    pub(crate) name: &'a str,
    pub(crate) offset: u64,
    pub(crate) dir: bool,
    pub(crate) len: u64,
}

impl Entry<'static> {
    /// Synthesized entry for the root directory.
    pub(crate) fn root(offset: u64) -> Self {
        Self {
            name: "",
            offset,
            dir: true,
            len: 0,
        }
    }
}

/// Appends an entry list count.
pub(crate) fn encode_count(out: &mut Vec<u8>, count: u32) {
    out.extend_from_slice(&count.to_le_bytes());
}

/// Appends one entry.
pub(crate) fn encode_entry(out: &mut Vec<u8>, entry: &Entry<'_>) {
    out.extend_from_slice(&(entry.name.len() as u32).to_le_bytes());
    out.extend_from_slice(entry.name.as_bytes());
    out.extend_from_slice(&entry.offset.to_le_bytes());
    out.push(u8::from(entry.dir));
    out.extend_from_slice(&entry.len.to_le_bytes());
}

/// Lazily decoded entry list.
///
/// Yields entries in stored order. The first error ends iteration.
#[derive(Clone, Debug)]
pub(crate) struct EntryList<'a> {
    body: &'a [u8],
    list_offset: u64,
    pos: usize,
    remaining: u32,
}

impl<'a> EntryList<'a> {
    /// Opens the entry list at `offset` within `body`.
    ///
    /// # Errors
    /// Returns `CorruptEntryList` if the count does not fit in `body`.
    pub(crate) fn open(body: &'a [u8], offset: u64) -> Result<Self, StringFsError> {
        let pos = usize::try_from(offset).map_err(|_| corrupt(offset, "offset out of range"))?;
        let mut list = Self {
            body,
            list_offset: offset,
            pos,
            remaining: 0,
        };
        list.remaining = list.read_u32()?;
        Ok(list)
    }

    /// Number of entries not yet yielded.
    pub(crate) fn remaining(&self) -> u32 {
        self.remaining
    }

    fn read_entry(&mut self) -> Result<Entry<'a>, StringFsError> {
        let name_len = self.read_u32()? as usize;
        let name = self.read_bytes(name_len)?;
        let name = std::str::from_utf8(name)
            .map_err(|_| corrupt(self.list_offset, "entry name is not UTF-8"))?;
        let offset = self.read_u64()?;
        let dir = match self.read_u8()? {
            0 => false,
            1 => true,
            _ => return Err(corrupt(self.list_offset, "invalid entry kind")),
        };
        let len = self.read_u64()?;

        if dir {
            if offset >= self.list_offset {
                return Err(corrupt(
                    self.list_offset,
                    "directory list does not precede its parent",
                ));
            }
        } else {
            let end = offset
                .checked_add(len)
                .ok_or_else(|| corrupt(self.list_offset, "file range overflows"))?;
            if end > self.body.len() as u64 {
                return Err(corrupt(self.list_offset, "file range out of bounds"));
            }
        }

        Ok(Entry {
            name,
            offset,
            dir,
            len,
        })
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], StringFsError> {
        let body: &'a [u8] = self.body;
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= body.len())
            .ok_or_else(|| corrupt(self.list_offset, "unexpected end of image"))?;
        let bytes = &body[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> Result<u8, StringFsError> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, StringFsError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64(&mut self) -> Result<u64, StringFsError> {
        let bytes = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }
}

impl<'a> Iterator for EntryList<'a> {
    type Item = Result<Entry<'a>, StringFsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let entry = self.read_entry();
        if entry.is_err() {
            self.remaining = 0;
        }
        Some(entry)
    }
}

fn corrupt(offset: u64, detail: &'static str) -> StringFsError {
    StringFsError::CorruptEntryList { offset, detail }
}
