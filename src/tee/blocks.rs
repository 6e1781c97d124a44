//! Block queue over spill storage.
//!
//! Buffered bytes live in fixed-size spill blocks chained from `first`
//! (consumer end) to `last` (producer end). Fully delivered blocks are
//! pushed onto a free list and reused before the spill grows.
//!
//! # Invariants
//! - The queue is never empty; `queue[0]` is `first`, the back is `last`.
//! - Every block except `last` holds exactly `block_size` bytes.
//! - `0 <= nread <= first.len`, and `nread < block_size` between calls:
//!   a block is recycled as soon as it has been fully delivered.
//! - Whenever `last` fills, a fresh `last` is chained immediately, so a
//!   fully read `first` always has a successor to advance to.
//! - `produced - delivered` equals the bytes held in the queue.
//! - Fresh blocks are carved at `high_water`, which only grows; it equals
//!   `block_size * peak_live_blocks` because the free list is drained first.

use std::collections::VecDeque;
use std::io;

use super::spill::Spill;

/// One block of spill storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Block {
    offset: u64,
    len: usize,
}

/// Snapshot of buffer accounting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TeeStats {
    /// Bytes appended from the source.
    pub produced: u64,
    /// Bytes handed to the consumer.
    pub delivered: u64,
    /// Blocks currently in the queue.
    pub live_blocks: usize,
    /// Blocks waiting on the free list.
    pub free_blocks: usize,
    /// Largest queue length observed.
    pub peak_live_blocks: usize,
    /// Spill bytes ever carved into blocks.
    pub spill_high_water: u64,
}

impl TeeStats {
    /// Bytes produced but not yet delivered.
    #[must_use]
    pub const fn buffered(&self) -> u64 {
        self.produced - self.delivered
    }
}

/// Queue of spill blocks plus the free list.
#[derive(Debug)]
pub(crate) struct BlockQueue {
    block_size: usize,
    queue: VecDeque<Block>,
    free: Vec<Block>,
    nread: usize,
    high_water: u64,
    produced: u64,
    delivered: u64,
    peak_live: usize,
}

impl BlockQueue {
    pub(crate) fn new(block_size: usize) -> Self {
        assert!(block_size > 0, "block size must be > 0");
        let mut blocks = Self {
            block_size,
            queue: VecDeque::new(),
            free: Vec::new(),
            nread: 0,
            high_water: 0,
            produced: 0,
            delivered: 0,
            peak_live: 0,
        };
        let first = blocks.get_block();
        blocks.push_last(first);
        blocks
    }

    /// Bytes buffered and not yet delivered.
    pub(crate) fn available(&self) -> u64 {
        self.produced - self.delivered
    }

    /// True when every appended byte has been delivered.
    pub(crate) fn is_drained(&self) -> bool {
        self.available() == 0
    }

    pub(crate) fn stats(&self) -> TeeStats {
        TeeStats {
            produced: self.produced,
            delivered: self.delivered,
            live_blocks: self.queue.len(),
            free_blocks: self.free.len(),
            peak_live_blocks: self.peak_live,
            spill_high_water: self.high_water,
        }
    }

    /// Appends `data` to the queue, writing through to `spill`.
    ///
    /// On error, bytes written before the failure remain buffered and
    /// deliverable; the failing write is not counted.
    pub(crate) fn append<S: Spill + ?Sized>(
        &mut self,
        spill: &mut S,
        mut data: &[u8],
    ) -> io::Result<()> {
        while !data.is_empty() {
            let block_size = self.block_size;
            let last = self.last_mut();
            let n = (block_size - last.len).min(data.len());
            spill.write_all_at(&data[..n], last.offset + last.len as u64)?;
            last.len += n;
            let filled = last.len == block_size;

            self.produced += n as u64;
            data = &data[n..];

            if filled {
                let next = self.get_block();
                self.push_last(next);
            }
        }
        Ok(())
    }

    /// Copies bytes from the front block into `buf`.
    ///
    /// Returns the number of bytes copied, which is bounded by the remainder
    /// of the front block; zero means nothing is buffered (or `buf` is
    /// empty). A spill read failure leaves the cursor untouched.
    pub(crate) fn read_into<S: Spill + ?Sized>(
        &mut self,
        spill: &mut S,
        buf: &mut [u8],
    ) -> io::Result<usize> {
        let first = self.queue[0];
        let n = buf.len().min(first.len - self.nread);
        if n == 0 {
            return Ok(0);
        }
        spill.read_exact_at(&mut buf[..n], first.offset + self.nread as u64)?;
        self.nread += n;
        self.delivered += n as u64;

        if self.nread == self.block_size && self.queue.len() > 1 {
            if let Some(done) = self.queue.pop_front() {
                tracing::trace!(offset = done.offset, "recycling drained block");
                self.free.push(done);
            }
            self.nread = 0;
        }
        Ok(n)
    }

    fn last_mut(&mut self) -> &mut Block {
        let idx = self.queue.len() - 1;
        &mut self.queue[idx]
    }

    fn push_last(&mut self, block: Block) {
        self.queue.push_back(block);
        self.peak_live = self.peak_live.max(self.queue.len());
    }

    /// Takes a block from the free list, or carves a new one from the spill.
    fn get_block(&mut self) -> Block {
        if let Some(mut block) = self.free.pop() {
            block.len = 0;
            return block;
        }
        let block = Block {
            offset: self.high_water,
            len: 0,
        };
        self.high_water += self.block_size as u64;
        tracing::trace!(offset = block.offset, "extending spill by one block");
        block
    }
}
