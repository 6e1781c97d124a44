//! Buffered tee: an unbounded producer feeding a slower consumer through
//! disk-backed spill blocks.
//!
//! `BufferedTee` wraps a source reader. A reader thread drains the source
//! as fast as it produces; a buffer thread appends everything to spill
//! blocks and hands bytes to the consumer on demand. The consumer side is
//! an ordinary `io::Read` that blocks only when it has caught up with the
//! producer.
//!
//! # Guarantees
//! - Bytes are delivered exactly once, in source order.
//! - A source error is reported only after every byte read before it has
//!   been delivered; the same error is reported again on later reads.
//! - After `close`, reads return `Ok(0)`.
//! - Memory is bounded by the I/O unit and the consumer's buffer; the rest
//!   lives in the spill, whose live blocks never exceed
//!   `ceil(buffered / block_size) + 1`.
//!
//! # Threads
//! The buffer thread is joined by `close` (and on drop), so the spill file
//! is gone when `close` returns. The reader thread cannot be interrupted
//! while it is blocked inside the source; it exits at its next hand-off.

mod agent;
mod blocks;
mod limits;
mod spill;

pub use blocks::TeeStats;
pub use limits::TeeLimits;
pub use spill::{Spill, SpillFactory, TempSpill};

use std::io::{self, Read};
use std::mem;
use std::path::Path;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use agent::{reader_loop, BufferAgent, Reply, Request};

/// Channels and thread handle for a live tee.
struct Link {
    requests: Sender<Request>,
    replies: Receiver<Reply>,
    agent: JoinHandle<()>,
}

/// Terminal producer error, kept so it can be reported on every later read.
#[derive(Debug)]
struct Failure {
    kind: io::ErrorKind,
    message: String,
}

impl Failure {
    fn to_error(&self) -> io::Error {
        io::Error::new(self.kind, self.message.clone())
    }
}

/// Reader that buffers its source through spill storage.
///
/// Exactly one consumer is supported; `Read` takes `&mut self`, so the
/// type system enforces it. Use [`BufferedTee::close_handle`] to close the
/// tee from another thread.
pub struct BufferedTee {
    link: Option<Link>,
    scratch: Vec<u8>,
    failure: Option<Failure>,
    closed: bool,
}

/// Cloneable handle that closes a tee from any thread.
///
/// A read blocked on the tee returns `Ok(0)` once the close is observed.
/// Unlike [`BufferedTee::close`], this does not wait for the spill to be
/// released.
#[derive(Clone, Debug)]
pub struct CloseHandle {
    requests: Sender<Request>,
}

impl CloseHandle {
    /// Requests that the tee stop buffering. Closing twice is harmless.
    pub fn close(&self) {
        let _ = self.requests.send(Request::Close);
    }
}

impl BufferedTee {
    /// Creates a tee with default limits.
    ///
    /// Returns the factory's error if spill storage cannot be created.
    pub fn new<R, F>(source: R, spill: F) -> io::Result<Self>
    where
        R: Read + Send + 'static,
        F: SpillFactory,
    {
        Self::with_limits(source, spill, TeeLimits::DEFAULT)
    }

    /// Creates a tee spilling to a named temp file under `dir` (or the
    /// system temp directory) whose name starts with `prefix`.
    pub fn spill_to_temp<R>(source: R, dir: Option<&Path>, prefix: &str) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        Self::new(source, TempSpill::new(dir, prefix))
    }

    /// Creates a tee with explicit limits.
    ///
    /// # Errors
    /// Returns `InvalidInput` for inconsistent limits, the factory's error
    /// if storage cannot be created, or a spawn error.
    pub fn with_limits<R, F>(source: R, spill: F, limits: TeeLimits) -> io::Result<Self>
    where
        R: Read + Send + 'static,
        F: SpillFactory,
    {
        limits
            .try_validate()
            .map_err(|msg| io::Error::new(io::ErrorKind::InvalidInput, msg))?;
        let spill = spill.create()?;

        let (data_tx, data_rx) = bounded(1);
        let (req_tx, req_rx) = unbounded();
        let (reply_tx, reply_rx) = bounded(1);

        let io_unit = limits.io_unit;
        thread::Builder::new()
            .name("bytespool-tee-reader".into())
            .spawn(move || reader_loop(source, io_unit, data_tx))?;

        let agent = BufferAgent::new(spill, limits.block_size, reply_tx);
        let agent = thread::Builder::new()
            .name("bytespool-tee-buffer".into())
            .spawn(move || agent.run(data_rx, req_rx))?;

        tracing::debug!(
            io_unit = limits.io_unit,
            block_size = limits.block_size,
            "buffered tee started"
        );
        Ok(Self {
            link: Some(Link {
                requests: req_tx,
                replies: reply_rx,
                agent,
            }),
            scratch: Vec::new(),
            failure: None,
            closed: false,
        })
    }

    /// Returns a handle that can close this tee from another thread.
    ///
    /// If the tee has already finished, the handle is inert.
    #[must_use]
    pub fn close_handle(&self) -> CloseHandle {
        let requests = match &self.link {
            Some(link) => link.requests.clone(),
            None => unbounded().0,
        };
        CloseHandle { requests }
    }

    /// Returns a snapshot of buffer accounting, or `None` once the tee has
    /// finished or been closed.
    pub fn stats(&self) -> Option<TeeStats> {
        let link = self.link.as_ref()?;
        link.requests.send(Request::Stats).ok()?;
        match link.replies.recv().ok()? {
            Reply::Stats(stats) => Some(stats),
            _ => None,
        }
    }

    /// Stops buffering and releases the spill storage.
    ///
    /// Later reads return `Ok(0)`. Closing twice is harmless.
    ///
    /// # Errors
    /// Returns an error only if the buffer thread panicked.
    pub fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        self.failure = None;
        self.shutdown()
    }

    /// Tears down the link, joining the buffer thread.
    fn shutdown(&mut self) -> io::Result<()> {
        let Some(link) = self.link.take() else {
            return Ok(());
        };
        let _ = link.requests.send(Request::Close);
        drop(link.requests);
        drop(link.replies);
        link.agent
            .join()
            .map_err(|_| io::Error::other("tee buffer thread panicked"))
    }

    /// Outcome of a read once the link is gone.
    fn finished(&self) -> io::Result<usize> {
        match &self.failure {
            Some(failure) if !self.closed => Err(failure.to_error()),
            _ => Ok(0),
        }
    }

    /// Sends one read request and waits for the agent's answer.
    ///
    /// `None` means the agent is gone without answering.
    fn request(&mut self, len: usize) -> Option<Reply> {
        let link = self.link.as_ref()?;
        let mut scratch = mem::take(&mut self.scratch);
        scratch.resize(len, 0);
        link.requests.send(Request::Read(scratch)).ok()?;
        loop {
            match link.replies.recv().ok()? {
                Reply::Stats(_) => continue,
                reply => return Some(reply),
            }
        }
    }
}

impl Read for BufferedTee {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.link.is_none() {
            return self.finished();
        }

        match self.request(buf.len()) {
            Some(Reply::Data(data)) => {
                let n = data.len();
                buf[..n].copy_from_slice(&data);
                self.scratch = data;
                Ok(n)
            }
            Some(Reply::End(outcome)) => {
                self.shutdown()?;
                match outcome {
                    None => Ok(0),
                    Some(err) => {
                        self.failure = Some(Failure {
                            kind: err.kind(),
                            message: err.to_string(),
                        });
                        Err(err)
                    }
                }
            }
            Some(Reply::Failed(err)) => {
                let _ = self.shutdown();
                Err(err)
            }
            Some(Reply::Stats(_)) | None => {
                // Closed through a handle, or the agent died.
                self.shutdown()?;
                Ok(0)
            }
        }
    }
}

impl Drop for BufferedTee {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

impl std::fmt::Debug for BufferedTee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedTee")
            .field("live", &self.link.is_some())
            .field("closed", &self.closed)
            .field("failure", &self.failure)
            .finish()
    }
}
