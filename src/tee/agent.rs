//! Reader and buffer agents behind a `BufferedTee`.
//!
//! The reader thread pulls `io_unit`-sized chunks from the source and pushes
//! them down a data channel. The buffer thread owns the spill, the block
//! queue and the producer outcome; it selects over incoming chunks and
//! consumer requests.
//!
//! # Protocol
//!
//! ```text
//! reader --Chunk--> buffer <--Request-- consumer
//!                   buffer --Reply---> consumer
//! ```
//!
//! - A read request that arrives while nothing is buffered and the producer
//!   is still open is parked until bytes arrive or the producer finishes.
//! - Once the producer finishes, its branch is replaced by `never()`, which
//!   also drops the data receiver so a still-running reader exits on its
//!   next send.
//! - When the queue is drained after the producer finished, the pending read
//!   gets `Reply::End` with the producer's outcome and the agent exits.
//! - `Request::Close` (or every request sender dropping) ends the agent
//!   immediately; dropping the reply sender wakes a waiting consumer.

use std::io::{self, Read};

use crossbeam_channel::{never, select, Receiver, Sender};

use super::blocks::{BlockQueue, TeeStats};
use super::spill::Spill;

/// A chunk from the source, or the source's terminal error.
///
/// A clean EOF is signalled by the reader dropping its sender.
pub(crate) type Chunk = io::Result<Vec<u8>>;

/// Consumer-to-agent messages.
#[derive(Debug)]
pub(crate) enum Request {
    /// Fill this buffer (its length is the request size) and send it back.
    Read(Vec<u8>),
    Stats,
    Close,
}

/// Agent-to-consumer messages.
#[derive(Debug)]
pub(crate) enum Reply {
    /// The request buffer, truncated to the bytes delivered.
    Data(Vec<u8>),
    Stats(TeeStats),
    /// Stream exhausted; `None` for a clean EOF.
    End(Option<io::Error>),
    /// Spill read failure. The agent has exited.
    Failed(io::Error),
}

/// Reads the source until EOF or error, forwarding chunks.
///
/// Returns as soon as the buffer agent stops listening.
pub(crate) fn reader_loop<R: Read>(mut source: R, io_unit: usize, data: Sender<Chunk>) {
    loop {
        let mut buf = vec![0u8; io_unit];
        match source.read(&mut buf) {
            Ok(0) => {
                tracing::debug!("tee source reached EOF");
                return;
            }
            Ok(n) => {
                buf.truncate(n);
                if data.send(Ok(buf)).is_err() {
                    tracing::debug!("tee buffer agent gone; reader exiting");
                    return;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => {
                tracing::debug!(error = %err, "tee source failed");
                let _ = data.send(Err(err));
                return;
            }
        }
    }
}

enum Producer {
    Open,
    /// Terminal outcome; `None` is a clean EOF. Taken when reported.
    Done(Option<io::Error>),
}

enum Flow {
    Continue,
    Exit,
}

/// One wakeup of the buffer loop; `None` means the channel disconnected.
enum Event {
    Data(Option<Chunk>),
    Request(Option<Request>),
}

/// State owned by the buffer thread.
pub(crate) struct BufferAgent<S> {
    spill: S,
    blocks: BlockQueue,
    producer: Producer,
    pending: Option<Vec<u8>>,
    replies: Sender<Reply>,
}

impl<S: Spill> BufferAgent<S> {
    pub(crate) fn new(spill: S, block_size: usize, replies: Sender<Reply>) -> Self {
        Self {
            spill,
            blocks: BlockQueue::new(block_size),
            producer: Producer::Open,
            pending: None,
            replies,
        }
    }

    /// Runs until the stream is exhausted, a spill read fails, or the tee
    /// is closed. The spill is dropped on return.
    pub(crate) fn run(mut self, data: Receiver<Chunk>, requests: Receiver<Request>) {
        tracing::debug!("tee buffer agent started");
        let mut data = data;
        loop {
            let event = select! {
                recv(data) -> msg => Event::Data(msg.ok()),
                recv(requests) -> msg => Event::Request(msg.ok()),
            };

            match event {
                Event::Data(Some(Ok(chunk))) => {
                    if let Err(err) = self.blocks.append(&mut self.spill, &chunk) {
                        tracing::warn!(error = %err, "spill write failed; ending producer");
                        self.finish_producer(Some(err));
                        data = never();
                    }
                }
                Event::Data(Some(Err(err))) => {
                    self.finish_producer(Some(err));
                    data = never();
                }
                Event::Data(None) => {
                    self.finish_producer(None);
                    data = never();
                }
                Event::Request(Some(Request::Read(buf))) => self.pending = Some(buf),
                Event::Request(Some(Request::Stats)) => {
                    if self.replies.send(Reply::Stats(self.blocks.stats())).is_err() {
                        break;
                    }
                }
                Event::Request(Some(Request::Close) | None) => {
                    tracing::debug!("tee closed by consumer");
                    break;
                }
            }

            if let Some(buf) = self.pending.take() {
                if let Flow::Exit = self.serve(buf) {
                    break;
                }
            }
        }
        tracing::debug!(stats = ?self.blocks.stats(), "tee buffer agent exiting");
    }

    fn finish_producer(&mut self, outcome: Option<io::Error>) {
        tracing::debug!(
            produced = self.blocks.stats().produced,
            failed = outcome.is_some(),
            "tee producer finished"
        );
        self.producer = Producer::Done(outcome);
    }

    /// Answers a read request, or parks it if nothing is available yet.
    fn serve(&mut self, mut buf: Vec<u8>) -> Flow {
        if self.blocks.is_drained() {
            return match &mut self.producer {
                Producer::Open => {
                    self.pending = Some(buf);
                    Flow::Continue
                }
                Producer::Done(outcome) => {
                    let _ = self.replies.send(Reply::End(outcome.take()));
                    Flow::Exit
                }
            };
        }

        match self.blocks.read_into(&mut self.spill, &mut buf) {
            Ok(n) => {
                buf.truncate(n);
                if self.replies.send(Reply::Data(buf)).is_err() {
                    return Flow::Exit;
                }
                Flow::Continue
            }
            Err(err) => {
                tracing::warn!(error = %err, "spill read failed; ending tee");
                let _ = self.replies.send(Reply::Failed(err));
                Flow::Exit
            }
        }
    }
}
