//! Property tests for the buffered tee.
//!
//! Whatever the chunking on either side, the consumer sees exactly the
//! source bytes followed by the source's terminal outcome.

use std::io::{self, Read};

use proptest::prelude::*;

use bytespool::tee::{BufferedTee, TeeLimits};

/// Source replaying pre-cut chunks, optionally ending in an error.
struct Scripted {
    chunks: Vec<Vec<u8>>,
    fail: bool,
}

impl Read for Scripted {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.chunks.is_empty() {
            return if self.fail {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "scripted"))
            } else {
                Ok(0)
            };
        }
        let chunk = &mut self.chunks[0];
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        chunk.drain(..n);
        if chunk.is_empty() {
            self.chunks.remove(0);
        }
        Ok(n)
    }
}

fn limits_strategy() -> impl Strategy<Value = TeeLimits> {
    (1usize..64, 1usize..48).prop_map(|(io_unit, block_size)| TeeLimits {
        io_unit,
        block_size,
    })
}

proptest! {
    #[test]
    fn consumer_sees_source_then_outcome(
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..40), 0..20),
        read_sizes in prop::collection::vec(1usize..30, 1..8),
        limits in limits_strategy(),
        fail in any::<bool>(),
    ) {
        let expected: Vec<u8> = chunks.concat();
        let source = Scripted { chunks, fail };
        let memory = || Ok::<_, io::Error>(Vec::<u8>::new());
        let mut tee = BufferedTee::with_limits(source, memory, limits).unwrap();

        let mut out = Vec::new();
        let mut buf = [0u8; 32];
        let mut step = 0;
        let outcome = loop {
            let want = read_sizes[step % read_sizes.len()];
            step += 1;
            match tee.read(&mut buf[..want]) {
                Ok(0) => break None,
                Ok(n) => {
                    prop_assert!(n <= want);
                    out.extend_from_slice(&buf[..n]);
                }
                Err(err) => break Some(err),
            }
            if let Some(stats) = tee.stats() {
                let bound = stats.buffered().div_ceil(limits.block_size as u64) + 1;
                prop_assert!(stats.live_blocks as u64 <= bound, "{:?}", stats);
                prop_assert_eq!(stats.delivered, out.len() as u64);
            }
        };

        prop_assert_eq!(out, expected);
        match outcome {
            None => prop_assert!(!fail),
            Some(err) => {
                prop_assert!(fail);
                prop_assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
                let again = tee.read(&mut buf).unwrap_err();
                prop_assert_eq!(again.to_string(), "scripted");
            }
        }
    }
}
