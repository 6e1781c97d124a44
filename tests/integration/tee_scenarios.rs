//! Buffered tee end-to-end scenarios over real spill files.

use std::io::{self, Cursor, Read};
use std::thread;
use std::time::Duration;

use bytespool::tee::{BufferedTee, TeeLimits, TempSpill};

/// Yields its bytes in one read, then fails every later read.
struct FailAfter {
    data: Option<Vec<u8>>,
    message: &'static str,
}

impl Read for FailAfter {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.take() {
            Some(data) => {
                buf[..data.len()].copy_from_slice(&data);
                Ok(data.len())
            }
            None => Err(io::Error::other(self.message)),
        }
    }
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[test]
fn slow_consumer_receives_every_byte() {
    let spill_dir = tempfile::tempdir().unwrap();
    let source = pattern(3 * 1024 * 1024);
    let limits = TeeLimits {
        io_unit: 4096,
        block_size: 64 * 1024,
    };
    let mut tee = BufferedTee::with_limits(
        Cursor::new(source.clone()),
        TempSpill::new(Some(spill_dir.path()), "slow-"),
        limits,
    )
    .unwrap();

    let mut out = Vec::with_capacity(source.len());
    let mut buf = [0u8; 7];
    let mut reads = 0u64;
    loop {
        let n = tee.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
        reads += 1;
        // Sleeping on every 7-byte read would take minutes.
        if reads % 4096 == 0 {
            thread::sleep(Duration::from_millis(1));
            if let Some(stats) = tee.stats() {
                let bound = stats.buffered().div_ceil(limits.block_size as u64) + 1;
                assert!(stats.live_blocks as u64 <= bound, "{stats:?}");
                assert_eq!(
                    stats.spill_high_water,
                    limits.block_size as u64 * stats.peak_live_blocks as u64
                );
            }
        }
    }

    assert!(out == source, "tee output differs from source");
    assert_eq!(tee.read(&mut buf).unwrap(), 0);
    assert_eq!(tee.read(&mut buf).unwrap(), 0);

    tee.close().unwrap();
    assert_eq!(std::fs::read_dir(spill_dir.path()).unwrap().count(), 0);
}

#[test]
fn producer_error_follows_buffered_bytes() {
    let source = FailAfter {
        data: Some(pattern(100)),
        message: "boom",
    };
    let mut tee = BufferedTee::spill_to_temp(source, None, "boom-").unwrap();

    let mut sizes = Vec::new();
    let mut out = Vec::new();
    let mut buf = [0u8; 8];
    let err = loop {
        match tee.read(&mut buf) {
            Ok(n) => {
                assert!(n > 0, "clean EOF before the error");
                sizes.push(n);
                out.extend_from_slice(&buf[..n]);
            }
            Err(err) => break err,
        }
    };

    let mut expected = vec![8; 12];
    expected.push(4);
    assert_eq!(sizes, expected);
    assert_eq!(out, pattern(100));
    assert_eq!(err.to_string(), "boom");

    // Exhausted: the same outcome repeats.
    let again = tee.read(&mut buf).unwrap_err();
    assert_eq!(again.to_string(), "boom");
    assert_eq!(again.kind(), err.kind());
}

#[test]
fn close_from_another_thread_unblocks_reader() {
    struct Stalled;
    impl Read for Stalled {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            thread::sleep(Duration::from_secs(3600));
            Ok(0)
        }
    }

    let mut tee = BufferedTee::spill_to_temp(Stalled, None, "stalled-").unwrap();
    let handle = tee.close_handle();
    let closer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle.close();
    });

    assert_eq!(tee.read(&mut [0u8; 16]).unwrap(), 0);
    closer.join().unwrap();
    tee.close().unwrap();
    assert_eq!(tee.read(&mut [0u8; 16]).unwrap(), 0);
}

#[test]
fn close_discards_pending_error() {
    let source = FailAfter {
        data: Some(b"xy".to_vec()),
        message: "late",
    };
    let mut tee = BufferedTee::spill_to_temp(source, None, "late-").unwrap();
    let mut buf = [0u8; 8];
    assert_eq!(tee.read(&mut buf).unwrap(), 2);
    assert!(tee.read(&mut buf).is_err());

    tee.close().unwrap();
    assert_eq!(tee.read(&mut buf).unwrap(), 0);
}
